// src/events.rs
//
// Room events as delivered by the conferencing SDK.
//
// A transport adapter translates SDK callbacks into `SessionEvent`s and emits
// them on an `EventBus`. Every listener gets its own unbounded queue, so a
// slow listener delays its own events but never loses any. Each session
// coordinator registers one receiver per connection and drops it on teardown.
//
// ────────────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::session::MediaTrack;

// ─── Events ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The transport lost the connection and is trying to restore it.
    Reconnecting,
    Reconnected,
    Disconnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    TrackSubscribed {
        track: MediaTrack,
        participant: String,
    },
    TrackUnsubscribed {
        track_sid: String,
        participant: String,
    },
    ParticipantDisconnected {
        participant: String,
    },
}

impl SessionEvent {
    /// Stable name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reconnecting => "reconnecting",
            Self::Reconnected => "reconnected",
            Self::Disconnected { .. } => "disconnected",
            Self::TrackSubscribed { .. } => "track_subscribed",
            Self::TrackUnsubscribed { .. } => "track_unsubscribed",
            Self::ParticipantDisconnected { .. } => "participant_disconnected",
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── EventBus ───────────────────────────────────────────────────────────────

/// Fan-out channel for [`SessionEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Publish an event to every live listener. Returns how many received
    /// it (zero when nobody is listening, which is not an error). Listeners
    /// whose receiver was dropped are pruned.
    pub fn emit(&self, event: SessionEvent) -> usize {
        debug!(event = event.as_str(), "emitting session event");
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
        listeners.len()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(tx);
        rx
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let evt = SessionEvent::TrackSubscribed {
            track: MediaTrack::camera("TR_1"),
            participant: "alice".into(),
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "track_subscribed");
        assert_eq!(json["participant"], "alice");
        assert_eq!(json["track"]["source"], "camera");

        let parsed: SessionEvent = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
        assert_eq!(parsed, SessionEvent::Disconnected { reason: None });
    }

    #[tokio::test]
    async fn bus_fanout() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let n = bus.emit(SessionEvent::Reconnected);
        assert_eq!(n, 2);

        assert_eq!(rx1.recv().await.unwrap(), SessionEvent::Reconnected);
        assert_eq!(rx2.recv().await.unwrap(), SessionEvent::Reconnected);
    }

    #[tokio::test]
    async fn backlog_is_delivered_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        for i in 0..1000 {
            bus.emit(SessionEvent::ParticipantDisconnected {
                participant: format!("p{i}"),
            });
        }

        for i in 0..1000 {
            assert_eq!(
                rx.recv().await.unwrap(),
                SessionEvent::ParticipantDisconnected {
                    participant: format!("p{i}")
                }
            );
        }
    }

    #[test]
    fn emit_without_listeners_is_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(SessionEvent::Reconnecting), 0);

        let rx = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);
        drop(rx);
        assert_eq!(bus.listener_count(), 0);
    }
}
