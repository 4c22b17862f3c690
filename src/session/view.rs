use serde::Serialize;
use tracing::{debug, info, warn};

use super::media::{MediaTrack, TrackKind};
use super::roster::{ParticipantRoster, Upsert};
use crate::events::SessionEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// A remote screen share shown in the screen-share slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteScreenShare {
    pub participant: String,
    pub track: MediaTrack,
}

/// Everything a UI renders for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub connection: ConnectionState,
    pub local_identity: Option<String>,
    pub participants: ParticipantRoster,
    pub screen_share: Option<RemoteScreenShare>,
    /// Screen track published by the local participant.
    pub local_screen: Option<MediaTrack>,
    pub is_screen_sharing: bool,
    pub is_recording: bool,
    /// Latest user-facing failure, cleared by the next successful connect.
    pub last_error: Option<String>,
}

impl SessionView {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Apply one room event.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Reconnecting => {
                warn!("Connection lost, reconnecting");
                self.connection = ConnectionState::Reconnecting;
            }
            SessionEvent::Reconnected => {
                info!("Reconnected to room");
                self.connection = ConnectionState::Connected;
            }
            SessionEvent::Disconnected { reason } => {
                warn!(
                    "Disconnected from room{}",
                    reason.map(|r| format!(": {r}")).unwrap_or_default()
                );
                self.clear_session();
            }
            SessionEvent::TrackSubscribed { track, participant } => {
                self.on_track_subscribed(track, participant);
            }
            SessionEvent::TrackUnsubscribed {
                track_sid,
                participant,
            } => {
                let was_screen = self
                    .screen_share
                    .as_ref()
                    .is_some_and(|s| s.track.sid == track_sid);
                if was_screen {
                    self.clear_remote_screen();
                } else {
                    self.participants.clear_track(&participant, &track_sid);
                }
            }
            SessionEvent::ParticipantDisconnected { participant } => {
                if self.participants.remove(&participant).is_some() {
                    info!("Participant '{participant}' left");
                }
                let owned_screen = self
                    .screen_share
                    .as_ref()
                    .is_some_and(|s| s.participant == participant);
                if owned_screen {
                    self.clear_remote_screen();
                }
            }
        }
    }

    fn on_track_subscribed(&mut self, track: MediaTrack, participant: String) {
        if track.is_screen() {
            if track.kind != TrackKind::Video {
                debug!(sid = %track.sid, "Ignoring screen audio from '{participant}'");
                return;
            }
            debug!(sid = %track.sid, "Screen share from '{participant}'");
            self.screen_share = Some(RemoteScreenShare { participant, track });
            self.is_screen_sharing = true;
            return;
        }

        match self.participants.upsert(&participant, track) {
            Upsert::Added => info!("Participant '{participant}' joined"),
            Upsert::Replaced => debug!("Participant '{participant}' track replaced"),
        }
    }

    fn clear_remote_screen(&mut self) {
        self.screen_share = None;
        self.is_screen_sharing = self.local_screen.is_some();
    }

    /// Forget everything tied to the current connection. The local recording
    /// outlives the connection, and `last_error` is kept so the UI can still
    /// explain what happened.
    pub(crate) fn clear_session(&mut self) {
        *self = SessionView {
            is_recording: self.is_recording,
            last_error: self.last_error.take(),
            ..SessionView::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed(track: MediaTrack, participant: &str) -> SessionEvent {
        SessionEvent::TrackSubscribed {
            track,
            participant: participant.into(),
        }
    }

    #[test]
    fn repeated_identity_keeps_two_entries_with_latest_track() {
        let mut view = SessionView::default();
        view.apply(subscribed(MediaTrack::camera("A1"), "A"));
        view.apply(subscribed(MediaTrack::camera("B1"), "B"));
        view.apply(subscribed(MediaTrack::camera("A2"), "A"));

        assert_eq!(view.participants.identities(), vec!["A", "B"]);
        let a = view.participants.get("A").unwrap();
        assert_eq!(a.video.as_ref().unwrap().sid, "A2");
    }

    #[test]
    fn screen_track_goes_to_screen_slot() {
        let mut view = SessionView::default();
        view.apply(subscribed(MediaTrack::screen("S1"), "A"));

        assert!(view.is_screen_sharing);
        assert_eq!(view.screen_share.as_ref().unwrap().track.sid, "S1");
        assert!(view.participants.is_empty());
    }

    #[test]
    fn participant_departure_removes_entry_and_screen() {
        let mut view = SessionView::default();
        view.apply(subscribed(MediaTrack::camera("A1"), "A"));
        view.apply(subscribed(MediaTrack::camera("B1"), "B"));
        view.apply(subscribed(MediaTrack::screen("S1"), "B"));

        view.apply(SessionEvent::ParticipantDisconnected {
            participant: "B".into(),
        });

        assert_eq!(view.participants.identities(), vec!["A"]);
        assert!(view.screen_share.is_none());
        assert!(!view.is_screen_sharing);
    }

    #[test]
    fn remote_screen_end_keeps_local_share_flag() {
        let mut view = SessionView {
            local_screen: Some(MediaTrack::screen("mine")),
            is_screen_sharing: true,
            ..Default::default()
        };
        view.apply(subscribed(MediaTrack::screen("S1"), "A"));
        view.apply(SessionEvent::TrackUnsubscribed {
            track_sid: "S1".into(),
            participant: "A".into(),
        });

        assert!(view.screen_share.is_none());
        assert!(view.is_screen_sharing);
    }

    #[test]
    fn reconnect_cycle_keeps_session() {
        let mut view = SessionView {
            connection: ConnectionState::Connected,
            local_identity: Some("me".into()),
            ..Default::default()
        };
        view.apply(SessionEvent::Reconnecting);
        assert_eq!(view.connection, ConnectionState::Reconnecting);
        view.apply(SessionEvent::Reconnected);
        assert!(view.is_connected());
        assert_eq!(view.local_identity.as_deref(), Some("me"));
    }

    #[test]
    fn disconnect_drops_session_but_keeps_error() {
        let mut view = SessionView {
            connection: ConnectionState::Connected,
            local_identity: Some("me".into()),
            last_error: Some("permission denied".into()),
            ..Default::default()
        };
        view.apply(subscribed(MediaTrack::camera("A1"), "A"));
        view.apply(SessionEvent::Disconnected {
            reason: Some("server shutdown".into()),
        });

        assert_eq!(view.connection, ConnectionState::Disconnected);
        assert!(view.local_identity.is_none());
        assert!(view.participants.is_empty());
        assert_eq!(view.last_error.as_deref(), Some("permission denied"));
    }
}
