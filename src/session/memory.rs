//! In-process collaborators.
//!
//! [`MemoryTransport`] behaves like a room that accepts every credential
//! (unless told otherwise) and lets the caller inject room events.
//! [`MemoryDevices`] hands out synthetic tracks and a recorder whose output
//! is fed by hand. Both keep enough bookkeeping to assert on what a
//! coordinator did with them.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use super::error::{MediaError, TransportError};
use super::media::{LocalTracks, MediaDevices, MediaRecorder, MediaTrack, RoomTransport};
use super::recording::ChunkSink;
use crate::events::{EventBus, SessionEvent};

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

/// A call made on a [`MemoryTransport`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Connect { url: String },
    Publish(String),
    Unpublish(String),
    Disconnect,
}

#[derive(Default)]
struct TransportState {
    connected: bool,
    published: Vec<MediaTrack>,
    ops: Vec<TransportOp>,
    next_connect_error: Option<TransportError>,
    connect_gate: Option<Arc<Notify>>,
    yield_on_publish: bool,
    listeners_at_disconnect: Vec<usize>,
}

pub struct MemoryTransport {
    identity: String,
    bus: EventBus,
    state: Mutex<TransportState>,
}

impl MemoryTransport {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            bus: EventBus::new(),
            state: Mutex::new(TransportState::default()),
        }
    }

    /// Deliver a room event to every registered listener.
    pub fn emit(&self, event: SessionEvent) -> usize {
        self.bus.emit(event)
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    /// Make the next `connect` fail with `err`.
    pub fn fail_next_connect(&self, err: TransportError) {
        self.state.lock().next_connect_error = Some(err);
    }

    /// Hold every following `connect` until the returned gate is notified.
    pub fn hold_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().connect_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Suspend once inside every `publish_track`, letting other tasks run
    /// between the call and its completion.
    pub fn yield_on_publish(&self, slow: bool) {
        self.state.lock().yield_on_publish = slow;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Track operations and disconnects, excluding `connect`.
    pub fn operations(&self) -> Vec<TransportOp> {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| !matches!(op, TransportOp::Connect { .. }))
            .cloned()
            .collect()
    }

    pub fn all_operations(&self) -> Vec<TransportOp> {
        self.state.lock().ops.clone()
    }

    /// Number of registered listeners observed at each `disconnect`.
    pub fn listeners_at_disconnect(&self) -> Vec<usize> {
        self.state.lock().listeners_at_disconnect.clone()
    }
}

#[async_trait]
impl RoomTransport for MemoryTransport {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.bus.subscribe()
    }

    async fn connect(&self, url: &str, token: &str) -> Result<String, TransportError> {
        let gate = {
            let mut state = self.state.lock();
            state.ops.push(TransportOp::Connect {
                url: url.to_string(),
            });
            state.connect_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if let Some(err) = state.next_connect_error.take() {
            return Err(err);
        }
        if token.is_empty() {
            return Err(TransportError::Rejected("empty token".into()));
        }
        state.connected = true;
        debug!("memory transport connected to {url} as '{}'", self.identity);
        Ok(self.identity.clone())
    }

    async fn disconnect(&self) {
        let listeners = self.bus.listener_count();
        let mut state = self.state.lock();
        state.ops.push(TransportOp::Disconnect);
        state.listeners_at_disconnect.push(listeners);
        state.connected = false;
        state.published.clear();
    }

    async fn publish_track(&self, track: &MediaTrack) -> Result<(), TransportError> {
        let slow = self.state.lock().yield_on_publish;
        if slow {
            tokio::task::yield_now().await;
        }
        let mut state = self.state.lock();
        state.ops.push(TransportOp::Publish(track.sid.clone()));
        state.published.push(track.clone());
        Ok(())
    }

    async fn unpublish_track(&self, sid: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let idx = state
            .published
            .iter()
            .position(|t| t.sid == sid)
            .ok_or_else(|| TransportError::Track(format!("track '{sid}' is not published")))?;
        state.published.remove(idx);
        state.ops.push(TransportOp::Unpublish(sid.to_string()));
        Ok(())
    }

    fn published_tracks(&self) -> Vec<MediaTrack> {
        self.state.lock().published.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryDevices
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DevicesState {
    deny_display: bool,
    deny_media: bool,
    recorders_built: usize,
    sink: Option<ChunkSink>,
    recorder_tracks: Vec<MediaTrack>,
}

pub struct MemoryDevices {
    next_id: AtomicU32,
    recording: Arc<AtomicBool>,
    state: Mutex<DevicesState>,
}

impl MemoryDevices {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            recording: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(DevicesState::default()),
        }
    }

    /// Refuse screen capture, as a user dismissing the picker would.
    pub fn deny_display(&self, deny: bool) {
        self.state.lock().deny_display = deny;
    }

    /// Refuse camera and microphone access.
    pub fn deny_media(&self, deny: bool) {
        self.state.lock().deny_media = deny;
    }

    /// Feed a chunk from the recorder to its sink. Returns whether it was
    /// retained; `false` when no recorder has been built.
    pub fn emit_chunk(&self, chunk: impl Into<Bytes>) -> bool {
        let sink = self.state.lock().sink.clone();
        sink.is_some_and(|s| s.push(chunk.into()))
    }

    pub fn recorders_built(&self) -> usize {
        self.state.lock().recorders_built
    }

    /// Tracks the last recorder was built from.
    pub fn recorder_tracks(&self) -> Vec<MediaTrack> {
        self.state.lock().recorder_tracks.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn next_sid(&self, prefix: &str) -> String {
        format!("TR_{prefix}{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for MemoryDevices {
    async fn create_local_tracks(&self) -> Result<LocalTracks, MediaError> {
        if self.state.lock().deny_media {
            return Err(MediaError::PermissionDenied);
        }
        Ok(LocalTracks {
            audio: MediaTrack::microphone(self.next_sid("MIC")),
            video: MediaTrack::camera(self.next_sid("CAM")),
        })
    }

    async fn capture_display(&self) -> Result<MediaTrack, MediaError> {
        if self.state.lock().deny_display {
            return Err(MediaError::PermissionDenied);
        }
        Ok(MediaTrack::screen(self.next_sid("SCR")))
    }

    fn create_recorder(
        &self,
        tracks: &[MediaTrack],
        sink: ChunkSink,
    ) -> Result<Box<dyn MediaRecorder>, MediaError> {
        let mut state = self.state.lock();
        state.recorders_built += 1;
        state.sink = Some(sink);
        state.recorder_tracks = tracks.to_vec();
        Ok(Box::new(MemoryRecorder {
            running: Arc::clone(&self.recording),
        }))
    }
}

struct MemoryRecorder {
    running: Arc<AtomicBool>,
}

impl MediaRecorder for MemoryRecorder {
    fn start(&mut self) -> Result<(), MediaError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MediaError::Recorder("recorder already started".into()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MediaError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}
