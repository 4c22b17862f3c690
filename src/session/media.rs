use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::{MediaError, TransportError};
use super::recording::ChunkSink;
use crate::events::SessionEvent;

// ---------------------------------------------------------------------------
// Track classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Where a track's media comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
    Unknown,
}

/// A single audio or video track, local or remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTrack {
    /// Server-assigned track id.
    pub sid: String,
    pub kind: TrackKind,
    pub source: TrackSource,
}

impl MediaTrack {
    pub fn new(sid: impl Into<String>, kind: TrackKind, source: TrackSource) -> Self {
        Self {
            sid: sid.into(),
            kind,
            source,
        }
    }

    pub fn camera(sid: impl Into<String>) -> Self {
        Self::new(sid, TrackKind::Video, TrackSource::Camera)
    }

    pub fn microphone(sid: impl Into<String>) -> Self {
        Self::new(sid, TrackKind::Audio, TrackSource::Microphone)
    }

    pub fn screen(sid: impl Into<String>) -> Self {
        Self::new(sid, TrackKind::Video, TrackSource::Screen)
    }

    pub fn is_screen(&self) -> bool {
        self.source == TrackSource::Screen
    }
}

/// Camera and microphone captured when joining a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTracks {
    pub audio: MediaTrack,
    pub video: MediaTrack,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Connection to a collaboration room, provided by the conferencing SDK.
#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Register a listener for room events. Every event emitted after this
    /// call is delivered, in order. Dropping the receiver deregisters it.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;

    /// Join the room at `url` with `token`, returning the local identity.
    async fn connect(&self, url: &str, token: &str) -> Result<String, TransportError>;

    async fn disconnect(&self);

    async fn publish_track(&self, track: &MediaTrack) -> Result<(), TransportError>;

    async fn unpublish_track(&self, sid: &str) -> Result<(), TransportError>;

    /// Tracks currently published by the local participant.
    fn published_tracks(&self) -> Vec<MediaTrack>;
}

/// Platform capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire the local microphone and camera.
    async fn create_local_tracks(&self) -> Result<LocalTracks, MediaError>;

    /// Ask the user for a screen to capture.
    async fn capture_display(&self) -> Result<MediaTrack, MediaError>;

    /// Build a recorder over `tracks` that delivers encoded chunks to `sink`.
    fn create_recorder(
        &self,
        tracks: &[MediaTrack],
        sink: ChunkSink,
    ) -> Result<Box<dyn MediaRecorder>, MediaError>;
}

/// An encoder producing chunks while started.
pub trait MediaRecorder: Send {
    fn start(&mut self) -> Result<(), MediaError>;
    fn stop(&mut self) -> Result<(), MediaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_serializes_lowercase() {
        let json = serde_json::to_value(MediaTrack::screen("TR_1")).unwrap();
        assert_eq!(json["kind"], "video");
        assert_eq!(json["source"], "screen");
    }

    #[test]
    fn only_screen_source_is_screen() {
        assert!(MediaTrack::screen("a").is_screen());
        assert!(!MediaTrack::camera("b").is_screen());
        assert!(!MediaTrack::microphone("c").is_screen());
    }
}
