//! Client-side session coordination.
//!
//! A [`SessionCoordinator`] owns one connection to a collaboration room. It
//! turns the events emitted by a [`RoomTransport`] into a [`SessionView`]
//! that a UI observes through a `watch` channel, enforces the single
//! outgoing screen share, and drives a [`RecordingPipeline`] that captures
//! the local camera and microphone into a downloadable artifact.
//!
//! The SDK, the platform media devices and the recorder are reached only
//! through the traits in [`media`]. [`memory`] provides in-process
//! implementations of those traits.

pub mod coordinator;
pub mod error;
pub mod media;
pub mod memory;
pub mod recording;
pub mod roster;
pub mod screen_share;
pub mod view;

pub use coordinator::SessionCoordinator;
pub use error::{MediaError, SessionError, TransportError};
pub use media::{
    LocalTracks, MediaDevices, MediaRecorder, MediaTrack, RoomTransport, TrackKind, TrackSource,
};
pub use recording::{ChunkSink, RecordingArtifact, RecordingPipeline, RecordingState};
pub use roster::{ParticipantRoster, RemoteParticipant};
pub use view::{ConnectionState, RemoteScreenShare, SessionView};
