use thiserror::Error;

/// Failures reported by a [`RoomTransport`](super::RoomTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("session endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("track operation failed: {0}")]
    Track(String),
}

/// Failures reported by [`MediaDevices`](super::MediaDevices) and recorders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("device unavailable: {0}")]
    Unavailable(String),
    #[error("recorder error: {0}")]
    Recorder(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a non-empty credential is required")]
    MissingCredential,
    #[error("no session endpoint configured")]
    MissingServerUrl,
    #[error("session is already connected")]
    AlreadyConnected,
    #[error("room is not connected")]
    NotConnected,
    #[error("session has been closed")]
    Closed,
    #[error("nothing has been recorded")]
    NothingRecorded,
    #[error("connection failed: {0}")]
    Transport(#[from] TransportError),
    #[error("media failure: {0}")]
    Media(#[from] MediaError),
    #[error("failed to save recording: {0}")]
    Io(#[from] std::io::Error),
}
