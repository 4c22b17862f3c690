use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::media::MediaRecorder;

// ---------------------------------------------------------------------------
// Local recording
// ---------------------------------------------------------------------------
//
// The recorder is an external encoder (the browser's MediaRecorder, or any
// other muxer) that hands out encoded chunks while it runs. Chunks are kept
// in memory in the order they arrive; the downloadable file is simply their
// concatenation.
//
//   idle --start--> recording --stop--> idle
//
// Chunks survive `stop` and are only dropped when the pipeline is torn down.
// The recorder is built once, from the tracks captured at join time.

pub const RECORDING_FILE_NAME: &str = "recording.webm";
pub const RECORDING_MIME_TYPE: &str = "video/webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

struct ChunkBuffer {
    chunks: Vec<Bytes>,
    attached: bool,
}

/// Data callback handed to a recorder.
///
/// Zero-size chunks are discarded, and so is everything pushed after the
/// pipeline has been torn down.
#[derive(Clone)]
pub struct ChunkSink {
    buffer: Arc<Mutex<ChunkBuffer>>,
}

impl ChunkSink {
    /// Append `chunk`. Returns whether it was retained.
    pub fn push(&self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            debug!("Discarding empty recording chunk");
            return false;
        }
        let mut buffer = self.buffer.lock();
        if !buffer.attached {
            debug!("Recording sink detached, dropping {} bytes", chunk.len());
            return false;
        }
        buffer.chunks.push(chunk);
        true
    }
}

/// A finished recording, ready to be offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub data: Bytes,
    pub chunk_count: usize,
    pub started_at: Option<DateTime<Utc>>,
}

impl RecordingArtifact {
    /// Write the artifact into `dir`, creating the directory if needed.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name);

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&self.data).await?;
        file.flush().await?;

        info!(
            "Recording saved to {} ({} bytes)",
            path.display(),
            self.data.len()
        );
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// RecordingPipeline
// ---------------------------------------------------------------------------

pub struct RecordingPipeline {
    recorder: Option<Box<dyn MediaRecorder>>,
    state: RecordingState,
    buffer: Arc<Mutex<ChunkBuffer>>,
    started_at: Option<DateTime<Utc>>,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self {
            recorder: None,
            state: RecordingState::Idle,
            buffer: Arc::new(Mutex::new(ChunkBuffer {
                chunks: Vec::new(),
                attached: true,
            })),
            started_at: None,
        }
    }

    /// The data callback to register with a recorder.
    pub fn sink(&self) -> ChunkSink {
        ChunkSink {
            buffer: Arc::clone(&self.buffer),
        }
    }

    /// Install the recorder. Only the first one is kept.
    pub fn install(&mut self, recorder: Box<dyn MediaRecorder>) -> bool {
        if self.recorder.is_some() {
            warn!("Recorder already built for this session, ignoring replacement");
            return false;
        }
        self.recorder = Some(recorder);
        true
    }

    pub fn has_recorder(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Start recording. Returns `false` without doing anything when already
    /// recording or when no recorder has been built.
    pub fn start(&mut self) -> Result<bool, SessionError> {
        if self.is_recording() {
            return Ok(false);
        }
        let Some(recorder) = self.recorder.as_mut() else {
            debug!("No recorder available, ignoring start");
            return Ok(false);
        };

        recorder.start()?;
        self.state = RecordingState::Recording;
        self.started_at = Some(Utc::now());
        info!("Recording started");
        Ok(true)
    }

    /// Stop recording. Returns `false` when not recording. Retained chunks
    /// are kept.
    pub fn stop(&mut self) -> Result<bool, SessionError> {
        if !self.is_recording() {
            return Ok(false);
        }
        self.state = RecordingState::Idle;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.stop()?;
        }
        info!("Recording stopped ({} chunks)", self.chunk_count());
        Ok(true)
    }

    pub fn chunk_count(&self) -> usize {
        self.buffer.lock().chunks.len()
    }

    /// Concatenate every retained chunk, in arrival order. Chunks are not
    /// consumed, so repeated downloads yield identical data.
    pub fn download(&self) -> Result<RecordingArtifact, SessionError> {
        let buffer = self.buffer.lock();
        if buffer.chunks.is_empty() {
            return Err(SessionError::NothingRecorded);
        }

        let total: usize = buffer.chunks.iter().map(Bytes::len).sum();
        let mut data = BytesMut::with_capacity(total);
        for chunk in &buffer.chunks {
            data.put_slice(chunk);
        }

        Ok(RecordingArtifact {
            file_name: RECORDING_FILE_NAME,
            mime_type: RECORDING_MIME_TYPE,
            data: data.freeze(),
            chunk_count: buffer.chunks.len(),
            started_at: self.started_at,
        })
    }

    /// Stop the recorder, detach the sink and drop every chunk.
    pub fn teardown(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Recorder failed to stop during teardown: {e}");
        }
        let mut buffer = self.buffer.lock();
        buffer.attached = false;
        buffer.chunks.clear();
        drop(buffer);
        self.recorder = None;
    }
}

impl Default for RecordingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
