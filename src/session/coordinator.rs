use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::media::{MediaDevices, RoomTransport};
use super::recording::{RecordingArtifact, RecordingPipeline};
use super::screen_share::ScreenShareManager;
use super::view::{ConnectionState, SessionView};
use crate::events::SessionEvent;

// ---------------------------------------------------------------------------
// Listener ownership
// ---------------------------------------------------------------------------

/// The event pump registered for one connection.
struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop the pump and wait until its receiver has been dropped.
    async fn deregister(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }

    fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn pump_events(
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
    view: Arc<watch::Sender<SessionView>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                debug!(event = event.as_str(), "session event");
                view.send_modify(|v| v.apply(event));
            }
        }
    }
    debug!("Session listener deregistered");
}

// ---------------------------------------------------------------------------
// SessionCoordinator
// ---------------------------------------------------------------------------

/// Owns one connection to a collaboration room.
///
/// State is published through a `watch` channel ([`watch`](Self::watch)).
/// Failures are returned to the caller, logged, and mirrored into
/// [`SessionView::last_error`].
///
/// The coordinator carries a liveness token standing for the UI context that
/// owns it. [`close`](Self::close) (or dropping the coordinator) cancels it;
/// async work that completes afterwards leaves the view untouched.
pub struct SessionCoordinator {
    transport: Arc<dyn RoomTransport>,
    devices: Arc<dyn MediaDevices>,
    screen: ScreenShareManager,
    server_url: String,
    view: Arc<watch::Sender<SessionView>>,
    recording: Mutex<RecordingPipeline>,
    live: CancellationToken,
    listener: Mutex<Option<ListenerHandle>>,
}

impl SessionCoordinator {
    pub fn new(
        transport: Arc<dyn RoomTransport>,
        devices: Arc<dyn MediaDevices>,
        server_url: impl Into<String>,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            screen: ScreenShareManager::new(Arc::clone(&transport), Arc::clone(&devices)),
            transport,
            devices,
            server_url: server_url.into(),
            view: Arc::new(view),
            recording: Mutex::new(RecordingPipeline::new()),
            live: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Observe the session state.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Snapshot of the current state.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        !self.live.is_cancelled()
    }

    // ── Connection ─────────────────────────────────────────────────────

    /// Join the room with `credential`, then publish the local camera and
    /// microphone and build the recorder from them.
    ///
    /// The room listener is registered before connecting, so events sent as
    /// soon as the connection opens are not lost. A failure while acquiring
    /// or publishing local media does not fail the call: the session stays
    /// connected and the failure is reported in `last_error`.
    pub async fn connect(&self, credential: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        if credential.trim().is_empty() {
            return Err(self.fail(SessionError::MissingCredential));
        }
        if self.server_url.is_empty() {
            return Err(self.fail(SessionError::MissingServerUrl));
        }

        let mut busy = false;
        self.view.send_if_modified(|v| {
            if v.connection != ConnectionState::Disconnected {
                busy = true;
                return false;
            }
            v.connection = ConnectionState::Connecting;
            v.last_error = None;
            true
        });
        if busy {
            return Err(SessionError::AlreadyConnected);
        }

        let rx = self.transport.subscribe();

        let identity = match self.transport.connect(&self.server_url, credential).await {
            Ok(identity) => identity,
            Err(e) => {
                drop(rx);
                if self.is_live() {
                    self.view
                        .send_modify(|v| v.connection = ConnectionState::Disconnected);
                }
                error!("Error connecting to room: {e}");
                return Err(self.fail(e.into()));
            }
        };

        if !self.is_live() {
            debug!("Connect completed after teardown, disconnecting");
            drop(rx);
            self.transport.disconnect().await;
            return Err(SessionError::Closed);
        }

        info!("Connected to room as '{identity}'");
        self.view.send_modify(|v| {
            v.connection = ConnectionState::Connected;
            v.local_identity = Some(identity);
        });
        self.register_listener(rx);

        if let Err(e) = self.publish_local_media().await {
            if matches!(e, SessionError::Closed) {
                return Err(e);
            }
            error!("Failed to publish local media: {e}");
            self.fail(e);
        }

        Ok(())
    }

    async fn publish_local_media(&self) -> Result<(), SessionError> {
        let tracks = self.devices.create_local_tracks().await?;
        self.ensure_live()?;

        self.transport.publish_track(&tracks.audio).await?;
        self.transport.publish_track(&tracks.video).await?;
        self.ensure_live()?;

        let sink = self.recording.lock().sink();
        let recorder = self
            .devices
            .create_recorder(&[tracks.video.clone(), tracks.audio.clone()], sink)?;
        self.recording.lock().install(recorder);

        info!(
            audio = %tracks.audio.sid,
            video = %tracks.video.sid,
            "Local media published"
        );
        Ok(())
    }

    fn register_listener(&self, rx: mpsc::UnboundedReceiver<SessionEvent>) {
        let cancel = self.live.child_token();
        let task = tokio::spawn(pump_events(rx, Arc::clone(&self.view), cancel.clone()));
        let previous = self.listener.lock().replace(ListenerHandle { cancel, task });
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    // ── Screen sharing ─────────────────────────────────────────────────

    /// Publish the local screen, replacing any screen already published.
    pub async fn share_screen(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        if !self.view.borrow().is_connected() {
            error!("Room is not connected, cannot share screen");
            return Err(self.fail(SessionError::NotConnected));
        }

        match self.screen.replace(&self.live).await {
            Ok(track) => {
                self.ensure_live()?;
                info!("Screen shared successfully");
                self.view.send_modify(|v| {
                    v.local_screen = Some(track);
                    v.is_screen_sharing = true;
                });
                Ok(())
            }
            Err(SessionError::Closed) => Err(SessionError::Closed),
            Err(e) => {
                error!("Error sharing screen: {e}");
                if self.is_live() {
                    self.view.send_modify(|v| v.is_screen_sharing = false);
                }
                Err(self.fail(e))
            }
        }
    }

    /// Unpublish the local screen share, if any.
    pub async fn stop_screen_share(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let released = self.screen.release().await.map_err(|e| self.fail(e))?;
        self.ensure_live()?;
        debug!("Released {released} screen track(s)");
        self.view.send_modify(|v| {
            v.local_screen = None;
            v.is_screen_sharing = v.screen_share.is_some();
        });
        Ok(())
    }

    // ── Recording ──────────────────────────────────────────────────────

    /// Start the local recording. `Ok(false)` when already recording or when
    /// no recorder has been built yet.
    pub fn start_recording(&self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let started = self.recording.lock().start();
        let started = started.map_err(|e| self.fail(e))?;
        if started {
            self.view.send_modify(|v| v.is_recording = true);
        }
        Ok(started)
    }

    /// Stop the local recording. `Ok(false)` when not recording.
    pub fn stop_recording(&self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let (stopped, recording) = {
            let mut pipeline = self.recording.lock();
            let stopped = pipeline.stop();
            (stopped, pipeline.is_recording())
        };
        self.view.send_modify(|v| v.is_recording = recording);
        stopped.map_err(|e| self.fail(e))
    }

    pub fn recorded_chunk_count(&self) -> usize {
        self.recording.lock().chunk_count()
    }

    /// The recording so far as a single artifact.
    pub fn download_recording(&self) -> Result<RecordingArtifact, SessionError> {
        self.recording.lock().download()
    }

    /// Write the recording into `dir`.
    pub async fn save_recording(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let artifact = self.download_recording()?;
        artifact.save_to(dir).await.map_err(|e| self.fail(e))
    }

    // ── Teardown ───────────────────────────────────────────────────────

    /// Tear the session down: deregister the room listener, stop and detach
    /// the recorder, then disconnect.
    pub async fn close(&self) {
        if !self.is_live() {
            return;
        }
        self.live.cancel();

        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.deregister().await;
        }

        self.recording.lock().teardown();
        self.transport.disconnect().await;

        self.view.send_modify(|v| {
            v.clear_session();
            v.is_recording = false;
        });
        info!("Session closed");
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Publish `err` as the user-facing error, unless the session is gone.
    fn fail(&self, err: SessionError) -> SessionError {
        if self.is_live() {
            let message = err.to_string();
            self.view.send_modify(|v| v.last_error = Some(message));
        }
        err
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        let was_live = self.is_live();
        self.live.cancel();
        self.recording.get_mut().teardown();

        let listener = self.listener.get_mut().take();
        if !was_live {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(&self.transport);
                handle.spawn(async move {
                    if let Some(listener) = listener {
                        listener.deregister().await;
                    }
                    transport.disconnect().await;
                    debug!("Dropped session disconnected");
                });
            }
            Err(_) => {
                if let Some(listener) = listener {
                    listener.abort();
                }
                warn!("Session dropped outside a runtime, room left connected");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
