use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::SessionError;
use super::media::{MediaDevices, MediaTrack, RoomTransport};

/// Publishes the local screen, keeping at most one screen track published.
///
/// Unpublishing the previous screens and publishing the new one happen under
/// one lock, so overlapping calls cannot each publish a screen.
pub struct ScreenShareManager {
    transport: Arc<dyn RoomTransport>,
    devices: Arc<dyn MediaDevices>,
    publishing: Mutex<()>,
}

impl ScreenShareManager {
    pub fn new(transport: Arc<dyn RoomTransport>, devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            transport,
            devices,
            publishing: Mutex::new(()),
        }
    }

    /// Capture a screen and publish it in place of any screen track already
    /// published.
    ///
    /// The capture prompt can take arbitrarily long; if `live` is cancelled
    /// meanwhile nothing is unpublished or published.
    pub async fn replace(&self, live: &CancellationToken) -> Result<MediaTrack, SessionError> {
        let track = self.devices.capture_display().await?;

        let _publishing = self.publishing.lock().await;
        if live.is_cancelled() {
            return Err(SessionError::Closed);
        }

        let released = self.release_published().await?;
        if released > 0 {
            debug!("Replaced {released} previous screen track(s)");
        }

        self.transport.publish_track(&track).await?;
        info!(sid = %track.sid, "Screen track published");
        Ok(track)
    }

    /// Unpublish every published screen track. Returns how many there were.
    pub async fn release(&self) -> Result<usize, SessionError> {
        let _publishing = self.publishing.lock().await;
        self.release_published().await
    }

    async fn release_published(&self) -> Result<usize, SessionError> {
        let screens: Vec<MediaTrack> = self
            .transport
            .published_tracks()
            .into_iter()
            .filter(MediaTrack::is_screen)
            .collect();

        for track in &screens {
            self.transport.unpublish_track(&track.sid).await?;
            debug!(sid = %track.sid, "Screen track unpublished");
        }
        Ok(screens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::{MemoryDevices, MemoryTransport, TransportOp};
    use crate::session::MediaError;

    fn manager() -> (ScreenShareManager, Arc<MemoryTransport>, Arc<MemoryDevices>) {
        let transport = Arc::new(MemoryTransport::new("me"));
        let devices = Arc::new(MemoryDevices::new());
        let manager = ScreenShareManager::new(transport.clone(), devices.clone());
        (manager, transport, devices)
    }

    #[tokio::test]
    async fn second_share_unpublishes_the_first() {
        let (manager, transport, _) = manager();
        let live = CancellationToken::new();

        let first = manager.replace(&live).await.unwrap();
        let second = manager.replace(&live).await.unwrap();

        let screens: Vec<_> = transport
            .published_tracks()
            .into_iter()
            .filter(MediaTrack::is_screen)
            .collect();
        assert_eq!(screens, vec![second.clone()]);

        assert_eq!(
            transport.operations(),
            vec![
                TransportOp::Publish(first.sid.clone()),
                TransportOp::Unpublish(first.sid),
                TransportOp::Publish(second.sid),
            ]
        );
    }

    #[tokio::test]
    async fn overlapping_shares_publish_one_screen() {
        let (manager, transport, _) = manager();
        transport.yield_on_publish(true);
        let live = CancellationToken::new();

        let (first, second) = tokio::join!(manager.replace(&live), manager.replace(&live));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(transport.published_tracks(), vec![second.clone()]);
        assert_eq!(
            transport.operations(),
            vec![
                TransportOp::Publish(first.sid.clone()),
                TransportOp::Unpublish(first.sid),
                TransportOp::Publish(second.sid),
            ]
        );
    }

    #[tokio::test]
    async fn denied_capture_leaves_published_tracks_alone() {
        let (manager, transport, devices) = manager();
        let live = CancellationToken::new();
        manager.replace(&live).await.unwrap();

        devices.deny_display(true);
        let err = manager.replace(&live).await.unwrap_err();
        assert!(matches!(err, SessionError::Media(MediaError::PermissionDenied)));
        assert_eq!(transport.published_tracks().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_context_publishes_nothing() {
        let (manager, transport, _) = manager();
        let live = CancellationToken::new();
        live.cancel();

        assert!(matches!(
            manager.replace(&live).await,
            Err(SessionError::Closed)
        ));
        assert!(transport.operations().is_empty());
    }

    #[tokio::test]
    async fn release_only_touches_screen_tracks() {
        let (manager, transport, _) = manager();
        transport
            .publish_track(&MediaTrack::camera("cam"))
            .await
            .unwrap();
        manager.replace(&CancellationToken::new()).await.unwrap();

        assert_eq!(manager.release().await.unwrap(), 1);
        assert_eq!(transport.published_tracks(), vec![MediaTrack::camera("cam")]);
    }
}
