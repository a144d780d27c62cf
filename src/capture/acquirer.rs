//! Stream acquisition orchestration
//!
//! Acquires the camera + microphone stream first, then the display stream
//! bound to the chosen capture source. Any failure releases every stream
//! acquired so far; there are no retries.

use std::sync::Arc;

use super::stream::StreamPair;
use super::traits::{
    AcquireResult, CameraConstraints, CaptureSourceId, DisplayConstraints, MediaDevices,
};

/// Acquires the session's stream pair from the host
pub struct StreamAcquirer {
    devices: Arc<dyn MediaDevices>,
}

impl StreamAcquirer {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self { devices }
    }

    /// Acquire camera + microphone, then the display stream for `source`
    ///
    /// A cancelled or denied prompt surfaces as the underlying
    /// `AcquireError`; partially acquired streams are stopped before the
    /// error is returned.
    pub async fn acquire(&self, source: &CaptureSourceId) -> AcquireResult<StreamPair> {
        let camera_constraints = CameraConstraints {
            facing_user: self.devices.supports_facing_mode(),
            ..CameraConstraints::default()
        };

        let user = self.devices.acquire_camera(&camera_constraints).await?;
        tracing::debug!("Acquired camera stream {}", user.id());

        let display_constraints = DisplayConstraints::for_source(source.clone());
        let screen = match self.devices.acquire_display(&display_constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("Display acquisition failed: {}", err);
                user.stop();
                return Err(err);
            }
        };
        tracing::debug!("Acquired display stream {}", screen.id());

        Ok(StreamPair { user, screen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::stream::{LiveStream, SourceKind};
    use crate::capture::traits::AcquireError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Host double that can be told to fail either request
    struct FakeDevices {
        fail_camera: bool,
        fail_display: bool,
        camera: Mutex<Option<LiveStream>>,
    }

    impl FakeDevices {
        fn new(fail_camera: bool, fail_display: bool) -> Self {
            Self {
                fail_camera,
                fail_display,
                camera: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MediaDevices for FakeDevices {
        async fn acquire_camera(
            &self,
            constraints: &CameraConstraints,
        ) -> AcquireResult<LiveStream> {
            if self.fail_camera {
                return Err(AcquireError::PermissionDenied("camera".into()));
            }
            let stream = LiveStream::new(SourceKind::CameraMic, constraints.audio);
            *self.camera.lock() = Some(stream.clone());
            Ok(stream)
        }

        async fn acquire_display(
            &self,
            _constraints: &DisplayConstraints,
        ) -> AcquireResult<LiveStream> {
            if self.fail_display {
                return Err(AcquireError::Capture("source gone".into()));
            }
            Ok(LiveStream::new(SourceKind::Display, false))
        }

        fn supports_facing_mode(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_acquires_both_streams() {
        let acquirer = StreamAcquirer::new(Arc::new(FakeDevices::new(false, false)));
        let pair = acquirer.acquire(&CaptureSourceId::from("abc")).await.unwrap();
        assert!(pair.user.is_live());
        assert!(pair.screen.is_live());
        assert!(pair.user.audio_track().is_some());
    }

    #[tokio::test]
    async fn test_camera_denial_acquires_nothing_else() {
        let acquirer = StreamAcquirer::new(Arc::new(FakeDevices::new(true, false)));
        let err = acquirer
            .acquire(&CaptureSourceId::from("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_display_failure_releases_camera() {
        let devices = Arc::new(FakeDevices::new(false, true));
        let acquirer = StreamAcquirer::new(devices.clone());
        let err = acquirer
            .acquire(&CaptureSourceId::from("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::Capture(_)));

        let camera = devices.camera.lock().clone().unwrap();
        assert!(!camera.is_live());
    }
}
