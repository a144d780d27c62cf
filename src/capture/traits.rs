//! Host capability trait definitions
//!
//! The browser supplies media acquisition, the capture-source picker, script
//! injection, and frame scheduling. Each is modeled here as a trait so the
//! session pipeline stays independent of any concrete host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::stream::LiveStream;
use crate::channel::TabId;

/// Errors that can occur while acquiring media from the host
#[derive(Error, Debug, Clone)]
pub enum AcquireError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Capture error: {0}")]
    Capture(String),
}

/// Result type for acquisition operations
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Identifier of a user-chosen screen, window, or tab
///
/// Produced by the host's capture-selection UI; only meaningful to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureSourceId(pub String);

impl CaptureSourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaptureSourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Constraints for the camera + microphone request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConstraints {
    /// Whether to request an audio track alongside video
    pub audio: bool,

    /// Maximum video width in pixels
    pub max_width: u32,

    /// Maximum video height in pixels
    pub max_height: u32,

    /// Pin the front-facing camera when the host supports the constraint
    pub facing_user: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            max_width: 640,
            max_height: 480,
            facing_user: false,
        }
    }
}

/// Constraints for the display-capture request, bound to a chosen source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConstraints {
    /// The capture source the stream must be bound to
    pub source_id: CaptureSourceId,

    /// Maximum video width in pixels
    pub max_width: u32,

    /// Maximum video height in pixels
    pub max_height: u32,
}

impl DisplayConstraints {
    pub fn for_source(source_id: CaptureSourceId) -> Self {
        Self {
            source_id,
            max_width: 1920,
            max_height: 1200,
        }
    }
}

/// Media acquisition capability (getUserMedia analogue)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a camera + microphone stream
    ///
    /// Suspends until the host resolves the permission prompt. Denial
    /// surfaces as `AcquireError::PermissionDenied`.
    async fn acquire_camera(&self, constraints: &CameraConstraints) -> AcquireResult<LiveStream>;

    /// Request a display stream bound to a previously chosen source
    async fn acquire_display(&self, constraints: &DisplayConstraints) -> AcquireResult<LiveStream>;

    /// Whether the host understands the facing-mode constraint
    fn supports_facing_mode(&self) -> bool;
}

/// Capture-source selection dialog (desktop-capture chooser analogue)
///
/// Returns `None` when the user dismisses the dialog; cancellation is an
/// ordinary outcome, not a fault.
#[async_trait]
pub trait SourcePicker: Send + Sync {
    async fn choose_source(&self, tab: TabId) -> Option<CaptureSourceId>;
}

/// Script/style injection into a tab
#[async_trait]
pub trait TabInjector: Send + Sync {
    async fn inject(&self, tab: TabId) -> AcquireResult<()>;
}

/// Display refresh scheduling (requestAnimationFrame analogue)
///
/// `tick` suspends until the next refresh, which is what keeps the draw loop
/// from outpacing the display.
#[async_trait]
pub trait FrameClock: Send + Sync {
    async fn tick(&self);
}

/// Frame clock backed by a fixed interval, for running outside a display host
pub struct IntervalClock {
    period: Duration,
}

impl IntervalClock {
    /// Create a clock ticking at roughly the given frame rate
    pub fn with_fps(fps: u32) -> Self {
        Self {
            period: Duration::from_micros(1_000_000 / fps.max(1) as u64),
        }
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::with_fps(60)
    }
}

#[async_trait]
impl FrameClock for IntervalClock {
    async fn tick(&self) {
        tokio::time::sleep(self.period).await;
    }
}
