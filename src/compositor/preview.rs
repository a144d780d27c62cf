//! Session preview compositor
//!
//! Owns the draw surface for a preview session: each frame the screen stream
//! is drawn full-surface and the camera stream is layered as a scaled,
//! alpha-blended inset in the bottom-right corner. The composited result is
//! exposed as a stream for the recording sink.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};

use super::surface::DrawSurface;
use crate::capture::{
    CompositeStream, FrameClock, LiveStream, MediaTrack, TrackKind, VideoFeed, VideoFrame,
};

/// Inset scale bounds exposed to the size control
pub const MIN_INSET_SCALE: f64 = 0.2;
pub const MAX_INSET_SCALE: f64 = 2.0;

/// Default inset scale
pub const DEFAULT_INSET_SCALE: f64 = 0.7;

/// Default inset alpha
pub const DEFAULT_INSET_ALPHA: f64 = 0.54;

/// Unscaled inset width as a fraction of the surface width
const INSET_BASE_FRACTION: f64 = 0.3;

/// Distance between the inset and the surface edges, in pixels
const INSET_MARGIN: f64 = 8.0;

/// Placeholder drawn while the camera has produced no frame
const CAMERA_PLACEHOLDER_RGBA: [u8; 4] = [0, 128, 0, 255];

/// Change notifications published by the preview model
///
/// View layers subscribe to mirror the model into their controls; the model
/// itself never touches a view.
#[derive(Debug, Clone)]
pub enum PreviewEvent {
    ScaleChanged(f64),
    AlphaChanged(f64),
}

/// Placement of the camera inset on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsetRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Compute the camera inset rectangle
///
/// Width is `0.3 × surface width × scale`; height follows the camera's
/// intrinsic aspect ratio; the rectangle is anchored 8 px off the
/// bottom-right corner.
pub fn inset_rect(
    surface_w: u32,
    surface_h: u32,
    camera_w: u32,
    camera_h: u32,
    scale: f64,
) -> InsetRect {
    let aspect = camera_w as f64 / camera_h.max(1) as f64;
    let width = INSET_BASE_FRACTION * surface_w as f64 * scale;
    let height = width / aspect;
    let x = surface_w as f64 - width - INSET_MARGIN;
    let y = surface_h as f64 - height - INSET_MARGIN;
    InsetRect {
        x: x as i64,
        y: y as i64,
        width: width as u32,
        height: height as u32,
    }
}

#[derive(Debug, Clone, Copy)]
struct InsetSettings {
    scale: f64,
    alpha: f64,
}

struct PreviewShared {
    user_feed: VideoFeed,
    screen_feed: VideoFeed,
    settings: RwLock<InsetSettings>,
    surface_size: RwLock<(u32, u32)>,
    camera_dims: RwLock<(u32, u32)>,
    output_track: MediaTrack,
    frames_tx: watch::Sender<Option<Arc<VideoFrame>>>,
    events_tx: broadcast::Sender<PreviewEvent>,
    cancelled: AtomicBool,
    started: AtomicBool,
    started_at: Instant,
}

/// Live preview of both session streams, composited onto one surface
#[derive(Clone)]
pub struct SessionPreview {
    shared: Arc<PreviewShared>,
}

impl SessionPreview {
    /// Bind both streams' feeds to a new preview
    pub fn new(user: &LiveStream, screen: &LiveStream) -> Self {
        let (frames_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(PreviewShared {
                user_feed: user.feed().clone(),
                screen_feed: screen.feed().clone(),
                settings: RwLock::new(InsetSettings {
                    scale: DEFAULT_INSET_SCALE,
                    alpha: DEFAULT_INSET_ALPHA,
                }),
                surface_size: RwLock::new((0, 0)),
                camera_dims: RwLock::new((0, 0)),
                output_track: MediaTrack::new(TrackKind::Video),
                frames_tx,
                events_tx,
                cancelled: AtomicBool::new(false),
                started: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
        }
    }

    /// Start the draw loop
    ///
    /// The loop waits for both streams to report their intrinsic dimensions,
    /// sizes the surface to the screen stream, then reschedules itself off
    /// `clock` until `teardown`.
    pub fn initialize(&self, clock: Arc<dyn FrameClock>) {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = self.shared.clone();
        tokio::spawn(async move {
            let (sw, sh) = shared.screen_feed.wait_for_metadata().await;
            let (uw, uh) = shared.user_feed.wait_for_metadata().await;
            *shared.surface_size.write() = (sw, sh);
            *shared.camera_dims.write() = (uw, uh);
            tracing::debug!(
                "Preview initialized: screen {}x{}, camera {}x{}",
                sw,
                sh,
                uw,
                uh
            );

            let mut surface = DrawSurface::new(0, 0);
            while !shared.cancelled.load(Ordering::SeqCst) {
                draw(&shared, &mut surface);
                clock.tick().await;
            }
            tracing::debug!("Preview draw loop stopped");
        });
    }

    /// Set the inset scale; clamped to `[0.2, 2]`, visible on the next frame
    pub fn set_inset_scale(&self, value: f64) {
        let clamped = value.clamp(MIN_INSET_SCALE, MAX_INSET_SCALE);
        self.shared.settings.write().scale = clamped;
        let _ = self.shared.events_tx.send(PreviewEvent::ScaleChanged(clamped));
    }

    /// Set the inset alpha; clamped to `[0, 1]`, visible on the next frame
    pub fn set_inset_alpha(&self, value: f64) {
        let clamped = value.clamp(0.0, 1.0);
        self.shared.settings.write().alpha = clamped;
        let _ = self.shared.events_tx.send(PreviewEvent::AlphaChanged(clamped));
    }

    pub fn inset_scale(&self) -> f64 {
        self.shared.settings.read().scale
    }

    pub fn inset_alpha(&self) -> f64 {
        self.shared.settings.read().alpha
    }

    /// Resize the surface; the next drawn frame uses the new dimensions
    pub fn resize(&self, width: u32, height: u32) {
        *self.shared.surface_size.write() = (width, height);
    }

    /// Subscribe to model change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.shared.events_tx.subscribe()
    }

    /// A live stream view of the composited surface
    pub fn output_stream(&self) -> CompositeStream {
        CompositeStream::new(
            self.shared.output_track.clone(),
            self.shared.frames_tx.subscribe(),
        )
    }

    /// Stop the draw loop and quiesce the preview
    ///
    /// Safe to call at any point, including before a single frame was drawn.
    pub fn teardown(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
            && !self.shared.cancelled.load(Ordering::SeqCst)
    }
}

fn draw(shared: &PreviewShared, surface: &mut DrawSurface) {
    let (cw, ch) = *shared.surface_size.read();
    if cw == 0 || ch == 0 {
        return;
    }
    surface.resize(cw, ch);

    // Background: the screen stream full-surface, black until it plays
    match shared.screen_feed.latest() {
        Some(frame) => surface.blit_scaled(&frame, 0, 0, cw, ch, 1.0),
        None => surface.fill([0, 0, 0, 255]),
    }

    // Inset: the camera stream, or a placeholder block at the same spot
    let settings = *shared.settings.read();
    let (uw, uh) = *shared.camera_dims.read();
    let rect = inset_rect(cw, ch, uw, uh, settings.scale);
    match shared.user_feed.latest() {
        Some(frame) => surface.blit_scaled(
            &frame,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            settings.alpha,
        ),
        None => surface.fill_rect(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            CAMERA_PLACEHOLDER_RGBA,
            settings.alpha,
        ),
    }

    let timestamp_ms = shared.started_at.elapsed().as_secs_f64() * 1000.0;
    shared
        .frames_tx
        .send_replace(Some(Arc::new(surface.to_frame(timestamp_ms))));
}
