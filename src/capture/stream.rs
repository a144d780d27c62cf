//! Live stream model
//!
//! Streams are handles to running host media sources. The host pushes decoded
//! frames into a stream's feed; the compositor only ever reads the latest one.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// A single decoded video frame (RGBA)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Raw pixel data (RGBA format)
    pub data: Vec<u8>,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Timestamp in milliseconds (process time)
    pub timestamp_ms: f64,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp_ms: f64) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            data,
            width,
            height,
            timestamp_ms,
        }
    }

    /// A frame filled with a single RGBA color
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], timestamp_ms: f64) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self::new(width, height, data, timestamp_ms)
    }
}

struct FeedShared {
    latest: RwLock<Option<Arc<VideoFrame>>>,
    dims_tx: watch::Sender<Option<(u32, u32)>>,
}

/// Latest-frame cell shared between a host producer and the compositor
///
/// Intrinsic dimensions become known with the first pushed frame, the
/// metadata-loaded moment of the underlying source.
#[derive(Clone)]
pub struct VideoFeed {
    shared: Arc<FeedShared>,
}

impl VideoFeed {
    pub fn new() -> Self {
        let (dims_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(FeedShared {
                latest: RwLock::new(None),
                dims_tx,
            }),
        }
    }

    /// Declare intrinsic dimensions before any frame arrives
    ///
    /// The metadata-loaded analogue: playback elements know their size before
    /// the first frame is decoded.
    pub fn announce_dimensions(&self, width: u32, height: u32) {
        self.shared.dims_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some((width, height));
                true
            } else {
                false
            }
        });
    }

    /// Publish a frame; replaces whatever was current
    pub fn push_frame(&self, frame: VideoFrame) {
        let dims = (frame.width, frame.height);
        *self.shared.latest.write() = Some(Arc::new(frame));
        self.announce_dimensions(dims.0, dims.1);
    }

    /// The most recently pushed frame, if any
    pub fn latest(&self) -> Option<Arc<VideoFrame>> {
        self.shared.latest.read().clone()
    }

    /// Intrinsic dimensions, once the source has produced a frame
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        *self.shared.dims_tx.borrow()
    }

    /// Whether the source has started producing frames
    pub fn is_playing(&self) -> bool {
        self.shared.latest.read().is_some()
    }

    /// Suspend until the source reports its intrinsic dimensions
    pub async fn wait_for_metadata(&self) -> (u32, u32) {
        let mut rx = self.shared.dims_tx.subscribe();
        loop {
            if let Some(dims) = *rx.borrow_and_update() {
                return dims;
            }
            // The sender lives inside this feed, so the channel stays open
            // for as long as `self` does.
            let _ = rx.changed().await;
        }
    }
}

impl Default for VideoFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Kinds of media tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// A single audio or video track within a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: Uuid,
    pub kind: TrackKind,
}

impl MediaTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }
}

/// What a live stream was acquired from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Camera plus microphone
    CameraMic,
    /// Screen, window, or tab capture
    Display,
}

/// Handle to a running host media source
///
/// Stopping is idempotent; a stopped stream keeps its track list but its feed
/// goes quiet.
#[derive(Clone)]
pub struct LiveStream {
    id: Uuid,
    kind: SourceKind,
    tracks: Vec<MediaTrack>,
    feed: VideoFeed,
    live: Arc<AtomicBool>,
}

impl LiveStream {
    /// Create a stream handle with one video track and, optionally, one
    /// audio track. Hosts construct these when resolving an acquisition.
    pub fn new(kind: SourceKind, with_audio: bool) -> Self {
        let mut tracks = vec![MediaTrack::new(TrackKind::Video)];
        if with_audio {
            tracks.push(MediaTrack::new(TrackKind::Audio));
        }
        Self {
            id: Uuid::new_v4(),
            kind,
            tracks,
            feed: VideoFeed::new(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn feed(&self) -> &VideoFeed {
        &self.feed
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// First audio track, if the stream carries audio
    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Audio)
    }

    /// First video track
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    /// Stop every track of this stream
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            tracing::debug!("Stopped {:?} stream {}", self.kind, self.id);
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// The two streams of a preview session
pub struct StreamPair {
    /// Camera + microphone stream
    pub user: LiveStream,

    /// Display capture stream
    pub screen: LiveStream,
}

impl std::fmt::Debug for StreamPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPair")
            .field("user", &self.user.kind())
            .field("screen", &self.screen.kind())
            .finish()
    }
}

impl StreamPair {
    /// Stop both streams. Neither stop is skipped, whatever state the other
    /// stream is in.
    pub fn release(&self) {
        self.user.stop();
        self.screen.stop();
    }
}

/// The synthesized recording input: the compositor's video track plus the
/// camera's audio track, with a tap on the composited frames
#[derive(Clone)]
pub struct CompositeStream {
    video: MediaTrack,
    audio: Option<MediaTrack>,
    frames: watch::Receiver<Option<Arc<VideoFrame>>>,
}

impl CompositeStream {
    pub fn new(video: MediaTrack, frames: watch::Receiver<Option<Arc<VideoFrame>>>) -> Self {
        Self {
            video,
            audio: None,
            frames,
        }
    }

    pub fn with_audio(mut self, track: MediaTrack) -> Self {
        self.audio = Some(track);
        self
    }

    pub fn video_track(&self) -> &MediaTrack {
        &self.video
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.audio.as_ref()
    }

    /// Number of (audio, video) tracks
    pub fn track_counts(&self) -> (usize, usize) {
        (usize::from(self.audio.is_some()), 1)
    }

    /// Latest-state view of the composited frames
    pub fn frames(&self) -> watch::Receiver<Option<Arc<VideoFrame>>> {
        self.frames.clone()
    }
}
