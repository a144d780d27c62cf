//! Media capture model and host capability surface
//!
//! The host's acquisition, picker, injection, and scheduling capabilities are
//! traits; this module owns the stream model built on top of them.

pub mod acquirer;
pub mod stream;
pub mod traits;

pub use acquirer::StreamAcquirer;
pub use stream::{
    CompositeStream, LiveStream, MediaTrack, SourceKind, StreamPair, TrackKind, VideoFeed,
    VideoFrame,
};
pub use traits::{
    AcquireError, AcquireResult, CameraConstraints, CaptureSourceId, DisplayConstraints,
    FrameClock, IntervalClock, MediaDevices, SourcePicker, TabInjector,
};
