//! Frame compositing
//!
//! The preview surface and the draw primitives it composes with.

pub mod preview;
pub mod surface;

pub use preview::{
    inset_rect, InsetRect, PreviewEvent, SessionPreview, DEFAULT_INSET_ALPHA, DEFAULT_INSET_SCALE,
    MAX_INSET_SCALE, MIN_INSET_SCALE,
};
pub use surface::DrawSurface;
