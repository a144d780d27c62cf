//! Recording system module
//!
//! The encoder-backend trait over the host's recorder and the sink that
//! turns its chunk sequence into a finalized artifact.

pub mod encoder;
pub mod sink;

pub use encoder::{EncodedChunk, EncoderBackend, EncoderOptions, RecorderError, RecorderResult};
pub use sink::{Artifact, RecordingSink};
