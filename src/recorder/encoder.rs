//! Encoder backend trait
//!
//! Defines the interface to the host's stream-to-encoded-chunks recorder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::CompositeStream;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for recording operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Encoder configuration handed to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderOptions {
    /// Audio bitrate in bits per second
    pub audio_bits_per_second: u32,

    /// Video bitrate in bits per second
    pub video_bits_per_second: u32,

    /// Container MIME type of the encoded output
    pub mime_type: String,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            audio_bits_per_second: 128_000,
            video_bits_per_second: 2_500_000,
            mime_type: "video/webm".to_string(),
        }
    }
}

/// One encoded block emitted by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Encoded bytes
    pub data: Vec<u8>,
}

impl EncodedChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Trait for the host's media encoder
///
/// `start` hands the backend a composite stream and yields the channel its
/// chunks arrive on, in encoding order. `stop` must flush whatever the
/// encoder still buffers and then close the channel by dropping its sender;
/// the sink relies on end-of-stream to know the last chunk has landed.
#[async_trait]
pub trait EncoderBackend: Send + Sync {
    async fn start(
        &mut self,
        stream: CompositeStream,
        options: &EncoderOptions,
    ) -> RecorderResult<mpsc::UnboundedReceiver<EncodedChunk>>;

    async fn stop(&mut self) -> RecorderResult<()>;
}
