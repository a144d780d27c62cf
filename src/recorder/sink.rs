//! Recording sink
//!
//! Wraps the host encoder: accumulates its chunks in arrival order and
//! finalizes them into a single artifact on stop.

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::encoder::{EncodedChunk, EncoderBackend, EncoderOptions, RecorderError, RecorderResult};
use crate::capture::CompositeStream;

/// The finalized recording produced at session end
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Artifact identifier
    pub id: Uuid,

    /// Container MIME type
    pub mime_type: String,

    /// Concatenated encoded bytes
    pub data: Vec<u8>,

    /// When the artifact was finalized
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the artifact bytes to disk
    pub fn write_to(&self, path: &Path) -> RecorderResult<()> {
        std::fs::write(path, &self.data)?;
        tracing::info!("Wrote artifact {} ({} bytes) to {:?}", self.id, self.len(), path);
        Ok(())
    }
}

/// Accumulates encoded chunks from a backend into one artifact
pub struct RecordingSink {
    backend: Box<dyn EncoderBackend>,
    options: EncoderOptions,
    chunks_rx: Option<mpsc::UnboundedReceiver<EncodedChunk>>,
}

impl RecordingSink {
    pub fn new(backend: Box<dyn EncoderBackend>, options: EncoderOptions) -> Self {
        Self {
            backend,
            options,
            chunks_rx: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.chunks_rx.is_some()
    }

    /// Begin encoding the composite stream
    pub async fn start(&mut self, stream: CompositeStream) -> RecorderResult<()> {
        if self.chunks_rx.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }
        let rx = self.backend.start(stream, &self.options).await?;
        self.chunks_rx = Some(rx);
        tracing::info!(
            "Recording started ({}, audio {} bps, video {} bps)",
            self.options.mime_type,
            self.options.audio_bits_per_second,
            self.options.video_bits_per_second
        );
        Ok(())
    }

    /// Stop the encoder and finalize the artifact
    ///
    /// Stop-then-finalize is one awaited operation: the backend is told to
    /// flush, then the chunk channel is drained to end-of-stream before the
    /// bytes are concatenated, so the final chunk is never dropped.
    pub async fn stop(&mut self) -> RecorderResult<Artifact> {
        let mut rx = self.chunks_rx.take().ok_or(RecorderError::NotRecording)?;
        self.backend.stop().await?;

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }

        let total: usize = chunks.iter().map(|c| c.data.len()).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in &chunks {
            data.extend_from_slice(&chunk.data);
        }

        tracing::info!("Recording stopped: {} chunks, {} bytes", chunks.len(), total);

        Ok(Artifact {
            id: Uuid::new_v4(),
            mime_type: self.options.mime_type.clone(),
            data,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{LiveStream, SourceKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Backend double scripted from the test body
    #[derive(Default)]
    struct ScriptedState {
        tx: Option<mpsc::UnboundedSender<EncodedChunk>>,
        flush_on_stop: Option<Vec<u8>>,
    }

    struct ScriptedEncoder {
        state: Arc<Mutex<ScriptedState>>,
    }

    #[async_trait]
    impl EncoderBackend for ScriptedEncoder {
        async fn start(
            &mut self,
            _stream: CompositeStream,
            _options: &EncoderOptions,
        ) -> RecorderResult<mpsc::UnboundedReceiver<EncodedChunk>> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.state.lock().tx = Some(tx);
            Ok(rx)
        }

        async fn stop(&mut self) -> RecorderResult<()> {
            let mut state = self.state.lock();
            let flush = state.flush_on_stop.take();
            if let (Some(tx), Some(data)) = (state.tx.as_ref(), flush) {
                let _ = tx.send(EncodedChunk::new(data));
            }
            // Dropping the sender closes the chunk channel
            state.tx = None;
            Ok(())
        }
    }

    fn composite_stream() -> CompositeStream {
        let user = LiveStream::new(SourceKind::CameraMic, true);
        let screen = LiveStream::new(SourceKind::Display, false);
        let preview = crate::compositor::SessionPreview::new(&user, &screen);
        preview.output_stream()
    }

    fn scripted_sink(flush_on_stop: Option<Vec<u8>>) -> (RecordingSink, Arc<Mutex<ScriptedState>>) {
        let state = Arc::new(Mutex::new(ScriptedState {
            tx: None,
            flush_on_stop,
        }));
        let sink = RecordingSink::new(
            Box::new(ScriptedEncoder {
                state: state.clone(),
            }),
            EncoderOptions::default(),
        );
        (sink, state)
    }

    #[tokio::test]
    async fn test_chunks_concatenated_in_order_including_final_flush() {
        let (mut sink, state) = scripted_sink(Some(vec![7, 8]));
        sink.start(composite_stream()).await.unwrap();

        {
            let state = state.lock();
            let tx = state.tx.as_ref().unwrap();
            tx.send(EncodedChunk::new(vec![1, 2])).unwrap();
            tx.send(EncodedChunk::new(vec![3])).unwrap();
            tx.send(EncodedChunk::new(vec![4, 5, 6])).unwrap();
        }

        let artifact = sink.stop().await.unwrap();
        assert_eq!(artifact.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(artifact.mime_type, "video/webm");
        assert!(!sink.is_recording());
    }

    #[tokio::test]
    async fn test_stop_without_start_fails_fast() {
        let (mut sink, _state) = scripted_sink(None);
        assert!(matches!(
            sink.stop().await.unwrap_err(),
            RecorderError::NotRecording
        ));
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (mut sink, _state) = scripted_sink(None);
        sink.start(composite_stream()).await.unwrap();
        assert!(matches!(
            sink.start(composite_stream()).await.unwrap_err(),
            RecorderError::AlreadyRecording
        ));
    }

    #[tokio::test]
    async fn test_artifact_write_to_disk() {
        let (mut sink, state) = scripted_sink(None);
        sink.start(composite_stream()).await.unwrap();
        state
            .lock()
            .tx
            .as_ref()
            .unwrap()
            .send(EncodedChunk::new(vec![42; 16]))
            .unwrap();

        let artifact = sink.stop().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.webm");
        artifact.write_to(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![42; 16]);
    }
}
