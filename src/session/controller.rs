//! Session controller
//!
//! Drives the recording-session lifecycle on a tab: acquire both streams,
//! run the composite preview, record its output, finalize the artifact. All
//! state mutation happens on message/event dispatch in one control flow; the
//! phase machine itself prevents reentrancy.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::registry::{SessionHandle, SessionRegistry};
use super::state::{SessionError, SessionEvent, SessionPhase, SessionResult};
use crate::capture::{
    CaptureSourceId, FrameClock, MediaDevices, StreamAcquirer, StreamPair,
};
use crate::channel::{ControlMessage, Port, PortOpener, TabId};
use crate::compositor::SessionPreview;
use crate::recorder::{Artifact, EncoderBackend, EncoderOptions, RecordingSink};

/// Orchestrates one tab's recording session
pub struct SessionController {
    tab: TabId,
    phase: SessionPhase,
    start_enabled: bool,
    acquirer: StreamAcquirer,
    opener: Arc<dyn PortOpener>,
    clock: Arc<dyn FrameClock>,
    port: Option<Arc<Port>>,
    streams: Option<StreamPair>,
    preview: Option<SessionPreview>,
    sink: RecordingSink,
    registry: Option<Arc<SessionRegistry>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        tab: TabId,
        devices: Arc<dyn MediaDevices>,
        opener: Arc<dyn PortOpener>,
        clock: Arc<dyn FrameClock>,
        encoder: Box<dyn EncoderBackend>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            tab,
            phase: SessionPhase::Idle,
            start_enabled: false,
            acquirer: StreamAcquirer::new(devices),
            opener,
            clock,
            port: None,
            streams: None,
            preview: None,
            sink: RecordingSink::new(encoder, EncoderOptions::default()),
            registry: None,
            events_tx,
        }
    }

    /// Let the controller deregister itself when the session ends
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn start_control_enabled(&self) -> bool {
        self.start_enabled
    }

    /// The composite preview, while one is running
    pub fn preview(&self) -> Option<&SessionPreview> {
        self.preview.as_ref()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// The connected persistent port, once `initialize` arrived
    pub fn port(&self) -> Option<Arc<Port>> {
        self.port.clone()
    }

    /// Dispatch one message from the control channel
    pub async fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Initialize => self.on_initialize(),
            ControlMessage::StreamSelection { stream_id, canceled } => {
                self.on_stream_selection(stream_id, canceled).await;
            }
            ControlMessage::StopRecording => {
                if let Err(err) = self.stop_recording().await {
                    tracing::error!("Stop failed: {}", err);
                }
            }
            other => {
                tracing::warn!("Unknown payload {:?}", other);
            }
        }
    }

    /// Pump a controller's persistent port until it closes
    ///
    /// Spawn this after `initialize` was delivered; a closed port simply
    /// ends the loop, which is how a vanished tab tears the session down.
    pub async fn run(handle: SessionHandle) {
        let port = { handle.lock().await.port() };
        let Some(port) = port else {
            tracing::warn!("Session run started without a connected port");
            return;
        };
        while let Some(message) = port.recv().await {
            handle.lock().await.handle_message(message).await;
        }
        tracing::debug!("Control port closed; session message loop ended");
    }

    /// The user hit the start control: ask the background for a capture
    /// source
    pub fn request_recording(&mut self) -> SessionResult<()> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::InvalidPhase {
                action: "request recording",
                phase: self.phase,
            });
        }
        let Some(port) = self.port.clone() else {
            tracing::warn!("Port does not exist; start request ignored");
            return Ok(());
        };

        self.set_start_enabled(false);
        if port.post(ControlMessage::InitRecording).is_err() {
            tracing::warn!("Port closed; start request dropped");
            self.set_start_enabled(true);
            return Ok(());
        }
        self.set_phase(SessionPhase::AwaitingSourceSelection);
        Ok(())
    }

    /// The user confirmed the preview: record camera audio plus the
    /// composited video as one synthesized stream
    pub async fn begin_recording(&mut self) -> SessionResult<()> {
        if self.phase != SessionPhase::Previewing {
            return Err(SessionError::InvalidPhase {
                action: "begin recording",
                phase: self.phase,
            });
        }
        let streams = self
            .streams
            .as_ref()
            .ok_or(SessionError::OutOfSync("previewing without streams"))?;
        let preview = self
            .preview
            .as_ref()
            .ok_or(SessionError::OutOfSync("previewing without a preview"))?;

        let mut composite = preview.output_stream();
        if let Some(audio) = streams.user.audio_track() {
            composite = composite.with_audio(audio.clone());
        }

        self.sink.start(composite).await?;
        self.set_phase(SessionPhase::Recording);
        Ok(())
    }

    /// The user dismissed the preview: release everything and restore the
    /// initial controls
    pub fn cancel_preview(&mut self) -> SessionResult<()> {
        if self.phase != SessionPhase::Previewing {
            return Err(SessionError::InvalidPhase {
                action: "cancel preview",
                phase: self.phase,
            });
        }
        self.teardown_preview();
        self.set_start_enabled(true);
        self.return_to_idle();
        tracing::info!("Preview cancelled on {}", self.tab);
        Ok(())
    }

    /// Stop the recorder, finalize the artifact, and end the session
    ///
    /// A stop with no active recording is a logged no-op.
    pub async fn stop_recording(&mut self) -> SessionResult<Option<Artifact>> {
        if self.phase != SessionPhase::Recording {
            tracing::warn!(
                "Stop request ignored: no active recording on {} (phase {:?})",
                self.tab,
                self.phase
            );
            return Ok(None);
        }

        self.set_phase(SessionPhase::Finalizing);
        let stopped = self.sink.stop().await;

        self.teardown_preview();
        self.set_start_enabled(true);
        self.return_to_idle();

        let artifact = stopped?;
        self.show_summary(&artifact);
        let _ = self.events_tx.send(SessionEvent::ArtifactReady(artifact.clone()));
        Ok(Some(artifact))
    }

    fn on_initialize(&mut self) {
        if self.port.is_some() {
            tracing::warn!("Already initialized on {}", self.tab);
            return;
        }
        self.port = Some(Arc::new(self.opener.connect()));
        self.set_start_enabled(true);
        tracing::info!("Session controls ready on {}", self.tab);
    }

    async fn on_stream_selection(&mut self, stream_id: Option<String>, canceled: Option<bool>) {
        if self.phase != SessionPhase::AwaitingSourceSelection {
            tracing::warn!(
                "Stale stream selection on {} (phase {:?})",
                self.tab,
                self.phase
            );
            return;
        }

        let source = match (stream_id, canceled) {
            (Some(id), _) if canceled != Some(true) => CaptureSourceId(id),
            _ => {
                tracing::info!("Source selection canceled on {}", self.tab);
                self.set_start_enabled(true);
                self.return_to_idle();
                return;
            }
        };

        match self.acquirer.acquire(&source).await {
            Ok(pair) => {
                let preview = SessionPreview::new(&pair.user, &pair.screen);
                preview.initialize(self.clock.clone());
                self.streams = Some(pair);
                self.preview = Some(preview);
                self.set_phase(SessionPhase::Previewing);
            }
            Err(err) => {
                tracing::error!("Media acquisition failed on {}: {}", self.tab, err);
                self.set_start_enabled(true);
                self.return_to_idle();
            }
        }
    }

    /// Placeholder for the post-session summary view
    fn show_summary(&self, artifact: &Artifact) {
        tracing::info!(
            "Session on {} produced artifact {} ({} bytes, {})",
            self.tab,
            artifact.id,
            artifact.len(),
            artifact.mime_type
        );
    }

    fn teardown_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.teardown();
        }
        if let Some(streams) = self.streams.take() {
            streams.release();
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            tracing::debug!("{}: {:?} -> {:?}", self.tab, self.phase, phase);
            self.phase = phase;
            let _ = self.events_tx.send(SessionEvent::PhaseChanged(phase));
        }
    }

    fn set_start_enabled(&mut self, enabled: bool) {
        if self.start_enabled != enabled {
            self.start_enabled = enabled;
            let _ = self.events_tx.send(SessionEvent::StartControl(enabled));
        }
    }

    fn return_to_idle(&mut self) {
        self.set_phase(SessionPhase::Idle);
        if let Some(registry) = &self.registry {
            registry.remove(self.tab);
        }
    }
}
