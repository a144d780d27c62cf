//! End-to-end session flows
//!
//! Wires a background relay and a content-side controller over real port
//! pairs, with test doubles standing in for the host capabilities.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use ux_recorder::capture::{
    AcquireResult, CameraConstraints, CaptureSourceId, CompositeStream, DisplayConstraints,
    IntervalClock, LiveStream, MediaDevices, SourceKind, SourcePicker, TabInjector, VideoFrame,
};
use ux_recorder::channel::{
    port_pair, ActionOutcome, AllowAll, BackgroundRelay, ChannelError, ControlMessage, Port,
    PortOpener, TabId, TabMessenger,
};
use ux_recorder::recorder::{EncodedChunk, EncoderBackend, EncoderOptions, RecorderResult};
use ux_recorder::session::{
    SessionController, SessionEvent, SessionHandle, SessionPhase, SessionRegistry,
};

struct FakeDevices {
    calls: AtomicUsize,
    streams: Mutex<Vec<LiveStream>>,
}

impl FakeDevices {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        })
    }

    fn all_stopped(&self) -> bool {
        self.streams.lock().iter().all(|s| !s.is_live())
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn acquire_camera(&self, constraints: &CameraConstraints) -> AcquireResult<LiveStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stream = LiveStream::new(SourceKind::CameraMic, constraints.audio);
        stream
            .feed()
            .push_frame(VideoFrame::solid(4, 3, [255, 255, 255, 255], 0.0));
        self.streams.lock().push(stream.clone());
        Ok(stream)
    }

    async fn acquire_display(
        &self,
        _constraints: &DisplayConstraints,
    ) -> AcquireResult<LiveStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stream = LiveStream::new(SourceKind::Display, false);
        stream
            .feed()
            .push_frame(VideoFrame::solid(32, 18, [0, 0, 255, 255], 0.0));
        self.streams.lock().push(stream.clone());
        Ok(stream)
    }

    fn supports_facing_mode(&self) -> bool {
        true
    }
}

struct FakePicker {
    selection: Option<String>,
}

#[async_trait]
impl SourcePicker for FakePicker {
    async fn choose_source(&self, _tab: TabId) -> Option<CaptureSourceId> {
        self.selection.clone().map(CaptureSourceId)
    }
}

/// Injection registers the tab's controller, the way script injection brings
/// the content context to life
struct RegisteringInjector {
    registry: Arc<SessionRegistry>,
    handle: Mutex<Option<SessionHandle>>,
}

#[async_trait]
impl TabInjector for RegisteringInjector {
    async fn inject(&self, tab: TabId) -> AcquireResult<()> {
        let handle = self.handle.lock().clone().expect("handle not wired");
        self.registry.insert(tab, handle);
        Ok(())
    }
}

/// One-shot delivery straight into the controller; spawns its message loop
/// once the session is initialized
struct DirectMessenger {
    handle: Mutex<Option<SessionHandle>>,
}

#[async_trait]
impl TabMessenger for DirectMessenger {
    async fn send(&self, _tab: TabId, message: ControlMessage) -> Result<(), ChannelError> {
        let handle = self.handle.lock().clone().expect("handle not wired");
        let spawn_run = message == ControlMessage::Initialize;
        handle.lock().await.handle_message(message).await;
        if spawn_run {
            tokio::spawn(SessionController::run(handle.clone()));
        }
        Ok(())
    }
}

/// Content-side connect: hands the background end to the relay
struct RelayOpener {
    relay: Mutex<Option<Arc<BackgroundRelay>>>,
    tab: TabId,
}

impl PortOpener for RelayOpener {
    fn connect(&self) -> Port {
        let (content, background) = port_pair();
        let relay = self.relay.lock().clone().expect("relay not wired");
        relay.on_connect(self.tab, background);
        content
    }
}

#[derive(Default)]
struct EncoderState {
    tx: Option<mpsc::UnboundedSender<EncodedChunk>>,
    track_counts: Option<(usize, usize)>,
    flush_on_stop: Option<Vec<u8>>,
}

struct ScriptedEncoder {
    state: Arc<Mutex<EncoderState>>,
}

#[async_trait]
impl EncoderBackend for ScriptedEncoder {
    async fn start(
        &mut self,
        stream: CompositeStream,
        _options: &EncoderOptions,
    ) -> RecorderResult<mpsc::UnboundedReceiver<EncodedChunk>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.track_counts = Some(stream.track_counts());
        state.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        let mut state = self.state.lock();
        let flush = state.flush_on_stop.take();
        if let (Some(tx), Some(data)) = (state.tx.as_ref(), flush) {
            let _ = tx.send(EncodedChunk::new(data));
        }
        state.tx = None;
        Ok(())
    }
}

struct Harness {
    tab: TabId,
    relay: Arc<BackgroundRelay>,
    registry: Arc<SessionRegistry>,
    devices: Arc<FakeDevices>,
    encoder_state: Arc<Mutex<EncoderState>>,
    handle: SessionHandle,
}

fn build_harness(selection: Option<&str>) -> Harness {
    let tab = TabId(7);
    let registry = Arc::new(SessionRegistry::new());
    let devices = FakeDevices::new();
    let encoder_state = Arc::new(Mutex::new(EncoderState::default()));

    let injector = Arc::new(RegisteringInjector {
        registry: registry.clone(),
        handle: Mutex::new(None),
    });
    let messenger = Arc::new(DirectMessenger {
        handle: Mutex::new(None),
    });
    let opener = Arc::new(RelayOpener {
        relay: Mutex::new(None),
        tab,
    });

    let relay = Arc::new(BackgroundRelay::new(
        registry.clone(),
        Arc::new(AllowAll),
        injector.clone(),
        messenger.clone(),
        Arc::new(FakePicker {
            selection: selection.map(str::to_string),
        }),
    ));
    *opener.relay.lock() = Some(relay.clone());

    let controller = SessionController::new(
        tab,
        devices.clone(),
        opener,
        Arc::new(IntervalClock::with_fps(240)),
        Box::new(ScriptedEncoder {
            state: encoder_state.clone(),
        }),
    )
    .with_registry(registry.clone());
    let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(controller));

    *injector.handle.lock() = Some(handle.clone());
    *messenger.handle.lock() = Some(handle.clone());

    Harness {
        tab,
        relay,
        registry,
        devices,
        encoder_state,
        handle,
    }
}

async fn wait_until<F>(handle: &SessionHandle, what: &str, predicate: F)
where
    F: Fn(&SessionController) -> bool,
{
    let deadline = async {
        loop {
            if predicate(&*handle.lock().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), deadline)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test(flavor = "multi_thread")]
async fn full_session_records_every_chunk_and_returns_to_idle() {
    let harness = build_harness(Some("abc"));

    let outcome = harness.relay.handle_action(harness.tab).await.unwrap();
    assert_eq!(outcome, ActionOutcome::SessionStarted);
    assert!(harness.registry.contains(harness.tab));

    {
        let mut controller = harness.handle.lock().await;
        assert!(controller.start_control_enabled());
        controller.request_recording().unwrap();
    }

    wait_until(&harness.handle, "preview", |c| {
        c.phase() == SessionPhase::Previewing
    })
    .await;
    assert_eq!(harness.devices.calls.load(Ordering::SeqCst), 2);

    harness.handle.lock().await.begin_recording().await.unwrap();

    // The synthesized stream carries exactly one audio and one video track
    assert_eq!(harness.encoder_state.lock().track_counts, Some((1, 1)));

    {
        let state = harness.encoder_state.lock();
        let tx = state.tx.as_ref().unwrap();
        tx.send(EncodedChunk::new(vec![1, 2])).unwrap();
        tx.send(EncodedChunk::new(vec![3])).unwrap();
    }
    harness.encoder_state.lock().flush_on_stop = Some(vec![4]);

    let mut events = harness.handle.lock().await.subscribe();

    // Re-invoking the action while recording routes to stop
    let outcome = harness.relay.handle_action(harness.tab).await.unwrap();
    assert_eq!(outcome, ActionOutcome::StopRouted);

    let artifact = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::ArtifactReady(artifact)) => return artifact,
                Ok(_) => continue,
                Err(err) => panic!("event channel closed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for the artifact");

    assert_eq!(artifact.data, vec![1, 2, 3, 4]);
    assert_eq!(artifact.mime_type, "video/webm");

    wait_until(&harness.handle, "idle", |c| {
        c.phase() == SessionPhase::Idle && c.start_control_enabled()
    })
    .await;
    assert!(!harness.registry.contains(harness.tab));
    assert!(harness.devices.all_stopped());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_selection_acquires_nothing_and_reenables_start() {
    let harness = build_harness(None);

    let outcome = harness.relay.handle_action(harness.tab).await.unwrap();
    assert_eq!(outcome, ActionOutcome::SessionStarted);

    harness.handle.lock().await.request_recording().unwrap();

    wait_until(&harness.handle, "idle after cancel", |c| {
        c.phase() == SessionPhase::Idle && c.start_control_enabled()
    })
    .await;

    assert_eq!(harness.devices.calls.load(Ordering::SeqCst), 0);
    assert!(!harness.registry.contains(harness.tab));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_preview_releases_both_streams() {
    let harness = build_harness(Some("abc"));

    harness.relay.handle_action(harness.tab).await.unwrap();
    harness.handle.lock().await.request_recording().unwrap();
    wait_until(&harness.handle, "preview", |c| {
        c.phase() == SessionPhase::Previewing
    })
    .await;

    harness.handle.lock().await.cancel_preview().unwrap();

    assert!(harness.devices.all_stopped());
    assert!(!harness.registry.contains(harness.tab));
    let controller = harness.handle.lock().await;
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(controller.start_control_enabled());
}
