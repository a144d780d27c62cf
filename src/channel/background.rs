//! Background context relay
//!
//! The extension's background half of the control channel: reacts to the
//! action trigger, runs the capture-source picker, and relays stop requests
//! to the tab's running session.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::message::{ControlMessage, TabId};
use super::port::{ChannelError, Port};
use crate::capture::{SourcePicker, TabInjector};
use crate::session::SessionRegistry;

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied { sign_in_url: Option<String> },
}

/// Authorization strategy consulted before a session may start
///
/// `authorize` is awaited, so an implementation backed by an asynchronous
/// auth listener resolves its first state before the relay gates on it.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn authorize(&self) -> AuthDecision;
}

/// Gate that lets every session through
pub struct AllowAll;

#[async_trait]
impl AuthGate for AllowAll {
    async fn authorize(&self) -> AuthDecision {
        AuthDecision::Allowed
    }
}

/// One-shot message delivery into a tab's content context
#[async_trait]
pub trait TabMessenger: Send + Sync {
    async fn send(&self, tab: TabId, message: ControlMessage) -> Result<(), ChannelError>;
}

/// What the relay did with an action trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A new session was injected and initialized
    SessionStarted,
    /// A session was already active; a stop request was relayed
    StopRouted,
    /// The auth gate refused; no session was started
    AuthDenied { sign_in_url: Option<String> },
}

/// Background-side control relay, one per extension process
pub struct BackgroundRelay {
    registry: Arc<SessionRegistry>,
    auth: Arc<dyn AuthGate>,
    injector: Arc<dyn TabInjector>,
    messenger: Arc<dyn TabMessenger>,
    picker: Arc<dyn SourcePicker>,
    ports: RwLock<HashMap<TabId, Arc<Port>>>,
}

impl BackgroundRelay {
    pub fn new(
        registry: Arc<SessionRegistry>,
        auth: Arc<dyn AuthGate>,
        injector: Arc<dyn TabInjector>,
        messenger: Arc<dyn TabMessenger>,
        picker: Arc<dyn SourcePicker>,
    ) -> Self {
        Self {
            registry,
            auth,
            injector,
            messenger,
            picker,
            ports: RwLock::new(HashMap::new()),
        }
    }

    /// The extension action: starts a session on the tab, or relays a stop
    /// when one is already active
    pub async fn handle_action(&self, tab: TabId) -> Result<ActionOutcome, ChannelError> {
        if self.registry.contains(tab) {
            tracing::info!("Session already running on {}; routing action to stop", tab);
            self.request_stop(tab);
            return Ok(ActionOutcome::StopRouted);
        }

        match self.auth.authorize().await {
            AuthDecision::Denied { sign_in_url } => {
                tracing::warn!("Session start on {} refused by auth gate", tab);
                return Ok(ActionOutcome::AuthDenied { sign_in_url });
            }
            AuthDecision::Allowed => {}
        }

        self.injector
            .inject(tab)
            .await
            .map_err(|err| ChannelError::Injection(err.to_string()))?;
        self.messenger.send(tab, ControlMessage::Initialize).await?;

        tracing::info!("Session initialized on {}", tab);
        Ok(ActionOutcome::SessionStarted)
    }

    /// Content opened its persistent port; store our end and pump it
    pub fn on_connect(self: &Arc<Self>, tab: TabId, port: Port) {
        let port = Arc::new(port);
        self.ports.write().insert(tab, port.clone());

        let relay = self.clone();
        tokio::spawn(async move {
            while let Some(message) = port.recv().await {
                relay.handle_port_message(tab, message).await;
            }
            // Tab closed or peer dropped: the link just ends
            tracing::debug!("Persistent port for {} closed", tab);
            relay.ports.write().remove(&tab);
        });
    }

    /// Dispatch one message from a tab's persistent port
    pub async fn handle_port_message(&self, tab: TabId, message: ControlMessage) {
        match message {
            ControlMessage::InitRecording => self.choose_stream(tab).await,
            other => {
                tracing::warn!("Unexpected payload from {}: {:?}", tab, other);
            }
        }
    }

    /// Run the picker and relay its outcome to the tab
    async fn choose_stream(&self, tab: TabId) {
        let selection = match self.picker.choose_source(tab).await {
            Some(source) => {
                tracing::debug!("Source {} chosen for {}", source.as_str(), tab);
                ControlMessage::selection(source.0)
            }
            None => {
                tracing::info!("Source selection for {} canceled", tab);
                ControlMessage::selection_canceled()
            }
        };
        self.post_to(tab, selection);
    }

    /// Relay a stop request to the tab's session
    fn request_stop(&self, tab: TabId) {
        self.post_to(tab, ControlMessage::StopRecording);
    }

    fn post_to(&self, tab: TabId, message: ControlMessage) {
        let port = self.ports.read().get(&tab).cloned();
        match port {
            Some(port) => {
                if port.post(message).is_err() {
                    tracing::warn!("Port for {} is closed; message dropped", tab);
                }
            }
            None => {
                tracing::warn!("No port for {}; message dropped", tab);
            }
        }
    }
}
