//! Persistent port transport
//!
//! An ordered, bidirectional message link between the background and content
//! contexts. Messages arrive in send order; there is no redelivery or
//! acknowledgment, and a dropped peer simply closes the link.

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::message::ControlMessage;

/// Errors on the control channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Port is closed")]
    Closed,

    #[error("No port is connected")]
    Unavailable,

    #[error("Injection failed: {0}")]
    Injection(String),
}

/// One end of a persistent port
pub struct Port {
    tx: mpsc::UnboundedSender<ControlMessage>,
    rx: Mutex<mpsc::UnboundedReceiver<ControlMessage>>,
}

/// Create a connected pair of port ends
pub fn port_pair() -> (Port, Port) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        Port {
            tx: a_tx,
            rx: Mutex::new(b_rx),
        },
        Port {
            tx: b_tx,
            rx: Mutex::new(a_rx),
        },
    )
}

impl Port {
    /// Post a message to the peer
    pub fn post(&self, message: ControlMessage) -> Result<(), ChannelError> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }

    /// Receive the next message; `None` once the peer end is gone
    pub async fn recv(&self) -> Option<ControlMessage> {
        self.rx.lock().await.recv().await
    }
}

/// Content-side capability to open the persistent link back to the
/// background context
pub trait PortOpener: Send + Sync {
    fn connect(&self) -> Port;
}
