//! Cross-context control channel
//!
//! Wire messages, the persistent port transport, and the background-side
//! relay that drives source selection and stop requests.

pub mod background;
pub mod message;
pub mod port;

pub use background::{
    ActionOutcome, AllowAll, AuthDecision, AuthGate, BackgroundRelay, TabMessenger,
};
pub use message::{ControlMessage, TabId};
pub use port::{port_pair, ChannelError, Port, PortOpener};
