//! Recording-session lifecycle
//!
//! The per-tab controller state machine, the session state types, and the
//! process-wide registry supervising active sessions.

pub mod controller;
pub mod registry;
pub mod state;

pub use controller::SessionController;
pub use registry::{SessionHandle, SessionRegistry};
pub use state::{SessionError, SessionEvent, SessionPhase, SessionResult};
