//! Session state types
//!
//! Defines the session lifecycle phases and the events a controller emits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recorder::Artifact;

/// Lifecycle phase of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// No session activity on the tab
    Idle,
    /// Waiting on the capture-source picker
    AwaitingSourceSelection,
    /// Both streams live, composite preview running
    Previewing,
    /// Recording the composite stream
    Recording,
    /// Stopping the recorder and producing the artifact
    Finalizing,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

/// Events emitted during a session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The lifecycle phase changed
    PhaseChanged(SessionPhase),
    /// The start control was enabled or disabled
    StartControl(bool),
    /// A finalized artifact is available
    ArtifactReady(Artifact),
}

/// Errors surfaced by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("Session state out of sync: {0}")]
    OutOfSync(&'static str),

    #[error("Acquisition error: {0}")]
    Acquire(#[from] crate::capture::AcquireError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] crate::recorder::RecorderError),

    #[error("Channel error: {0}")]
    Channel(#[from] crate::channel::ChannelError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
