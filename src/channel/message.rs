//! Control message wire contract
//!
//! The only messages exchanged between the background and content contexts.

use serde::{Deserialize, Serialize};

/// Identifier of a browser tab hosting a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Wire messages, tagged by their `payload` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Sent once over the one-shot link after injection completes
    Initialize,

    /// Content asks the background to run the capture-source picker
    InitRecording,

    /// Picker outcome: a chosen source id, or cancellation
    #[serde(rename_all = "camelCase")]
    StreamSelection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canceled: Option<bool>,
    },

    /// Background asks the running session to stop and finalize
    StopRecording,
}

impl ControlMessage {
    /// A selection carrying the chosen source id
    pub fn selection(stream_id: impl Into<String>) -> Self {
        Self::StreamSelection {
            stream_id: Some(stream_id.into()),
            canceled: None,
        }
    }

    /// A selection the user dismissed
    pub fn selection_canceled() -> Self {
        Self::StreamSelection {
            stream_id: None,
            canceled: Some(true),
        }
    }
}
