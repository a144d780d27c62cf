//! Per-tab session registry
//!
//! Process-wide supervisor mapping each tab to its session controller.
//! Entries are inserted when a session starts on a tab and removed when the
//! session finalizes or is cancelled; at most one session exists per tab.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::controller::SessionController;
use crate::channel::TabId;

/// Shared handle to a tab's controller
pub type SessionHandle = Arc<Mutex<SessionController>>;

/// Registry of active sessions, keyed by tab
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<TabId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for a tab
    pub fn insert(&self, tab: TabId, handle: SessionHandle) {
        let mut sessions = self.sessions.write();
        if sessions.insert(tab, handle).is_some() {
            tracing::warn!("Replacing existing session entry for {}", tab);
        } else {
            tracing::debug!("Registered session for {}", tab);
        }
    }

    pub fn get(&self, tab: TabId) -> Option<SessionHandle> {
        self.sessions.read().get(&tab).cloned()
    }

    pub fn contains(&self, tab: TabId) -> bool {
        self.sessions.read().contains_key(&tab)
    }

    /// Remove a tab's session entry
    pub fn remove(&self, tab: TabId) -> Option<SessionHandle> {
        let removed = self.sessions.write().remove(&tab);
        if removed.is_some() {
            tracing::debug!("Removed session entry for {}", tab);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
