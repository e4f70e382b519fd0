//! Conversation history
//!
//! Sessions are keyed by caller-chosen ids and hold serialized final
//! states. The pipeline writes history but never reads it to decide
//! anything.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// When the turn was recorded
    pub recorded_at: DateTime<Utc>,
    /// Final state of the turn as a plain map
    pub state: Value,
}

impl SessionEntry {
    /// Stamp a serialized state with the current time
    #[must_use]
    pub fn now(state: Value) -> Self {
        Self {
            recorded_at: Utc::now(),
            state,
        }
    }
}

/// Session persistence seam
pub trait SessionStore: Send + Sync {
    /// Append a turn to a session, creating it if needed
    fn append(&self, session_id: &str, entry: SessionEntry);

    /// Turns of a session in insertion order; empty if unknown
    fn history(&self, session_id: &str) -> Vec<SessionEntry>;

    /// Drop a session
    fn clear(&self, session_id: &str);
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Vec<SessionEntry>>,
}

impl InMemorySessionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn append(&self, session_id: &str, entry: SessionEntry) {
        self.sessions.entry(session_id.to_string()).or_default().push(entry);
    }

    fn history(&self, session_id: &str) -> Vec<SessionEntry> {
        self.sessions
            .get(session_id)
            .map(|turns| turns.value().clone())
            .unwrap_or_default()
    }

    fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}
