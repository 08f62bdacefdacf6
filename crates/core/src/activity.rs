//! Append-only log of user actions shown in the activity panel.

use chrono::Utc;
use serde::Serialize;

use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub at: Timestamp,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` stamped with the current UTC time.
    pub fn append(&mut self, message: impl Into<String>) -> &ActivityEntry {
        self.entries.push(ActivityEntry {
            at: Utc::now(),
            message: message.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ActivityEntry> {
        self.entries.last()
    }
}
