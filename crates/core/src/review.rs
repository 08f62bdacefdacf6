//! Match metadata and the admin review workflow.
//!
//! Matches move through `Pending -> In-Progress -> Submitted` while being
//! annotated; a reviewer then validates a submission or sends it back to
//! `Pending`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub type MatchId = u64;

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    #[serde(rename = "In-Progress")]
    InProgress,
    Submitted,
    Validated,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Submitted,
        Self::Validated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In-Progress",
            Self::Submitted => "Submitted",
            Self::Validated => "Validated",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid match status '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }

    /// Whether a reviewer still has to look at a match in this status.
    pub fn awaits_review(&self) -> bool {
        !matches!(self, Self::Pending | Self::Validated)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MatchRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub title: String,
    pub status: MatchStatus,
}

/// Parse a JSON array of match records.
pub fn matches_from_json_str(json: &str) -> Result<Vec<MatchRecord>, CoreError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_matches(path: impl AsRef<Path>) -> Result<Vec<MatchRecord>, CoreError> {
    let raw = std::fs::read_to_string(path)?;
    matches_from_json_str(&raw)
}

pub fn find_match(matches: &[MatchRecord], id: MatchId) -> Result<&MatchRecord, CoreError> {
    matches
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| CoreError::NotFound {
            entity: "match",
            id: id.to_string(),
        })
}

/// Number of matches per status. Every status is present.
pub fn status_counts(matches: &[MatchRecord]) -> BTreeMap<MatchStatus, usize> {
    let mut counts: BTreeMap<MatchStatus, usize> =
        MatchStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for m in matches {
        *counts.entry(m.status).or_default() += 1;
    }
    counts
}

/// Matches with `status`, or all of them for `None`.
pub fn filter_by_status(matches: &[MatchRecord], status: Option<MatchStatus>) -> Vec<&MatchRecord> {
    matches
        .iter()
        .filter(|m| status.is_none_or(|s| m.status == s))
        .collect()
}

// ---------------------------------------------------------------------------
// ReviewQueue
// ---------------------------------------------------------------------------

/// Submissions awaiting a reviewer decision.
///
/// Decided items stay in the queue with their new status so the reviewer
/// sees the outcome; only validated items are final.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    items: Vec<MatchRecord>,
}

impl ReviewQueue {
    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        Self {
            items: matches
                .iter()
                .filter(|m| m.status.awaits_review())
                .cloned()
                .collect(),
        }
    }

    pub fn items(&self) -> &[MatchRecord] {
        &self.items
    }

    pub fn validate(&mut self, id: MatchId) -> Result<&MatchRecord, CoreError> {
        self.decide(id, MatchStatus::Validated)
    }

    pub fn reject(&mut self, id: MatchId) -> Result<&MatchRecord, CoreError> {
        self.decide(id, MatchStatus::Pending)
    }

    fn decide(&mut self, id: MatchId, status: MatchStatus) -> Result<&MatchRecord, CoreError> {
        let item = self
            .items
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "review item",
                id: id.to_string(),
            })?;
        if item.status == MatchStatus::Validated {
            return Err(CoreError::InvalidOperation(format!(
                "Match {id} is already validated"
            )));
        }
        item.status = status;
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
