//! Track mutation engine: merge, split and delete over a frame sequence.
//!
//! Every operation reads the current [`FrameSequence`] and, on success,
//! returns a brand-new one inside a [`MutationOutcome`]. The input is never
//! modified, so an operation either fully applies or leaves nothing behind.
//!
//! Fresh identifiers come from an [`IdAllocator`] owned by the caller:
//!
//! - merge results take the next integer id (seeded one past the largest
//!   numeric id in the original data);
//! - split results take `{id}_a` / `{id}_b`, then `{id}_a2` / `{id}_b2`, ...
//!   for later splits of the same origin.
//!
//! Minted ids are always checked against the sequence they are minted for,
//! so a new id never collides with one already in use.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::frame::{Frame, FrameSequence};
use crate::types::{FrameIndex, TrackId};

// ---------------------------------------------------------------------------
// IdAllocator
// ---------------------------------------------------------------------------

/// Source of fresh track ids for one editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next_id: u64,
    split_counts: HashMap<TrackId, u32>,
}

impl IdAllocator {
    /// Start counting at `next_id`.
    pub fn with_next_id(next_id: u64) -> Self {
        Self {
            next_id,
            split_counts: HashMap::new(),
        }
    }

    /// Seed one past the largest numeric-looking id in `frames`, or 1 when
    /// there is none.
    pub fn seeded_from(frames: &FrameSequence) -> Self {
        let max = frames
            .iter()
            .flat_map(|f| f.detections.iter())
            .filter_map(|d| d.track_id.as_number())
            .max();
        Self::with_next_id(max.map_or(1, |m| m.saturating_add(1)))
    }

    /// The integer the next merge will try first.
    pub fn peek_next_id(&self) -> u64 {
        self.next_id
    }

    /// How many times `origin` has been split so far.
    pub fn split_count(&self, origin: &TrackId) -> u32 {
        self.split_counts.get(origin).copied().unwrap_or(0)
    }

    fn mint_merge_id(&mut self, frames: &FrameSequence) -> TrackId {
        loop {
            let candidate = TrackId::from(self.next_id);
            self.next_id = self.next_id.saturating_add(1);
            if !frames.contains_track(&candidate) {
                return candidate;
            }
        }
    }

    fn mint_split_ids(&mut self, origin: &TrackId, frames: &FrameSequence) -> (TrackId, TrackId) {
        let mut n = self.split_count(origin) + 1;
        loop {
            let suffix = if n == 1 { String::new() } else { n.to_string() };
            let before = origin.with_suffix(&format!("_a{suffix}"));
            let after = origin.with_suffix(&format!("_b{suffix}"));
            if !frames.contains_track(&before) && !frames.contains_track(&after) {
                self.split_counts.insert(origin.clone(), n);
                return (before, after);
            }
            n += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What a successful mutation did, in terms of track ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    Merge {
        sources: Vec<TrackId>,
        merged: TrackId,
    },
    Split {
        origin: TrackId,
        before: TrackId,
        after: TrackId,
    },
    Delete {
        removed: TrackId,
    },
}

impl MutationKind {
    /// Ids that no longer exist after the mutation.
    pub fn retired_ids(&self) -> Vec<&TrackId> {
        match self {
            Self::Merge { sources, .. } => sources.iter().collect(),
            Self::Split { origin, .. } => vec![origin],
            Self::Delete { removed } => vec![removed],
        }
    }
}

/// Renders the activity-log line for the mutation.
impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge { sources, merged } => {
                let joined = sources
                    .iter()
                    .map(TrackId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Merge [{joined}] → {merged}")
            }
            Self::Split {
                origin,
                before,
                after,
            } => write!(f, "Split {origin} → {before}, {after}"),
            Self::Delete { removed } => write!(f, "Delete {removed}"),
        }
    }
}

/// The replacement sequence plus a description of the change.
///
/// `created` holds the ids the mutation minted: the merged id for a merge,
/// the `(before, after)` pair for a split, nothing for a delete.
#[derive(Debug, Clone)]
pub struct MutationOutcome<T = ()> {
    pub frames: FrameSequence,
    pub kind: MutationKind,
    pub created: T,
}

impl<T> MutationOutcome<T> {
    pub fn activity_message(&self) -> String {
        self.kind.to_string()
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Collapse the tracks in `ids` into one new track.
///
/// In each frame where any of `ids` appears, all of their detections are
/// removed; if `base` was among them, one detection carrying the base
/// track's box and class is re-added under the new id. Frames where `base`
/// is absent lose the other members' detections without replacement.
///
/// Rejected with [`CoreError::InvalidOperation`] when fewer than two distinct
/// ids are given or `base` is not one of them.
pub fn merge_tracks(
    frames: &FrameSequence,
    ids: &[TrackId],
    base: &TrackId,
    allocator: &mut IdAllocator,
) -> Result<MutationOutcome<TrackId>, CoreError> {
    let mut seen: HashSet<&TrackId> = HashSet::with_capacity(ids.len());
    let sources: Vec<TrackId> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();

    if sources.len() < 2 {
        return Err(CoreError::InvalidOperation(format!(
            "merge needs at least 2 distinct tracks, got {}",
            sources.len()
        )));
    }
    if !seen.contains(base) {
        return Err(CoreError::InvalidOperation(format!(
            "merge base '{base}' is not one of the merged tracks"
        )));
    }

    let merged = allocator.mint_merge_id(frames);

    let next = frames
        .iter()
        .map(|frame| {
            if !frame.detections.iter().any(|d| seen.contains(&d.track_id)) {
                return frame.clone();
            }
            let survivor = frame.detection(base).map(|d| d.relabelled(merged.clone()));
            let mut detections: Vec<_> = frame
                .detections
                .iter()
                .filter(|d| !seen.contains(&d.track_id))
                .cloned()
                .collect();
            detections.extend(survivor);
            Frame::new(frame.timestamp, detections)
        })
        .collect();

    Ok(MutationOutcome {
        frames: FrameSequence::from_validated(next),
        kind: MutationKind::Merge {
            sources,
            merged: merged.clone(),
        },
        created: merged,
    })
}

/// Divide `id` into two tracks at frame `at`.
///
/// Detections before `at` move to the first new id, the rest to the second.
/// Returns `None`, touching nothing, when `id` appears in no frame.
pub fn split_track(
    frames: &FrameSequence,
    id: &TrackId,
    at: FrameIndex,
    allocator: &mut IdAllocator,
) -> Option<MutationOutcome<(TrackId, TrackId)>> {
    if !frames.contains_track(id) {
        return None;
    }

    let (before, after) = allocator.mint_split_ids(id, frames);

    let next = frames
        .iter()
        .enumerate()
        .map(|(idx, frame)| {
            let target = if idx < at { &before } else { &after };
            let detections = frame
                .detections
                .iter()
                .map(|d| {
                    if &d.track_id == id {
                        d.relabelled(target.clone())
                    } else {
                        d.clone()
                    }
                })
                .collect();
            Frame::new(frame.timestamp, detections)
        })
        .collect();

    Some(MutationOutcome {
        frames: FrameSequence::from_validated(next),
        kind: MutationKind::Split {
            origin: id.clone(),
            before: before.clone(),
            after: after.clone(),
        },
        created: (before, after),
    })
}

/// Remove every detection of `id`.
///
/// Returns `None` when `id` appears in no frame.
pub fn delete_track(frames: &FrameSequence, id: &TrackId) -> Option<MutationOutcome> {
    if !frames.contains_track(id) {
        return None;
    }

    let next = frames
        .iter()
        .map(|frame| {
            let detections = frame
                .detections
                .iter()
                .filter(|d| &d.track_id != id)
                .cloned()
                .collect();
            Frame::new(frame.timestamp, detections)
        })
        .collect();

    Some(MutationOutcome {
        frames: FrameSequence::from_validated(next),
        kind: MutationKind::Delete { removed: id.clone() },
        created: (),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
