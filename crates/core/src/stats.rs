//! Track statistics derived from a frame sequence.
//!
//! Statistics are always recomputed from scratch for the current sequence;
//! nothing here is patched incrementally.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frame::FrameSequence;
use crate::types::{FrameIndex, FrameRate, TrackClass, TrackId};

/// Per-track summary of one frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStats {
    /// Class at first appearance.
    pub class: TrackClass,
    /// Number of frames containing the track.
    pub occurrence_count: usize,
    /// Smallest frame index containing the track.
    pub start_frame_index: FrameIndex,
    /// Timestamp of `start_frame_index`.
    pub start_time: f64,
    /// `occurrence_count / fps`.
    pub duration_secs: f64,
}

impl TrackStats {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_secs
    }
}

/// Statistics keyed by track id, iterated in natural id order.
pub type TrackStatsMap = BTreeMap<TrackId, TrackStats>;

/// Compute one [`TrackStats`] per distinct track id in `frames`.
pub fn compute_track_stats(frames: &FrameSequence, fps: FrameRate) -> TrackStatsMap {
    let mut stats = TrackStatsMap::new();

    for (idx, frame) in frames.iter().enumerate() {
        for detection in &frame.detections {
            let entry = stats
                .entry(detection.track_id.clone())
                .or_insert_with(|| TrackStats {
                    class: detection.class,
                    occurrence_count: 0,
                    start_frame_index: idx,
                    start_time: frame.timestamp,
                    duration_secs: 0.0,
                });
            entry.occurrence_count += 1;
            // Holds for any visiting order, not just ascending indices.
            if idx < entry.start_frame_index {
                entry.start_frame_index = idx;
                entry.start_time = frame.timestamp;
                entry.class = detection.class;
            }
        }
    }

    for s in stats.values_mut() {
        s.duration_secs = fps.seconds_for(s.occurrence_count);
    }

    stats
}

/// Number of tracks per class. Every class is present, zero when unused.
pub fn class_counts(stats: &TrackStatsMap) -> BTreeMap<TrackClass, usize> {
    let mut counts: BTreeMap<TrackClass, usize> =
        TrackClass::ALL.iter().map(|c| (*c, 0)).collect();
    for s in stats.values() {
        *counts.entry(s.class).or_default() += 1;
    }
    counts
}

/// Index of the first frame containing `id`.
pub fn first_appearance(frames: &FrameSequence, id: &TrackId) -> Option<FrameIndex> {
    frames.iter().position(|f| f.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{BBox, Detection, Frame};

    fn det(id: &str, class: TrackClass) -> Detection {
        Detection {
            track_id: TrackId::from(id),
            class,
            bbox: BBox::new(0.0, 0.0, 5.0, 5.0),
        }
    }

    fn fps(v: f64) -> FrameRate {
        FrameRate::new(v).unwrap()
    }

    /// Frames 0..=2 at [0, 0.5, 1.0]: "1" in 0 and 1, "2" in 0 and 2.
    fn scenario() -> FrameSequence {
        FrameSequence::new(vec![
            Frame::new(
                0.0,
                vec![det("1", TrackClass::TeamA), det("2", TrackClass::TeamB)],
            ),
            Frame::new(0.5, vec![det("1", TrackClass::TeamA)]),
            Frame::new(1.0, vec![det("2", TrackClass::TeamB)]),
        ])
        .unwrap()
    }

    #[test]
    fn empty_sequence_yields_empty_map() {
        assert!(compute_track_stats(&FrameSequence::default(), fps(6.0)).is_empty());
    }

    #[test]
    fn one_entry_per_distinct_id() {
        let stats = compute_track_stats(&scenario(), fps(6.0));
        assert_eq!(stats.len(), 2);

        let one = &stats[&TrackId::from("1")];
        assert_eq!(one.class, TrackClass::TeamA);
        assert_eq!(one.occurrence_count, 2);
        assert_eq!(one.start_frame_index, 0);
        assert_eq!(one.start_time, 0.0);

        let two = &stats[&TrackId::from("2")];
        assert_eq!(two.occurrence_count, 2);
        assert_eq!(two.start_frame_index, 0);
    }

    #[test]
    fn duration_is_count_over_fps() {
        let stats = compute_track_stats(&scenario(), fps(4.0));
        let one = &stats[&TrackId::from("1")];
        assert_eq!(one.duration_secs, 0.5);
        assert_eq!(one.end_time(), 0.5);
    }

    #[test]
    fn start_reflects_minimum_index_for_non_contiguous_tracks() {
        let seq = FrameSequence::new(vec![
            Frame::new(0.0, vec![det("9", TrackClass::Referee)]),
            Frame::new(0.2, vec![det("5", TrackClass::TeamA)]),
            Frame::new(0.4, vec![det("9", TrackClass::Referee)]),
            Frame::new(0.6, vec![det("5", TrackClass::TeamA)]),
            Frame::new(0.8, vec![det("9", TrackClass::Referee)]),
        ])
        .unwrap();
        let stats = compute_track_stats(&seq, fps(5.0));
        let five = &stats[&TrackId::from("5")];
        assert_eq!(five.start_frame_index, 1);
        assert_eq!(five.start_time, 0.2);
        assert_eq!(five.occurrence_count, 2);
        let nine = &stats[&TrackId::from("9")];
        assert_eq!(nine.start_frame_index, 0);
        assert_eq!(nine.occurrence_count, 3);
    }

    #[test]
    fn iterates_in_natural_id_order() {
        let seq = FrameSequence::new(vec![Frame::new(
            0.0,
            vec![
                det("10", TrackClass::TeamA),
                det("3_a", TrackClass::TeamA),
                det("3", TrackClass::TeamB),
            ],
        )])
        .unwrap();
        let stats = compute_track_stats(&seq, fps(6.0));
        let ids: Vec<&str> = stats
            .keys()
            .map(TrackId::as_str)
            .collect();
        assert_eq!(ids, vec!["3", "3_a", "10"]);
    }

    #[test]
    fn class_counts_cover_all_classes() {
        let counts = class_counts(&compute_track_stats(&scenario(), fps(6.0)));
        assert_eq!(counts[&TrackClass::TeamA], 1);
        assert_eq!(counts[&TrackClass::TeamB], 1);
        assert_eq!(counts[&TrackClass::Referee], 0);
    }

    #[test]
    fn first_appearance_finds_earliest_frame() {
        let seq = scenario();
        assert_eq!(first_appearance(&seq, &TrackId::from("2")), Some(0));
        assert_eq!(first_appearance(&seq, &TrackId::from("4")), None);
    }
}
