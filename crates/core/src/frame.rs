//! Frame sequence data model and loading.
//!
//! A [`FrameSequence`] is an immutable, shared snapshot of every frame. Edits
//! never touch a sequence in place; the mutation engine builds a new one and
//! the owner swaps the reference, so readers always see a complete sequence.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::types::{FrameIndex, TrackClass, TrackId};

// ---------------------------------------------------------------------------
// BBox
// ---------------------------------------------------------------------------

/// Axis-aligned box in native coordinates, serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Inclusive on every edge.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    fn validate(&self) -> Result<(), String> {
        let coords = [self.x1, self.y1, self.x2, self.y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(format!("bbox {coords:?} contains a non-finite coordinate"));
        }
        if self.x1 > self.x2 || self.y1 > self.y2 {
            return Err(format!("bbox {coords:?} must satisfy x1 <= x2 and y1 <= y2"));
        }
        Ok(())
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ---------------------------------------------------------------------------
// Detection / Frame
// ---------------------------------------------------------------------------

/// One bounding box for one track in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: TrackId,
    pub class: TrackClass,
    pub bbox: BBox,
}

impl Detection {
    /// Same box and class under a different identity.
    pub fn relabelled(&self, track_id: TrackId) -> Self {
        Self {
            track_id,
            ..self.clone()
        }
    }
}

/// A timestamped set of detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Seconds from the start of the clip.
    pub timestamp: f64,
    #[serde(rename = "tracks", default)]
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp,
            detections,
        }
    }

    pub fn detection(&self, id: &TrackId) -> Option<&Detection> {
        self.detections.iter().find(|d| &d.track_id == id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.detection(id).is_some()
    }
}

// ---------------------------------------------------------------------------
// FrameSequence
// ---------------------------------------------------------------------------

/// Ordered, immutable, cheaply clonable sequence of frames.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Arc<[Frame]>,
}

impl FrameSequence {
    /// Build a sequence after checking every data-model invariant.
    pub fn new(frames: Vec<Frame>) -> Result<Self, CoreError> {
        validate_frames(&frames)?;
        Ok(Self::from_validated(frames))
    }

    /// Wrap frames already known to satisfy the invariants.
    pub(crate) fn from_validated(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let frames: Vec<Frame> = serde_json::from_str(json)?;
        Self::new(frames)
    }

    /// Read and validate a JSON frame file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: FrameIndex) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.frames.last().map(|f| f.timestamp)
    }

    /// `true` when both handles point at the very same snapshot.
    pub fn same_as(&self, other: &FrameSequence) -> bool {
        Arc::ptr_eq(&self.frames, &other.frames)
    }

    pub fn contains_track(&self, id: &TrackId) -> bool {
        self.frames.iter().any(|f| f.contains(id))
    }

    /// Number of frames carrying a detection for `id`.
    pub fn occurrences(&self, id: &TrackId) -> usize {
        self.frames.iter().filter(|f| f.contains(id)).count()
    }

    /// Every distinct track id, in natural order.
    pub fn track_ids(&self) -> BTreeSet<TrackId> {
        self.frames
            .iter()
            .flat_map(|f| f.detections.iter().map(|d| d.track_id.clone()))
            .collect()
    }

    pub fn detection_count(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }
}

impl Default for FrameSequence {
    fn default() -> Self {
        Self::from_validated(Vec::new())
    }
}

impl Serialize for FrameSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.frames.iter())
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check timestamps are finite and non-decreasing, track ids are unique
/// within each frame, and every bbox is well formed.
pub fn validate_frames(frames: &[Frame]) -> Result<(), CoreError> {
    let mut previous: Option<f64> = None;

    for (idx, frame) in frames.iter().enumerate() {
        if !frame.timestamp.is_finite() {
            return Err(CoreError::Validation(format!(
                "frame {idx}: timestamp must be finite, got {}",
                frame.timestamp
            )));
        }
        if let Some(prev) = previous {
            if frame.timestamp < prev {
                return Err(CoreError::Validation(format!(
                    "frame {idx}: timestamp {} is earlier than the previous frame ({prev})",
                    frame.timestamp
                )));
            }
        }
        previous = Some(frame.timestamp);

        let mut seen: HashSet<&TrackId> = HashSet::with_capacity(frame.detections.len());
        for detection in &frame.detections {
            if !seen.insert(&detection.track_id) {
                return Err(CoreError::Validation(format!(
                    "frame {idx}: track id '{}' appears more than once",
                    detection.track_id
                )));
            }
            detection
                .bbox
                .validate()
                .map_err(|msg| CoreError::Validation(format!("frame {idx}: {msg}")))?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn det(id: &str, class: TrackClass) -> Detection {
        Detection {
            track_id: TrackId::from(id),
            class,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    const SAMPLE: &str = r#"[
        {"timestamp": 0.0, "tracks": [
            {"track_id": 1, "class": "team A", "bbox": [10, 20, 30, 60]},
            {"track_id": "2", "class": "referee", "bbox": [100, 20, 120, 60]}
        ]},
        {"timestamp": 0.5, "tracks": []},
        {"timestamp": 1.0}
    ]"#;

    // -- loading -----------------------------------------------------------

    #[test]
    fn parses_mixed_id_types_and_missing_tracks() {
        let seq = FrameSequence::from_json_str(SAMPLE).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.detection_count(), 2);
        let first = seq.get(0).unwrap();
        assert_eq!(first.detections[0].track_id.as_str(), "1");
        assert_eq!(first.detections[0].bbox, BBox::new(10.0, 20.0, 30.0, 60.0));
        assert!(seq.get(2).unwrap().detections.is_empty());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let seq = FrameSequence::load(file.path()).unwrap();
        assert_eq!(seq.last_timestamp(), Some(1.0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FrameSequence::load("/nonexistent/frames.json").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn unknown_class_is_json_error() {
        let json = r#"[{"timestamp": 0, "tracks": [{"track_id": 1, "class": "coach", "bbox": [0,0,1,1]}]}]"#;
        assert!(matches!(
            FrameSequence::from_json_str(json).unwrap_err(),
            CoreError::Json(_)
        ));
    }

    #[test]
    fn serializes_back_to_input_shape() {
        let seq = FrameSequence::from_json_str(SAMPLE).unwrap();
        let value = serde_json::to_value(&seq).unwrap();
        assert_eq!(value[0]["tracks"][0]["track_id"], "1");
        assert_eq!(value[0]["tracks"][0]["class"], "team A");
        assert_eq!(value[0]["tracks"][0]["bbox"][3], 60.0);
    }

    // -- validation --------------------------------------------------------

    #[test]
    fn decreasing_timestamps_rejected() {
        let frames = vec![Frame::new(1.0, vec![]), Frame::new(0.5, vec![])];
        let err = FrameSequence::new(frames).unwrap_err();
        assert!(err.to_string().contains("frame 1"));
    }

    #[test]
    fn equal_timestamps_accepted() {
        let frames = vec![Frame::new(0.5, vec![]), Frame::new(0.5, vec![])];
        assert!(FrameSequence::new(frames).is_ok());
    }

    #[test]
    fn duplicate_id_within_frame_rejected() {
        let frames = vec![Frame::new(
            0.0,
            vec![det("3", TrackClass::TeamA), det("3", TrackClass::TeamB)],
        )];
        let err = FrameSequence::new(frames).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn inverted_bbox_rejected() {
        let mut d = det("1", TrackClass::Referee);
        d.bbox = BBox::new(20.0, 0.0, 10.0, 5.0);
        let err = FrameSequence::new(vec![Frame::new(0.0, vec![d])]).unwrap_err();
        assert!(err.to_string().contains("x1 <= x2"));
    }

    #[test]
    fn non_finite_timestamp_rejected() {
        let err = FrameSequence::new(vec![Frame::new(f64::NAN, vec![])]).unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    // -- queries -----------------------------------------------------------

    #[test]
    fn clones_share_the_same_snapshot() {
        let seq = FrameSequence::from_json_str(SAMPLE).unwrap();
        let copy = seq.clone();
        assert!(seq.same_as(&copy));
        let rebuilt = FrameSequence::from_json_str(SAMPLE).unwrap();
        assert!(!seq.same_as(&rebuilt));
    }

    #[test]
    fn track_queries() {
        let seq = FrameSequence::from_json_str(SAMPLE).unwrap();
        let two = TrackId::from("2");
        assert!(seq.contains_track(&two));
        assert_eq!(seq.occurrences(&two), 1);
        assert!(!seq.contains_track(&TrackId::from("9")));
        let ids: Vec<String> = seq.track_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn bbox_contains_is_inclusive() {
        let b = BBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(b.contains(10.0, 20.0));
        assert!(!b.contains(20.1, 15.0));
        assert_eq!(b.width(), 10.0);
    }
}
