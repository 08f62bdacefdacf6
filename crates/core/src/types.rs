//! Shared primitive types: track identifiers, detection classes, frame rate
//! and the native coordinate space.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Zero-based position of a frame in the sequence.
pub type FrameIndex = usize;

/// All activity timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// TrackId
// ---------------------------------------------------------------------------

/// Persistent identity of one tracked entity across frames.
///
/// Source data may carry numeric ids; they are normalised to text on load
/// because ids minted by split (`"7_a"`) are not numeric.
///
/// Ordering is natural: the leading decimal prefix is compared numerically
/// (ids without one sort last), then the full text breaks ties. This gives
/// `"2" < "10" < "10_a" < "x"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as an integer when the whole text is decimal digits.
    pub fn as_number(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Derive a new id by appending `suffix` to this one.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{suffix}", self.0))
    }

    fn numeric_prefix(&self) -> Option<u64> {
        let digits = self.0.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        self.0[..digits].parse().ok()
    }
}

impl Ord for TrackId {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_prefix = match (self.numeric_prefix(), other.numeric_prefix()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_prefix.then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for TrackId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Accepted JSON shapes for a track id.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTrackId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = match RawTrackId::deserialize(deserializer)? {
            RawTrackId::Text(s) => s,
            RawTrackId::Unsigned(n) => n.to_string(),
            RawTrackId::Signed(n) => n.to_string(),
            // Whole floats print without a fraction, matching how the
            // numeric ids appear elsewhere in the data.
            RawTrackId::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                format!("{}", f as i64)
            }
            RawTrackId::Float(f) => f.to_string(),
        };
        Ok(Self(id))
    }
}

// ---------------------------------------------------------------------------
// TrackClass
// ---------------------------------------------------------------------------

/// The closed set of detection classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackClass {
    #[serde(rename = "team A")]
    TeamA,
    #[serde(rename = "team B")]
    TeamB,
    #[serde(rename = "referee")]
    Referee,
}

/// All valid class strings.
const VALID_CLASS_STRINGS: &[&str] = &["team A", "team B", "referee"];

impl TrackClass {
    /// Every class, in display order.
    pub const ALL: [TrackClass; 3] = [Self::TeamA, Self::TeamB, Self::Referee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamA => "team A",
            Self::TeamB => "team B",
            Self::Referee => "referee",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "team A" => Ok(Self::TeamA),
            "team B" => Ok(Self::TeamB),
            "referee" => Ok(Self::Referee),
            _ => Err(CoreError::Validation(format!(
                "Invalid track class '{s}'. Must be one of: {}",
                VALID_CLASS_STRINGS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for TrackClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FrameRate
// ---------------------------------------------------------------------------

/// Frames per second of the pre-extracted detection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrameRate(f64);

/// Frame rate of the bundled sample data.
pub const DEFAULT_FPS: f64 = 6.0;

impl FrameRate {
    /// Must be finite and strictly positive.
    pub fn new(fps: f64) -> Result<Self, CoreError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CoreError::Validation(format!(
                "frame rate must be a positive finite number, got {fps}"
            )));
        }
        Ok(Self(fps))
    }

    pub fn fps(&self) -> f64 {
        self.0
    }

    /// Seconds covered by `frames` frames.
    pub fn seconds_for(&self, frames: usize) -> f64 {
        frames as f64 / self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(DEFAULT_FPS)
    }
}

// ---------------------------------------------------------------------------
// CoordinateSpace
// ---------------------------------------------------------------------------

/// Native width of the bundled sample data.
pub const DEFAULT_NATIVE_WIDTH: f64 = 560.0;

/// Native height of the bundled sample data.
pub const DEFAULT_NATIVE_HEIGHT: f64 = 280.0;

/// The fixed coordinate space bounding boxes are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateSpace {
    pub width: f64,
    pub height: f64,
}

impl CoordinateSpace {
    pub fn new(width: f64, height: f64) -> Result<Self, CoreError> {
        for (name, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "native {name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(Self { width, height })
    }
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self {
            width: DEFAULT_NATIVE_WIDTH,
            height: DEFAULT_NATIVE_HEIGHT,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
