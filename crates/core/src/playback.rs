//! Playback state machine.
//!
//! [`PlaybackController`] owns the current frame index and play state. It
//! never schedules anything itself: a timer outside this crate feeds it
//! [`PlaybackController::tick`] calls tagged with the generation it was
//! started for, and stale generations are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FrameIndex;

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Playing => "playing",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PlaybackSpeed
// ---------------------------------------------------------------------------

/// Supported playback rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [Self::Half, Self::Normal, Self::OneAndHalf, Self::Double];

    pub fn factor(&self) -> f64 {
        match self {
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::OneAndHalf => 1.5,
            Self::Double => 2.0,
        }
    }

    /// Time between two frame advances: `1000 / factor` milliseconds.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.factor())
    }

    pub fn from_factor(factor: f64) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.factor() == factor)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid playback speed '{factor}'. Must be one of: 0.5, 1, 1.5, 2"
                ))
            })
    }

    /// Parse the textual form used in configuration, e.g. `"1.5"`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let factor: f64 = s.trim().parse().map_err(|_| {
            CoreError::Validation(format!(
                "Invalid playback speed '{s}'. Must be one of: 0.5, 1, 1.5, 2"
            ))
        })?;
        Self::from_factor(factor)
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Result of feeding a timer tick to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Moved to the given frame and keeps playing.
    Advanced(FrameIndex),
    /// Moved onto the last frame and paused.
    ReachedEnd(FrameIndex),
    /// Tick came from a cancelled timer or arrived while paused.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackController {
    frame_index: FrameIndex,
    total_frames: usize,
    state: PlaybackState,
    speed: PlaybackSpeed,
    generation: u64,
}

impl PlaybackController {
    pub fn new(total_frames: usize) -> Self {
        Self {
            frame_index: 0,
            total_frames,
            state: PlaybackState::Paused,
            speed: PlaybackSpeed::default(),
            generation: 0,
        }
    }

    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    /// Generation a timer must be tagged with for its ticks to count.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn last_index(&self) -> FrameIndex {
        self.total_frames.saturating_sub(1)
    }

    pub fn is_at_end(&self) -> bool {
        self.frame_index >= self.last_index()
    }

    /// Start playing. Returns `false` when already playing or on the last frame.
    pub fn play(&mut self) -> bool {
        if self.is_playing() || self.is_at_end() {
            return false;
        }
        self.state = PlaybackState::Playing;
        self.generation += 1;
        true
    }

    /// Returns `false` when already paused.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Paused;
        self.generation += 1;
        true
    }

    /// Pause and rewind to the first frame.
    pub fn stop(&mut self) {
        self.pause();
        self.frame_index = 0;
    }

    pub fn step_forward(&mut self) -> FrameIndex {
        self.pause();
        self.frame_index = (self.frame_index + 1).min(self.last_index());
        self.frame_index
    }

    pub fn step_backward(&mut self) -> FrameIndex {
        self.pause();
        self.frame_index = self.frame_index.saturating_sub(1);
        self.frame_index
    }

    /// Move to `index`, clamped to the sequence. Keeps the play state.
    pub fn seek(&mut self, index: FrameIndex) -> FrameIndex {
        self.frame_index = index.min(self.last_index());
        self.frame_index
    }

    /// Seek to a 1-based frame number as typed by a user.
    pub fn jump_to_frame_number(&mut self, number: i64) -> FrameIndex {
        let index = usize::try_from(number.saturating_sub(1)).unwrap_or(0);
        self.seek(index)
    }

    /// Change speed. While playing this invalidates the running timer so
    /// the caller can restart it at the new rate.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> bool {
        if speed == self.speed {
            return false;
        }
        self.speed = speed;
        if self.is_playing() {
            self.generation += 1;
        }
        true
    }

    /// The sequence changed length; keep the index inside it.
    pub fn set_total_frames(&mut self, total_frames: usize) {
        self.total_frames = total_frames;
        self.frame_index = self.frame_index.min(self.last_index());
        if self.is_playing() && self.is_at_end() {
            self.pause();
        }
    }

    /// Advance by one frame for a tick of `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if !self.is_playing() || generation != self.generation {
            return TickOutcome::Ignored;
        }
        self.frame_index = (self.frame_index + 1).min(self.last_index());
        if self.is_at_end() {
            self.pause();
            TickOutcome::ReachedEnd(self.frame_index)
        } else {
            TickOutcome::Advanced(self.frame_index)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
