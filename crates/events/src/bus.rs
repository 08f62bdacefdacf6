//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! A session owns an `Arc<EventBus>` and publishes a [`SessionEvent`] after
//! every state change; views subscribe and react (scroll the selected row
//! into view, redraw the canvas, append to the activity panel).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use scrub_core::playback::{PlaybackSpeed, PlaybackState};
use scrub_core::types::{FrameIndex, TrackId};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// What changed in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Selected track changed; `None` when the selection was cleared.
    SelectionChanged { track_id: Option<TrackId> },

    /// Current frame index changed.
    FrameChanged { frame_index: FrameIndex },

    /// A mutation replaced the frame sequence.
    FramesReplaced { total_frames: usize, track_count: usize },

    /// A line was added to the activity log.
    ActivityAppended { message: String },

    PlaybackStateChanged {
        state: PlaybackState,
        speed: PlaybackSpeed,
    },
}

/// A notification published by one annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub kind: SessionEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(session_id: Uuid, kind: SessionEventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Every subscriber receives every event published after it subscribed.
/// A receiver that falls more than `capacity` events behind observes
/// `RecvError::Lagged` and skips the oldest ones.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped when nobody listens.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
