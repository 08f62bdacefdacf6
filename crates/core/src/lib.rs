//! Track-editing core for per-frame player detections.
//!
//! - [`frame`]: the immutable, copy-on-write frame sequence and its loader.
//! - [`stats`]: per-track statistics recomputed from a sequence.
//! - [`filter`]: class visibility and id search over the track list.
//! - [`timeline`]: Gantt bar and axis geometry.
//! - [`mutation`]: merge, split and delete, plus the id allocator.
//! - [`render`]: drawing boxes onto a surface and canvas hit-testing.
//! - [`playback`]: the play/pause/seek state machine.
//! - [`activity`]: the user-facing action log.
//! - [`review`]: match metadata and the admin review queue.

pub mod activity;
pub mod error;
pub mod filter;
pub mod frame;
pub mod mutation;
pub mod playback;
pub mod render;
pub mod review;
pub mod stats;
pub mod timeline;
pub mod types;

pub use error::CoreError;
