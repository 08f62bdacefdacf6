//! Annotation session composition root.
//!
//! - [`AnnotationSession`]: owns the frame sequence and all derived state.
//! - [`PlaybackClock`]: cancellable Tokio timer driving playback.
//! - [`SessionConfig`]: environment-based configuration.
//! - [`runner`]: headless play-to-end driver used by the binary.

pub mod clock;
pub mod config;
pub mod runner;
pub mod session;

pub use clock::{PlaybackClock, PlaybackTick};
pub use config::SessionConfig;
pub use session::{AnnotationSession, SelectedDetail, SessionOptions};
