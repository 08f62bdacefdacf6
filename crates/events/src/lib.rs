//! Session notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionEvent`]: envelope for everything an annotation session
//!   announces to its views.

pub mod bus;

pub use bus::{EventBus, SessionEvent, SessionEventKind};
