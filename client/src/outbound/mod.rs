//! Outbound adapters implementing the domain ports.
//!
//! - **in_memory_username_directory**: a single-account username service and
//!   session store used by the CLI and behavioural tests
//! - **tracing_notifications**: toasts rendered as `tracing` events
//!
//! Adapters translate between domain types and their backing store. They hold
//! no workflow logic; sequencing lives in the coordinator.

pub mod in_memory_username_directory;
pub mod tracing_notifications;

pub use in_memory_username_directory::InMemoryUsernameDirectory;
pub use tracing_notifications::{TOAST_TARGET, TracingNotificationSink};
