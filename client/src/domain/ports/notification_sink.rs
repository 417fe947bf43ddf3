//! Driven port for transient, non-blocking user notifications.
//!
//! Toasts are fire-and-forget: the coordinator never waits on them and a sink
//! cannot fail the operation that raised them.

use serde::{Deserialize, Serialize};

/// Typed toast events raised by the username flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Toast {
    /// Deleting the committed username failed.
    FailedToDeleteUsername,
}

impl Toast {
    /// Stable key used by renderers to look up localised text.
    pub fn key(self) -> &'static str {
        match self {
            Self::FailedToDeleteUsername => "failed_to_delete_username",
        }
    }
}

/// Sink receiving toast events.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    /// Show `toast` to the user.
    fn show_toast(&self, toast: Toast);
}

/// Sink that drops every toast.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn show_toast(&self, _toast: Toast) {}
}
