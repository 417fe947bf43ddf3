//! Toast sink that renders notifications as structured tracing events.

use tracing::warn;

use crate::domain::ports::{NotificationSink, Toast};

/// Tracing target used for rendered toasts.
pub const TOAST_TARGET: &str = "client::toasts";

/// Notification sink emitting one `tracing` event per toast.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn show_toast(&self, toast: Toast) {
        match toast {
            Toast::FailedToDeleteUsername => {
                warn!(target: TOAST_TARGET, toast = toast.key(), "failed to delete username");
            }
        }
    }
}
