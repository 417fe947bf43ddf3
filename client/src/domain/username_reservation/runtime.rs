//! Port and runtime dependency bundles for the reservation coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{NotificationSink, SessionState, UsernameService};

use super::DebounceSleeper;

/// Port bundle required by the coordinator.
pub struct UsernameReservationPorts {
    /// Remote username service adapter.
    pub username_service: Arc<dyn UsernameService>,
    /// Session state query for the committed username.
    pub session: Arc<dyn SessionState>,
    /// Toast sink for user-visible failures.
    pub notifications: Arc<dyn NotificationSink>,
}

impl UsernameReservationPorts {
    /// Build a strongly-typed coordinator port bundle.
    pub fn new(
        username_service: Arc<dyn UsernameService>,
        session: Arc<dyn SessionState>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            username_service,
            session,
            notifications,
        }
    }
}

/// Runtime helpers used by the debounce delay.
pub struct UsernameReservationRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn DebounceSleeper>,
}

impl Default for UsernameReservationRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl DebounceSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
