//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod notification_sink;
mod session_state;
mod username_service;

#[cfg(test)]
pub use notification_sink::MockNotificationSink;
pub use notification_sink::{NoOpNotificationSink, NotificationSink, Toast};
#[cfg(test)]
pub use session_state::MockSessionState;
pub use session_state::{FixtureSessionState, SessionState};
#[cfg(test)]
pub use username_service::MockUsernameService;
pub use username_service::{
    FixtureUsernameService, ReserveUsernameError, ReserveUsernameRequest, UsernameService,
    UsernameServiceError,
};
