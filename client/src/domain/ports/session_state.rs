//! Driven port exposing the signed-in account's committed username.

use crate::domain::Username;

/// Read access to session state owned elsewhere in the application.
#[cfg_attr(test, mockall::automock)]
pub trait SessionState: Send + Sync {
    /// Username currently committed for the local account, if any.
    fn committed_username(&self) -> Option<Username>;
}

/// Fixture session holding a fixed username.
#[derive(Debug, Default, Clone)]
pub struct FixtureSessionState {
    username: Option<Username>,
}

impl FixtureSessionState {
    /// Session whose account owns `username`.
    pub fn with_username(username: Username) -> Self {
        Self {
            username: Some(username),
        }
    }

    /// Session whose account has no username.
    pub fn without_username() -> Self {
        Self::default()
    }
}

impl SessionState for FixtureSessionState {
    fn committed_username(&self) -> Option<Username> {
        self.username.clone()
    }
}
