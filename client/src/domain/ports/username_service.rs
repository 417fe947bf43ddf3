//! Driven port for the remote username service.
//!
//! The coordinator reserves, confirms, and deletes usernames through this
//! port without knowing the transport. Superseded reserve calls are not
//! aborted; the cancellation token in [`ReserveUsernameRequest`] is advisory
//! and adapters may ignore it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::define_port_error;
use crate::domain::{Nickname, Reservation, ReservationDraft, ReservationHash, Username};

define_port_error! {
    /// Domain failures returned by the reserve call.
    pub enum ReserveUsernameError {
        /// The service could not process the nickname.
        Unprocessable { message: String } => "username service rejected nickname: {message}",
        /// The nickname has no free discriminator.
        Conflict { message: String } => "username is not available: {message}",
        /// Transport or server failure.
        Other { message: String } => "username reservation failed: {message}",
    }
}

define_port_error! {
    /// Failures returned by confirm and delete calls.
    pub enum UsernameServiceError {
        /// The request did not reach the service.
        Transport { message: String } => "username service unavailable: {message}",
        /// The service refused the request.
        Rejected { message: String } => "username service rejected request: {message}",
    }
}

/// Input for [`UsernameService::reserve_username`].
#[derive(Debug, Clone)]
pub struct ReserveUsernameRequest {
    /// Currently committed username, replaced once the hold is confirmed.
    pub previous_username: Option<Username>,
    /// Validated candidate nickname.
    pub nickname: Nickname,
    /// Cancelled when a newer attempt supersedes this one.
    pub cancellation: CancellationToken,
}

/// Remote username service operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsernameService: Send + Sync {
    /// Place a time-bounded hold on `nickname` with a server-chosen
    /// discriminator.
    async fn reserve_username(
        &self,
        request: ReserveUsernameRequest,
    ) -> Result<Reservation, ReserveUsernameError>;

    /// Commit a previously reserved username.
    async fn confirm_username(&self, reservation: &Reservation) -> Result<(), UsernameServiceError>;

    /// Release the committed `username`.
    async fn delete_username(&self, username: &Username) -> Result<(), UsernameServiceError>;
}

/// Fixture service that accepts every request.
///
/// Reservations use discriminator `01`, a fixed hash, and never expire.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUsernameService;

const FIXTURE_DISCRIMINATOR: &str = "01";

#[async_trait]
impl UsernameService for FixtureUsernameService {
    async fn reserve_username(
        &self,
        request: ReserveUsernameRequest,
    ) -> Result<Reservation, ReserveUsernameError> {
        let username = Username::from_parts(&request.nickname, FIXTURE_DISCRIMINATOR)
            .map_err(|err| {
                ReserveUsernameError::other(format!("invalid fixture username: {err}"))
            })?;
        Ok(Reservation::new(ReservationDraft {
            username,
            previous_username: request.previous_username,
            hash: ReservationHash::new(request.nickname.as_ref().as_bytes().to_vec()),
            expires_at: DateTime::<Utc>::MAX_UTC,
        }))
    }

    async fn confirm_username(
        &self,
        _reservation: &Reservation,
    ) -> Result<(), UsernameServiceError> {
        Ok(())
    }

    async fn delete_username(&self, _username: &Username) -> Result<(), UsernameServiceError> {
        Ok(())
    }
}
