//! Username reservation coordinator.
//!
//! The coordinator sequences reserve, confirm, and delete calls against the
//! username service. One reservation attempt is authoritative at a time:
//! starting a new attempt cancels the previous attempt's token, which aborts a
//! pending debounce delay, and any response whose attempt id no longer matches
//! the recorded state is dropped. The state lives behind a mutex that is never
//! held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    NotificationSink, ReserveUsernameError, ReserveUsernameRequest, SessionState, Toast,
    UsernameService,
};
use crate::domain::{
    AttemptId, AttemptResolution, Nickname, NicknameLimits, NicknameValidationError, Reservation,
    ReservationAttempt, ReservationError, ReservationSnapshot, ReservationState,
    UsernameEditState, Username,
};

mod runtime;

pub use runtime::{TokioSleeper, UsernameReservationPorts, UsernameReservationRuntime};

/// Async clock-independent sleeping abstraction for debounce delays.
#[async_trait]
pub trait DebounceSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// How a `reserve` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Empty input, or a confirm is in flight. State untouched.
    Ignored,
    /// Client-side validation failed; no network call was made.
    Rejected(ReservationError),
    /// A newer attempt or `close` took over; nothing was applied.
    Superseded,
    /// The hold was granted and stored.
    Reserved(Reservation),
    /// The service refused the hold; the mapped error was stored.
    Failed(ReservationError),
}

/// How a `confirm` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The username was committed and the modal closed.
    Confirmed,
    /// The service refused; the modal reopened with a general error.
    Failed,
    /// No open reservation existed; no network call was made.
    NotConfirmable,
    /// This confirm was no longer in flight when its response arrived.
    Discarded,
}

/// How a `delete_username` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Neither an override nor a committed username was available.
    NoUsername,
    /// The username was released.
    Deleted(Username),
    /// The service refused; a toast was shown.
    Failed,
}

/// How a `dismiss` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissOutcome {
    /// The modal closed.
    Dismissed,
    /// A dialog-blocking notice is showing; nothing changed.
    Blocked,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    reservation: ReservationState,
    edit: UsernameEditState,
    read_only_notice: bool,
}

/// Client-side coordinator for the username reservation workflow.
pub struct UsernameReservationCoordinator {
    username_service: Arc<dyn UsernameService>,
    session: Arc<dyn SessionState>,
    notifications: Arc<dyn NotificationSink>,
    sleeper: Arc<dyn DebounceSleeper>,
    limits: NicknameLimits,
    next_attempt: AtomicU64,
    state: Mutex<CoordinatorState>,
}

impl UsernameReservationCoordinator {
    /// Build a coordinator using default runtime dependencies.
    pub fn new(ports: UsernameReservationPorts, limits: NicknameLimits) -> Self {
        Self::with_runtime(ports, UsernameReservationRuntime::default(), limits)
    }

    /// Build a coordinator with injected runtime abstractions.
    pub fn with_runtime(
        ports: UsernameReservationPorts,
        runtime: UsernameReservationRuntime,
        limits: NicknameLimits,
    ) -> Self {
        Self {
            username_service: ports.username_service,
            session: ports.session,
            notifications: ports.notifications,
            sleeper: runtime.sleeper,
            limits,
            next_attempt: AtomicU64::new(1),
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Current reservation read model.
    pub fn snapshot(&self) -> ReservationSnapshot {
        self.with_state(|state| state.reservation.snapshot())
    }

    /// Current edit-flow state.
    pub fn edit_state(&self) -> UsernameEditState {
        self.with_state(|state| state.edit)
    }

    /// Replace the edit-flow state.
    pub fn set_edit_state(&self, edit: UsernameEditState) {
        self.with_state(|state| state.edit = edit);
    }

    /// Show or hide the platform read-only notice that blocks `dismiss`.
    pub fn set_read_only_notice(&self, active: bool) {
        self.with_state(|state| state.read_only_notice = active);
    }

    /// Open the username modal. No-op unless closed.
    pub fn open(&self) {
        if self.with_state(|state| state.reservation.open()) {
            debug!("username modal opened");
        }
    }

    /// Close the modal, clearing error and reservation.
    ///
    /// An in-flight reservation attempt is cancelled and its response dropped.
    pub fn close(&self) {
        let superseded = self.with_state(|state| state.reservation.close());
        cancel_superseded(superseded);
        debug!("username modal closed");
    }

    /// Close the modal unless a dialog-blocking notice is showing.
    pub fn dismiss(&self) -> DismissOutcome {
        let closed = self.with_state(|state| {
            if state.read_only_notice {
                None
            } else {
                Some(state.reservation.close())
            }
        });
        match closed {
            Some(superseded) => {
                cancel_superseded(superseded);
                debug!("username modal dismissed");
                DismissOutcome::Dismissed
            }
            None => {
                debug!("username modal dismissal blocked by read-only notice");
                DismissOutcome::Blocked
            }
        }
    }

    /// Validate `nickname` and reserve it after `debounce`.
    ///
    /// A later call supersedes this one: if that happens during the debounce
    /// delay no request is sent, and if it happens while the request is in
    /// flight the response is dropped.
    pub async fn reserve(&self, nickname: &str, debounce: Duration) -> ReserveOutcome {
        let nickname = match Nickname::new(nickname, self.limits) {
            Ok(nickname) => nickname,
            Err(error) => return self.reject_nickname(error),
        };

        let attempt = ReservationAttempt::new(self.allocate_attempt_id());
        let superseded =
            match self.with_state(|state| state.reservation.begin_attempt(attempt.clone())) {
                Ok(superseded) => superseded,
                Err(refusal) => {
                    warn!(?refusal, %nickname, "reserve ignored while a confirm is in flight");
                    return ReserveOutcome::Ignored;
                }
            };
        cancel_superseded(superseded);
        let attempt_id = attempt.id().get();
        debug!(attempt_id, %nickname, "reservation attempt started");

        if !self.wait_for_debounce(&attempt, debounce).await {
            debug!(attempt_id, "reservation attempt superseded during debounce");
            return ReserveOutcome::Superseded;
        }

        let request = ReserveUsernameRequest {
            previous_username: self.session.committed_username(),
            nickname: nickname.clone(),
            cancellation: attempt.cancellation().clone(),
        };
        let outcome = self
            .username_service
            .reserve_username(request)
            .await
            .map_err(|error| {
                warn!(attempt_id, %nickname, %error, "username reservation failed");
                map_reserve_error(&error)
            });

        let resolution = self.with_state(|state| {
            state
                .reservation
                .complete_attempt(attempt.id(), outcome.clone())
        });
        match (resolution, outcome) {
            (AttemptResolution::Stale, _) => {
                debug!(attempt_id, "dropping response of superseded reservation attempt");
                ReserveOutcome::Superseded
            }
            (AttemptResolution::Applied, Ok(reservation)) => {
                info!(attempt_id, username = %reservation.username(), "username reserved");
                ReserveOutcome::Reserved(reservation)
            }
            (AttemptResolution::Applied, Err(error)) => ReserveOutcome::Failed(error),
        }
    }

    /// Commit the reservation held by the open modal.
    pub async fn confirm(&self) -> ConfirmOutcome {
        let attempt = self.allocate_attempt_id();
        let reservation = match self.with_state(|state| state.reservation.begin_confirm(attempt)) {
            Ok(reservation) => reservation,
            Err(refusal) => {
                error!(?refusal, "confirm requested without an open reservation");
                let superseded =
                    self.with_state(|state| state.reservation.fail_with_general_error());
                cancel_superseded(superseded);
                return ConfirmOutcome::NotConfirmable;
            }
        };

        let result = self.username_service.confirm_username(&reservation).await;
        if let Err(error) = &result {
            warn!(username = %reservation.username(), %error, "username confirmation failed");
        }

        let applied =
            self.with_state(|state| state.reservation.complete_confirm(attempt, result.is_ok()));
        match (applied, result) {
            (false, _) => {
                debug!(
                    attempt_id = attempt.get(),
                    username = %reservation.username(),
                    "dropping stale confirm response"
                );
                ConfirmOutcome::Discarded
            }
            (true, Ok(())) => {
                info!(username = %reservation.username(), "username confirmed");
                ConfirmOutcome::Confirmed
            }
            (true, Err(_)) => ConfirmOutcome::Failed,
        }
    }

    /// Delete `override_username`, or the session's committed username.
    ///
    /// Tracks progress in the edit state only; the reservation state is never
    /// touched. Failures raise [`Toast::FailedToDeleteUsername`].
    pub async fn delete_username(&self, override_username: Option<Username>) -> DeleteOutcome {
        let Some(username) = override_username.or_else(|| self.session.committed_username())
        else {
            debug!("no committed username to delete");
            return DeleteOutcome::NoUsername;
        };

        self.set_edit_state(UsernameEditState::Deleting);
        let result = self.username_service.delete_username(&username).await;
        self.set_edit_state(UsernameEditState::Editing);

        match result {
            Ok(()) => {
                info!(%username, "username deleted");
                DeleteOutcome::Deleted(username)
            }
            Err(error) => {
                warn!(%username, %error, "username deletion failed");
                self.notifications.show_toast(Toast::FailedToDeleteUsername);
                DeleteOutcome::Failed
            }
        }
    }

    fn reject_nickname(&self, error: NicknameValidationError) -> ReserveOutcome {
        let Some(reservation_error) = error.reservation_error() else {
            return ReserveOutcome::Ignored;
        };
        match self.with_state(|state| state.reservation.reject_input(reservation_error)) {
            Ok(superseded) => {
                cancel_superseded(superseded);
                debug!(%error, "nickname rejected before reservation");
                ReserveOutcome::Rejected(reservation_error)
            }
            Err(refusal) => {
                warn!(?refusal, %error, "nickname rejection ignored while a confirm is in flight");
                ReserveOutcome::Ignored
            }
        }
    }

    async fn wait_for_debounce(&self, attempt: &ReservationAttempt, debounce: Duration) -> bool {
        let cancellation = attempt.cancellation();
        tokio::select! {
            biased;
            () = cancellation.cancelled() => false,
            () = self.sleeper.sleep(debounce) => !cancellation.is_cancelled(),
        }
    }

    fn allocate_attempt_id(&self) -> AttemptId {
        AttemptId::new(self.next_attempt.fetch_add(1, Ordering::Relaxed))
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut CoordinatorState) -> R) -> R {
        // Every transition replaces the state wholesale, so a poisoned guard
        // still holds a consistent value.
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }
}

fn cancel_superseded(superseded: Option<ReservationAttempt>) {
    if let Some(attempt) = superseded {
        debug!(attempt_id = attempt.id().get(), "cancelling superseded reservation attempt");
        attempt.cancel();
    }
}

fn map_reserve_error(error: &ReserveUsernameError) -> ReservationError {
    match error {
        ReserveUsernameError::Unprocessable { .. } => ReservationError::CheckCharacters,
        ReserveUsernameError::Conflict { .. } => ReservationError::UsernameNotAvailable,
        ReserveUsernameError::Other { .. } => ReservationError::General,
    }
}
