//! Reservation state machine.
//!
//! Transitions are pure methods on [`ReservationState`]; the coordinator owns
//! the single instance and performs the remote calls. Methods that supersede
//! an in-flight attempt hand it back so the caller can cancel its token.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Reservation, ReservationError};

/// Monotonically unique identifier of one reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Wrap a raw generation number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw generation number.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One in-flight reservation attempt.
#[derive(Debug, Clone)]
pub struct ReservationAttempt {
    id: AttemptId,
    cancellation: CancellationToken,
}

impl ReservationAttempt {
    /// Start an attempt with a fresh cancellation token.
    pub fn new(id: AttemptId) -> Self {
        Self {
            id,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attempt identifier compared when the response arrives.
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Token cancelled when the attempt is superseded.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Invalidate the attempt, interrupting a pending debounce delay.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

/// Client-side reservation state. Exactly one variant is active.
#[derive(Debug, Clone, Default)]
pub enum ReservationState {
    /// No reservation in progress and no modal open.
    #[default]
    Closed,
    /// Modal open, optionally holding a reservation and/or an error.
    Open {
        reservation: Option<Reservation>,
        error: Option<ReservationError>,
    },
    /// A reserve request is in flight.
    Reserving { attempt: ReservationAttempt },
    /// A confirm request is in flight.
    Confirming {
        reservation: Reservation,
        attempt: AttemptId,
    },
}

/// Result of applying a reserve response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResolution {
    /// The response belonged to the recorded attempt and was stored.
    Applied,
    /// The response belonged to a superseded attempt and was dropped.
    Stale,
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRefusal {
    /// A confirm request is in flight.
    ConfirmInFlight,
    /// `confirm` requires `Open` with a reservation.
    NoOpenReservation,
}

/// Coarse state discriminant for read models and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReservationStatus {
    Closed,
    Open,
    Reserving,
    Confirming,
}

/// Serialisable view of [`ReservationState`] for UI adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSnapshot {
    pub status: ReservationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReservationError>,
}

impl ReservationState {
    /// Coarse discriminant of the active variant.
    pub fn status(&self) -> ReservationStatus {
        match self {
            Self::Closed => ReservationStatus::Closed,
            Self::Open { .. } => ReservationStatus::Open,
            Self::Reserving { .. } => ReservationStatus::Reserving,
            Self::Confirming { .. } => ReservationStatus::Confirming,
        }
    }

    /// Read model without the cancellation token.
    pub fn snapshot(&self) -> ReservationSnapshot {
        let (reservation, error) = match self {
            Self::Open { reservation, error } => (reservation.clone(), *error),
            Self::Confirming { reservation, .. } => (Some(reservation.clone()), None),
            Self::Closed | Self::Reserving { .. } => (None, None),
        };
        ReservationSnapshot {
            status: self.status(),
            reservation,
            error,
        }
    }

    /// `Closed → Open`. Returns `false` in any other state.
    pub fn open(&mut self) -> bool {
        if matches!(self, Self::Closed) {
            *self = Self::Open {
                reservation: None,
                error: None,
            };
            true
        } else {
            false
        }
    }

    /// Any state → `Closed`, returning an attempt that must be cancelled.
    pub fn close(&mut self) -> Option<ReservationAttempt> {
        match std::mem::take(self) {
            Self::Reserving { attempt } => Some(attempt),
            _ => None,
        }
    }

    /// Record `attempt` as authoritative.
    ///
    /// Returns the superseded attempt, if any. Refused while confirming.
    pub fn begin_attempt(
        &mut self,
        attempt: ReservationAttempt,
    ) -> Result<Option<ReservationAttempt>, TransitionRefusal> {
        if matches!(self, Self::Confirming { .. }) {
            return Err(TransitionRefusal::ConfirmInFlight);
        }
        match std::mem::replace(self, Self::Reserving { attempt }) {
            Self::Reserving { attempt: previous } => Ok(Some(previous)),
            _ => Ok(None),
        }
    }

    /// Store a client-side validation error.
    ///
    /// Any in-flight attempt is returned for cancellation because its
    /// nickname is no longer what the user typed. Refused while confirming.
    pub fn reject_input(
        &mut self,
        error: ReservationError,
    ) -> Result<Option<ReservationAttempt>, TransitionRefusal> {
        if matches!(self, Self::Confirming { .. }) {
            return Err(TransitionRefusal::ConfirmInFlight);
        }
        let previous = std::mem::replace(
            self,
            Self::Open {
                reservation: None,
                error: Some(error),
            },
        );
        match previous {
            Self::Reserving { attempt } => Ok(Some(attempt)),
            _ => Ok(None),
        }
    }

    /// Apply the response of attempt `id`.
    ///
    /// Only the attempt currently recorded in `Reserving` may mutate state.
    pub fn complete_attempt(
        &mut self,
        id: AttemptId,
        outcome: Result<Reservation, ReservationError>,
    ) -> AttemptResolution {
        match self {
            Self::Reserving { attempt } if attempt.id() == id => {
                *self = match outcome {
                    Ok(reservation) => Self::Open {
                        reservation: Some(reservation),
                        error: None,
                    },
                    Err(error) => Self::Open {
                        reservation: None,
                        error: Some(error),
                    },
                };
                AttemptResolution::Applied
            }
            _ => AttemptResolution::Stale,
        }
    }

    /// `Open` with a reservation → `Confirming` under `attempt`.
    ///
    /// Returns the reservation to confirm. On refusal the state is left
    /// unchanged; see [`Self::fail_with_general_error`].
    pub fn begin_confirm(&mut self, attempt: AttemptId) -> Result<Reservation, TransitionRefusal> {
        match self {
            Self::Open {
                reservation: Some(reservation),
                ..
            } => {
                let reservation = reservation.clone();
                *self = Self::Confirming {
                    reservation: reservation.clone(),
                    attempt,
                };
                Ok(reservation)
            }
            Self::Confirming { .. } => Err(TransitionRefusal::ConfirmInFlight),
            _ => Err(TransitionRefusal::NoOpenReservation),
        }
    }

    /// Apply the response of confirm attempt `id`.
    ///
    /// Success closes the modal; failure reopens it with
    /// [`ReservationError::General`] and keeps the reservation for a retry.
    /// Returns `false`, leaving the state untouched, unless `id` is the
    /// confirm currently in flight.
    pub fn complete_confirm(&mut self, id: AttemptId, confirmed: bool) -> bool {
        let Self::Confirming {
            reservation,
            attempt,
        } = self
        else {
            return false;
        };
        if *attempt != id {
            return false;
        }
        *self = if confirmed {
            Self::Closed
        } else {
            Self::Open {
                reservation: Some(reservation.clone()),
                error: Some(ReservationError::General),
            }
        };
        true
    }

    /// Surface [`ReservationError::General`] after a misuse.
    ///
    /// An open modal keeps its reservation; other states reopen the modal
    /// empty, returning an in-flight attempt for cancellation. An in-flight
    /// confirm is never interrupted.
    pub fn fail_with_general_error(&mut self) -> Option<ReservationAttempt> {
        match self {
            Self::Open { error, .. } => {
                *error = Some(ReservationError::General);
                None
            }
            Self::Confirming { .. } => None,
            Self::Closed | Self::Reserving { .. } => {
                let previous = std::mem::replace(
                    self,
                    Self::Open {
                        reservation: None,
                        error: Some(ReservationError::General),
                    },
                );
                match previous {
                    Self::Reserving { attempt } => Some(attempt),
                    _ => None,
                }
            }
        }
    }
}

/// Progress of the separate username edit flow (deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsernameEditState {
    /// Idle editor.
    #[default]
    Editing,
    /// The user is asked to confirm deletion.
    ConfirmingDelete,
    /// A delete request is in flight.
    Deleting,
}
