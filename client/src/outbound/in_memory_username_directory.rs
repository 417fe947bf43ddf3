//! In-memory username directory for a single local account.
//!
//! Implements both [`UsernameService`] and [`SessionState`]. The account holds
//! at most one reservation: each reserve replaces the previous hold, and a
//! successful confirm turns the hold into the session's committed username.
//! Discriminators are random two-digit numbers and expiries come from the
//! injected clock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::ports::{
    ReserveUsernameError, ReserveUsernameRequest, SessionState, UsernameService,
    UsernameServiceError,
};
use crate::domain::{Reservation, ReservationDraft, ReservationHash, Username};

/// Discriminators are drawn from `0..DISCRIMINATOR_SPACE` and zero-padded.
const DISCRIMINATOR_SPACE: u8 = 100;

#[derive(Debug)]
struct DirectoryState {
    rng: SmallRng,
    sequence: u64,
    committed: Option<Username>,
    hold: Option<Reservation>,
}

/// Username service and session store backed by process memory.
pub struct InMemoryUsernameDirectory {
    clock: Arc<dyn Clock>,
    hold_duration: TimeDelta,
    taken: HashSet<String>,
    state: Mutex<DirectoryState>,
}

impl InMemoryUsernameDirectory {
    /// Create an empty directory whose holds last `hold_duration`.
    ///
    /// `seed` drives discriminator generation so runs are reproducible.
    pub fn new(clock: Arc<dyn Clock>, hold_duration: TimeDelta, seed: u64) -> Self {
        Self {
            clock,
            hold_duration,
            taken: HashSet::new(),
            state: Mutex::new(DirectoryState {
                rng: SmallRng::seed_from_u64(seed),
                sequence: 0,
                committed: None,
                hold: None,
            }),
        }
    }

    /// Mark `nicknames` as unavailable to this account.
    #[must_use]
    pub fn with_taken_nicknames<I, S>(mut self, nicknames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taken.extend(nicknames.into_iter().map(Into::into));
        self
    }

    /// Start with `username` already committed to the account.
    #[must_use]
    pub fn with_committed_username(self, username: Username) -> Self {
        self.with_state(|state| state.committed = Some(username));
        self
    }

    /// The outstanding hold, expired or not.
    pub fn pending_hold(&self) -> Option<Reservation> {
        self.with_state(|state| state.hold.clone())
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut DirectoryState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }
}

fn hold_hash(username: &Username, sequence: u64) -> ReservationHash {
    let mut hasher = Sha256::new();
    hasher.update(username.as_ref().as_bytes());
    hasher.update(sequence.to_be_bytes());
    ReservationHash::new(hasher.finalize().to_vec())
}

#[async_trait]
impl UsernameService for InMemoryUsernameDirectory {
    async fn reserve_username(
        &self,
        request: ReserveUsernameRequest,
    ) -> Result<Reservation, ReserveUsernameError> {
        let nickname = request.nickname.as_ref();
        if nickname.chars().all(|ch| ch == '_') {
            return Err(ReserveUsernameError::unprocessable(format!(
                "nickname {nickname} has no letters or digits"
            )));
        }
        if self.taken.contains(nickname) {
            return Err(ReserveUsernameError::conflict(format!(
                "no discriminator left for {nickname}"
            )));
        }
        if request.cancellation.is_cancelled() {
            debug!(%nickname, "reserving for a superseded attempt");
        }

        let expires_at = self.clock.utc() + self.hold_duration;
        self.with_state(|state| {
            let discriminator = format!("{:02}", state.rng.gen_range(0..DISCRIMINATOR_SPACE));
            let username = Username::from_parts(&request.nickname, &discriminator)
                .map_err(|err| ReserveUsernameError::other(err.to_string()))?;
            state.sequence += 1;
            let hash = hold_hash(&username, state.sequence);
            let reservation = Reservation::new(ReservationDraft {
                username,
                previous_username: request.previous_username,
                hash,
                expires_at,
            });
            if let Some(replaced) = state.hold.replace(reservation.clone()) {
                debug!(username = %replaced.username(), "previous hold released");
            }
            debug!(username = %reservation.username(), "hold placed");
            Ok(reservation)
        })
    }

    async fn confirm_username(
        &self,
        reservation: &Reservation,
    ) -> Result<(), UsernameServiceError> {
        let now = self.clock.utc();
        self.with_state(|state| {
            let Some(hold) = state
                .hold
                .take_if(|hold| hold.hash() == reservation.hash())
            else {
                return Err(UsernameServiceError::rejected(format!(
                    "unknown reservation {}",
                    reservation.hash()
                )));
            };
            if hold.username() != reservation.username() {
                return Err(UsernameServiceError::rejected(
                    "reservation does not match its hash",
                ));
            }
            if hold.is_expired(now) {
                return Err(UsernameServiceError::rejected(format!(
                    "reservation for {} expired at {}",
                    hold.username(),
                    hold.expires_at()
                )));
            }
            state.committed = Some(hold.username().clone());
            Ok(())
        })
    }

    async fn delete_username(&self, username: &Username) -> Result<(), UsernameServiceError> {
        self.with_state(|state| match &state.committed {
            Some(committed) if committed == username => {
                state.committed = None;
                Ok(())
            }
            _ => Err(UsernameServiceError::rejected(format!(
                "{username} is not committed to this account"
            ))),
        })
    }
}

impl SessionState for InMemoryUsernameDirectory {
    fn committed_username(&self) -> Option<Username> {
        self.with_state(|state| state.committed.clone())
    }
}
