//! Domain primitives, state machine, and the reservation coordinator.
//!
//! Purpose: Model nickname validation, server-issued reservations, and the
//! modal workflow that turns a typed nickname into a committed username.
//! Transport and UI concerns stay behind the traits in [`ports`].
//!
//! Public surface:
//! - Nickname / Username: validated user-chosen names.
//! - Reservation: a time-bounded hold returned by the username service.
//! - ReservationState: the modal state machine and its read model.
//! - UsernameReservationCoordinator: sequences reserve, confirm, and delete.

pub mod ports;
pub mod reservation;
pub mod reservation_state;
pub mod username;
pub mod username_reservation;

pub use self::reservation::{
    Reservation, ReservationDraft, ReservationError, ReservationHash, ReservationHashError,
};
pub use self::reservation_state::{
    AttemptId, AttemptResolution, ReservationAttempt, ReservationSnapshot, ReservationState,
    ReservationStatus, TransitionRefusal, UsernameEditState,
};
pub use self::username::{
    NICKNAME_MAX_LENGTH, NICKNAME_MIN_LENGTH, Nickname, NicknameLimits, NicknameLimitsError,
    NicknameValidationError, Username, UsernameParseError,
};
pub use self::username_reservation::{
    ConfirmOutcome, DebounceSleeper, DeleteOutcome, DismissOutcome, ReserveOutcome,
    TokioSleeper, UsernameReservationCoordinator, UsernameReservationPorts,
    UsernameReservationRuntime,
};
