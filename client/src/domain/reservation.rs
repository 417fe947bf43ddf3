//! Username reservation value objects.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Username;

/// User-facing reservation errors shown by the username editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
pub enum ReservationError {
    /// Something went wrong; the user may retry.
    #[error("something went wrong, please try again")]
    General,
    /// The nickname is shorter than the minimum.
    #[error("nickname has too few characters")]
    NotEnoughCharacters,
    /// The nickname is longer than the maximum.
    #[error("nickname has too many characters")]
    TooManyCharacters,
    /// The nickname contains unsupported characters.
    #[error("nickname may only contain a-z, 0-9, and _")]
    CheckCharacters,
    /// The nickname starts with a digit.
    #[error("nickname cannot start with a number")]
    CheckStartingCharacter,
    /// The username service reports the name as taken.
    #[error("this username is not available")]
    UsernameNotAvailable,
}

/// Opaque server-issued reservation hash.
///
/// Serialised as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReservationHash(Vec<u8>);

/// Error returned when a hex reservation hash cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reservation hash must be non-empty hex: {message}")]
pub struct ReservationHashError {
    message: String,
}

impl ReservationHash {
    /// Wrap raw hash bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for ReservationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReservationHash")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl fmt::Display for ReservationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl From<ReservationHash> for String {
    fn from(value: ReservationHash) -> Self {
        hex::encode(value.0)
    }
}

impl TryFrom<String> for ReservationHash {
    type Error = ReservationHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ReservationHashError {
                message: "empty".to_owned(),
            });
        }
        hex::decode(&value)
            .map(Self)
            .map_err(|err| ReservationHashError {
                message: err.to_string(),
            })
    }
}

/// Input for [`Reservation::new`].
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub username: Username,
    pub previous_username: Option<Username>,
    pub hash: ReservationHash,
    pub expires_at: DateTime<Utc>,
}

/// Server-acknowledged, time-bounded hold on a username.
///
/// The hash lets the service confirm the hold without the nickname being
/// resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    username: Username,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_username: Option<Username>,
    hash: ReservationHash,
    expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Build a reservation from service-issued parts.
    pub fn new(draft: ReservationDraft) -> Self {
        let ReservationDraft {
            username,
            previous_username,
            hash,
            expires_at,
        } = draft;
        Self {
            username,
            previous_username,
            hash,
            expires_at,
        }
    }

    /// Candidate nickname the hold was requested for.
    pub fn nickname(&self) -> &str {
        self.username.nickname()
    }

    /// Server-issued discriminator.
    pub fn discriminator(&self) -> &str {
        self.username.discriminator()
    }

    /// Full reserved username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Username committed when the hold was requested, if any.
    pub fn previous_username(&self) -> Option<&Username> {
        self.previous_username.as_ref()
    }

    /// Opaque hash used to confirm the hold.
    pub fn hash(&self) -> &ReservationHash {
        &self.hash
    }

    /// Instant after which the service drops the hold.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the hold has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
