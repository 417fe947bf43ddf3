//! Nickname and username value objects.
//!
//! A [`Nickname`] is the user-chosen part of a username and is validated on
//! the client before any network call. A [`Username`] is the committed,
//! server-assigned form `nickname.discriminator`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ReservationError;

/// Default minimum nickname length in characters.
pub const NICKNAME_MIN_LENGTH: usize = 3;
/// Default maximum nickname length in characters.
pub const NICKNAME_MAX_LENGTH: usize = 32;

/// Minimum number of digits in a discriminator.
const DISCRIMINATOR_MIN_DIGITS: usize = 2;

/// Inclusive character-count bounds applied to nicknames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicknameLimits {
    min: usize,
    max: usize,
}

/// Errors returned when constructing [`NicknameLimits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NicknameLimitsError {
    /// The minimum length must allow at least one character.
    #[error("minimum nickname length must be at least 1")]
    ZeroMinimum,
    /// The minimum length exceeds the maximum length.
    #[error("minimum nickname length {min} exceeds maximum {max}")]
    Inverted { min: usize, max: usize },
}

impl NicknameLimits {
    /// Build limits, rejecting empty or inverted ranges.
    pub fn new(min: usize, max: usize) -> Result<Self, NicknameLimitsError> {
        if min == 0 {
            return Err(NicknameLimitsError::ZeroMinimum);
        }
        if min > max {
            return Err(NicknameLimitsError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Minimum nickname length in characters.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Maximum nickname length in characters.
    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for NicknameLimits {
    fn default() -> Self {
        Self {
            min: NICKNAME_MIN_LENGTH,
            max: NICKNAME_MAX_LENGTH,
        }
    }
}

/// Validation failures for candidate nicknames.
///
/// Variants are listed in the order checks are applied. The too-long check
/// deliberately runs last, after the character rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NicknameValidationError {
    /// No input was given.
    #[error("nickname must not be empty")]
    Empty,
    /// Fewer characters than the configured minimum.
    #[error("nickname must be at least {min} characters")]
    TooShort { min: usize },
    /// A character outside `[0-9a-z_]` was found.
    #[error("nickname may only contain lowercase letters, digits, and underscores")]
    InvalidCharacters,
    /// The first character is a digit.
    #[error("nickname must start with a letter or underscore")]
    InvalidStartingCharacter,
    /// More characters than the configured maximum.
    #[error("nickname must be at most {max} characters")]
    TooLong { max: usize },
}

impl NicknameValidationError {
    /// User-facing reservation error for this failure.
    ///
    /// Empty input is silently ignored, so it has no user-facing error.
    pub fn reservation_error(&self) -> Option<ReservationError> {
        match self {
            Self::Empty => None,
            Self::TooShort { .. } => Some(ReservationError::NotEnoughCharacters),
            Self::InvalidCharacters => Some(ReservationError::CheckCharacters),
            Self::InvalidStartingCharacter => Some(ReservationError::CheckStartingCharacter),
            Self::TooLong { .. } => Some(ReservationError::TooManyCharacters),
        }
    }
}

fn is_nickname_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

fn is_nickname_start(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_'
}

/// Candidate nickname that passed client-side validation.
///
/// Constructed only through [`Nickname::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Validate `raw` against `limits`.
    ///
    /// # Examples
    /// ```
    /// use client::domain::{Nickname, NicknameLimits, NicknameValidationError};
    ///
    /// let limits = NicknameLimits::default();
    /// assert!(Nickname::new("valid_name", limits).is_ok());
    /// assert_eq!(
    ///     Nickname::new("1abc", limits),
    ///     Err(NicknameValidationError::InvalidStartingCharacter)
    /// );
    /// ```
    pub fn new(
        raw: impl Into<String>,
        limits: NicknameLimits,
    ) -> Result<Self, NicknameValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(NicknameValidationError::Empty);
        }

        let length = raw.chars().count();
        if length < limits.min {
            return Err(NicknameValidationError::TooShort { min: limits.min });
        }
        if !raw.chars().all(is_nickname_char) {
            return Err(NicknameValidationError::InvalidCharacters);
        }
        if !raw.chars().next().is_some_and(is_nickname_start) {
            return Err(NicknameValidationError::InvalidStartingCharacter);
        }
        if length > limits.max {
            return Err(NicknameValidationError::TooLong { max: limits.max });
        }

        Ok(Self(raw))
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Errors returned when parsing a committed [`Username`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameParseError {
    /// The `.` separating nickname and discriminator is missing.
    #[error("username must have the form nickname.discriminator")]
    MissingSeparator,
    /// The nickname part is empty.
    #[error("username nickname must not be empty")]
    EmptyNickname,
    /// The discriminator is too short or contains non-digits.
    #[error("username discriminator must be at least two digits")]
    InvalidDiscriminator,
}

/// Committed username of the form `nickname.discriminator`.
///
/// ## Invariants
/// - The nickname part is non-empty.
/// - The discriminator has at least two ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username {
    raw: String,
    separator: usize,
}

impl Username {
    /// Parse a username from its display form.
    pub fn parse(raw: impl Into<String>) -> Result<Self, UsernameParseError> {
        Self::from_owned(raw.into())
    }

    /// Join a validated nickname with a discriminator.
    pub fn from_parts(
        nickname: &Nickname,
        discriminator: &str,
    ) -> Result<Self, UsernameParseError> {
        Self::from_owned(format!("{nickname}.{discriminator}"))
    }

    fn from_owned(raw: String) -> Result<Self, UsernameParseError> {
        let separator = raw
            .rfind('.')
            .ok_or(UsernameParseError::MissingSeparator)?;
        let (nickname, rest) = raw.split_at(separator);
        if nickname.is_empty() {
            return Err(UsernameParseError::EmptyNickname);
        }
        let discriminator = rest.trim_start_matches('.');
        if discriminator.len() < DISCRIMINATOR_MIN_DIGITS
            || !discriminator.chars().all(|c| c.is_ascii_digit())
        {
            return Err(UsernameParseError::InvalidDiscriminator);
        }
        Ok(Self { raw, separator })
    }

    /// Nickname portion before the separator.
    pub fn nickname(&self) -> &str {
        self.raw.split_at(self.separator).0
    }

    /// Discriminator digits after the separator.
    pub fn discriminator(&self) -> &str {
        self.raw.split_at(self.separator).1.trim_start_matches('.')
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.raw.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.raw
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}
