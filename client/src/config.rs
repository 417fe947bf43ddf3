//! Username reservation configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    NICKNAME_MAX_LENGTH, NICKNAME_MIN_LENGTH, NicknameLimits, NicknameLimitsError,
};

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration values controlling nickname validation and debouncing.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERNAME")]
pub struct UsernameSettings {
    /// Optional override for the minimum nickname length.
    pub min_length: Option<usize>,
    /// Optional override for the maximum nickname length.
    pub max_length: Option<usize>,
    /// Optional override for the reserve debounce delay in milliseconds.
    pub debounce_ms: Option<u64>,
}

impl UsernameSettings {
    /// Return the configured nickname limits, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`NicknameLimitsError`] when the minimum is zero or exceeds the
    /// maximum.
    pub fn nickname_limits(&self) -> Result<NicknameLimits, NicknameLimitsError> {
        NicknameLimits::new(
            self.min_length.unwrap_or(NICKNAME_MIN_LENGTH),
            self.max_length.unwrap_or(NICKNAME_MAX_LENGTH),
        )
    }

    /// Return the configured debounce delay, falling back to the default.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for username configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> UsernameSettings {
        UsernameSettings::load_from_iter([OsString::from("client")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("USERNAME_MIN_LENGTH", None::<String>),
            ("USERNAME_MAX_LENGTH", None::<String>),
            ("USERNAME_DEBOUNCE_MS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.nickname_limits().expect("default limits"),
            NicknameLimits::default()
        );
        assert_eq!(settings.debounce(), Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("USERNAME_MIN_LENGTH", Some("4".to_owned())),
            ("USERNAME_MAX_LENGTH", Some("12".to_owned())),
            ("USERNAME_DEBOUNCE_MS", Some("0".to_owned())),
        ]);

        let settings = load_from_empty_args();
        let limits = settings.nickname_limits().expect("overridden limits");
        assert_eq!(limits.min(), 4);
        assert_eq!(limits.max(), 12);
        assert_eq!(settings.debounce(), Duration::ZERO);
    }

    #[rstest]
    fn inverted_limits_are_rejected() {
        let _guard = lock_env([
            ("USERNAME_MIN_LENGTH", Some("10".to_owned())),
            ("USERNAME_MAX_LENGTH", Some("5".to_owned())),
            ("USERNAME_DEBOUNCE_MS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.nickname_limits(),
            Err(NicknameLimitsError::Inverted { min: 10, max: 5 })
        );
    }
}
