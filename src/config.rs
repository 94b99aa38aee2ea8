use thiserror::Error;

use crate::constants::{DEFAULT_ORIGIN, TESTRAIL_TOKEN_ENV, TESTRAIL_URL_ENV, TESTRAIL_USERNAME_ENV};
use crate::utils::from_non_empty_or_default;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Need to set {0} and {1}")]
    MissingCredentials(&'static str, &'static str),
    #[error("Must set --{0} to a non-zero integer")]
    ZeroValue(&'static str),
    #[error("--{0} must be at least 1")]
    ZeroAttempts(&'static str),
    #[error("No input report files provided")]
    NoInputFiles,
}

/// Process-wide settings, resolved once at startup and passed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub username: String,
    pub token: String,
    pub api_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let (Some(username), Some(token)) =
            (non_empty(TESTRAIL_USERNAME_ENV), non_empty(TESTRAIL_TOKEN_ENV))
        else {
            return Err(ConfigError::MissingCredentials(
                TESTRAIL_USERNAME_ENV,
                TESTRAIL_TOKEN_ENV,
            ));
        };

        let api_address = from_non_empty_or_default(
            lookup(TESTRAIL_URL_ENV),
            DEFAULT_ORIGIN.to_string(),
            |s| s.trim().trim_end_matches('/').to_string(),
        );

        Ok(Self {
            username,
            token,
            api_address,
        })
    }
}
