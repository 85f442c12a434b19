//! CLI configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{CliError, CliResult};
use bourse_connectors::{DEFAULT_API_URL, REQUEST_TIMEOUT_SECS};
use bourse_domain::{ApiCredentials, CredentialError};
use bourse_exec::{CancelPollConfig, ResponseValidator, RetryPolicy, TransientCodes};
use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Exchange API configuration
    pub api: ApiConfig,

    /// Retry configuration
    pub retry: RetryConfig,

    /// Cancel confirmation polling
    pub cancel: CancelPollConfig,
}

/// Exchange API configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// REST base URL
    pub base_url: String,
    /// File holding the API key and secret
    pub key_file: PathBuf,
    /// Timeout of a single request
    pub request_timeout: Duration,
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for one delay
    pub max_delay: Duration,
    /// Total attempts; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Codes treated as transient on top of the defaults
    pub extra_transient_codes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> CliResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CliResult<Self> {
        let defaults = Self::default();

        let api = ApiConfig {
            base_url: lookup("BOURSE_API_URL").unwrap_or(defaults.api.base_url),
            key_file: lookup("BOURSE_KEY_FILE").map(PathBuf::from).unwrap_or(defaults.api.key_file),
            request_timeout: load_duration(
                &lookup,
                "BOURSE_REQUEST_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.api.request_timeout,
            )?,
        };

        let retry = RetryConfig {
            base_delay: load_duration(
                &lookup,
                "BOURSE_RETRY_BASE_MS",
                Duration::from_millis,
                defaults.retry.base_delay,
            )?,
            max_delay: load_duration(
                &lookup,
                "BOURSE_RETRY_MAX_MS",
                Duration::from_millis,
                defaults.retry.max_delay,
            )?,
            max_attempts: load_optional::<u32>(&lookup, "BOURSE_RETRY_MAX_ATTEMPTS")?,
            extra_transient_codes: lookup("BOURSE_TRANSIENT_CODES")
                .map(|codes| {
                    codes
                        .split(',')
                        .map(str::trim)
                        .filter(|code| !code.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        if retry.max_attempts == Some(0) {
            return Err(CliError::Config(
                "BOURSE_RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let cancel = CancelPollConfig {
            initial_interval: load_duration(
                &lookup,
                "BOURSE_CANCEL_POLL_MS",
                Duration::from_millis,
                defaults.cancel.initial_interval,
            )?,
            max_interval: load_duration(
                &lookup,
                "BOURSE_CANCEL_POLL_MAX_MS",
                Duration::from_millis,
                defaults.cancel.max_interval,
            )?,
            timeout: load_duration(
                &lookup,
                "BOURSE_CANCEL_TIMEOUT_SECS",
                Duration::from_secs,
                defaults.cancel.timeout,
            )?,
        };

        Ok(Self { api, retry, cancel })
    }

    /// Retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(self.retry.base_delay, self.retry.max_delay);
        match self.retry.max_attempts {
            Some(attempts) => policy.with_max_attempts(attempts),
            None => policy,
        }
    }

    /// Response validator with the configured transient codes.
    pub fn validator(&self) -> ResponseValidator {
        let codes = self
            .retry
            .extra_transient_codes
            .iter()
            .fold(TransientCodes::default(), |codes, code| codes.with_code(code.as_str()));
        ResponseValidator::with_classifier(codes)
    }
}

impl Default for Config {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                key_file: PathBuf::from("bourse.key"),
                request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            },
            retry: RetryConfig {
                base_delay: policy.base_delay(),
                max_delay: policy.max_delay(),
                max_attempts: None,
                extra_transient_codes: Vec::new(),
            },
            cancel: CancelPollConfig::default(),
        }
    }
}

fn load_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> CliResult<Option<T>> {
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CliError::Config(format!("Invalid {} value: {}", key, val))),
        None => Ok(None),
    }
}

fn load_duration(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    unit: fn(u64) -> Duration,
    default: Duration,
) -> CliResult<Duration> {
    Ok(load_optional::<u64>(lookup, key)?.map(unit).unwrap_or(default))
}

// =============================================================================
// Credentials
// =============================================================================

/// Read API credentials from `path`.
///
/// A missing file means no credentials: only public endpoints are usable.
pub fn load_credentials(path: &Path) -> CliResult<Option<ApiCredentials>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CredentialError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .into())
        },
    };

    Ok(Some(ApiCredentials::from_key_file(&contents)?))
}

// =============================================================================
// Tests
// =============================================================================
