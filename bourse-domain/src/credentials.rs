//! Exchange API credentials.
//!
//! # Security Model
//!
//! - Credentials live in memory only and are zeroized on drop
//! - `Debug` output never shows the secret
//! - Parsing is pure; reading the key file is the caller's job

use std::fmt;

use zeroize::Zeroize;

// =============================================================================
// Decrypted Credentials
// =============================================================================

/// API credentials (in-memory only, never persisted).
///
/// This struct contains the plaintext credentials and should:
/// - Never be logged
/// - Never be serialized to disk
/// - Be zeroized when dropped
pub struct ApiCredentials {
    /// API Key (public identifier)
    pub api_key: String,
    /// API Secret (secret key)
    pub api_secret: zeroize::Zeroizing<String>,
}

impl ApiCredentials {
    /// Create new API credentials.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: zeroize::Zeroizing::new(api_secret.into()),
        }
    }

    /// Parse the contents of a key file.
    ///
    /// The first line holds the API key, the second the API secret.
    /// Surrounding whitespace is ignored; further lines are ignored.
    ///
    /// # Errors
    /// Returns `CredentialError::Invalid` if either line is missing or blank.
    pub fn from_key_file(contents: &str) -> Result<Self, CredentialError> {
        let mut lines = contents.lines().map(str::trim);

        let api_key = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| CredentialError::Invalid("missing API key line".to_string()))?;
        let api_secret = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| CredentialError::Invalid("missing API secret line".to_string()))?;

        Ok(Self::new(api_key, api_secret))
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Zeroize for ApiCredentials {
    fn zeroize(&mut self) {
        self.api_key.zeroize();
        self.api_secret.zeroize();
    }
}

impl Drop for ApiCredentials {
    fn drop(&mut self) {
        self.zeroize();
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Credential-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Key file could not be read
    #[error("Cannot read key file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// Invalid credential format
    #[error("Invalid credential: {0}")]
    Invalid(String),
}

// =============================================================================
// Tests
// =============================================================================
