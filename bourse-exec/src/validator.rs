//! Response validation and failure classification.
//!
//! Turns an [`Envelope`] into its payload or into a classified [`ExecError`].
//! Which failures count as transient is decided by an injected
//! [`TransientClassifier`]; everything it does not accept is fatal.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::{ExecError, ExecResult, NO_MESSAGE};
use crate::ports::Envelope;

/// Codes treated as transient when nothing else is configured.
pub const DEFAULT_TRANSIENT_CODES: &[&str] = &["NO_API_RESPONSE", "APIKEY_INVALID"];

// =============================================================================
// Classifier
// =============================================================================

/// Decides whether an exchange failure code is transient.
pub trait TransientClassifier: Send + Sync {
    /// `true` if a call that failed with `code` may succeed when retried.
    fn is_transient(&self, code: &str) -> bool;
}

impl<F> TransientClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_transient(&self, code: &str) -> bool {
        self(code)
    }
}

/// Closed set of transient codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientCodes {
    codes: HashSet<String>,
}

impl TransientCodes {
    /// Set containing exactly `codes`.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add one more transient code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.codes.insert(code.into());
        self
    }

    /// Whether `code` is in the set.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

impl Default for TransientCodes {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_CODES.iter().copied())
    }
}

impl TransientClassifier for TransientCodes {
    fn is_transient(&self, code: &str) -> bool {
        self.contains(code)
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates exchange responses.
#[derive(Clone)]
pub struct ResponseValidator {
    classifier: Arc<dyn TransientClassifier>,
}

impl ResponseValidator {
    /// Validator using the default transient codes.
    pub fn new() -> Self {
        Self::with_classifier(TransientCodes::default())
    }

    /// Validator using a custom classifier.
    pub fn with_classifier(classifier: impl TransientClassifier + 'static) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }

    /// Return the payload of a successful envelope, or classify the failure.
    ///
    /// `context` describes the operation; when present the failure is logged
    /// as `"{context}: {message}"`.
    pub fn validate(&self, envelope: Envelope, context: Option<&str>) -> ExecResult<Option<Value>> {
        if envelope.success {
            return Ok(envelope.result);
        }

        let message = envelope.message.or_else(|| envelope.code.clone());

        if let Some(context) = context {
            warn!("{}: {}", context, message.as_deref().unwrap_or(NO_MESSAGE));
        }

        match message {
            Some(message) if self.is_transient(&message, envelope.code.as_deref()) => {
                let code = match envelope.code {
                    Some(code) if self.classifier.is_transient(&code) => code,
                    _ => message.clone(),
                };
                Err(ExecError::Retryable { code, message })
            },
            Some(message) => Err(ExecError::Fatal {
                code: envelope.code.or_else(|| Some(message.clone())),
                message,
            }),
            None => Err(ExecError::Fatal {
                code: None,
                message: NO_MESSAGE.to_string(),
            }),
        }
    }

    fn is_transient(&self, message: &str, code: Option<&str>) -> bool {
        self.classifier.is_transient(message)
            || code.is_some_and(|c| self.classifier.is_transient(c))
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidator").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
