//! REST transport for the exchange API.
//!
//! Every call is a `GET {base_url}{path}?{params}`. Private endpoints also
//! carry `apikey` and `nonce` query parameters and an `apisign` header.
//!
//! # Authentication
//!
//! `apisign` is the hex HMAC-SHA512 of the full request URL, keyed with the
//! API secret.
//!
//! # Failures
//!
//! Nothing here returns an error to the caller. Network failures and timeouts
//! become envelopes with code `NO_API_RESPONSE` so the client retries them;
//! anything else becomes a failed envelope with its own code.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode, Url};
use sha2::Sha512;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use bourse_domain::ApiCredentials;
use bourse_exec::{Endpoint, Envelope, ExchangeTransport, Params};

// =============================================================================
// Constants
// =============================================================================

/// Exchange REST API base URL
pub const DEFAULT_API_URL: &str = "https://api.bourse.local/v2";

/// Request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Header carrying the request signature
const SIGNATURE_HEADER: &str = "apisign";

type HmacSha512 = Hmac<Sha512>;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur while performing a request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Failed to build the request signature
    #[error("Failed to build signature: {0}")]
    Signature(String),

    /// Endpoint path does not form a valid URL
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// Private endpoint called without credentials
    #[error("Endpoint {0} requires API credentials")]
    MissingCredentials(&'static str),

    /// Request could not be sent or the connection dropped
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Non-success status without a readable envelope
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Body is not a response envelope
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl TransportError {
    /// Code reported in the failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::RequestFailed(_) | TransportError::Timeout => "NO_API_RESPONSE",
            TransportError::Signature(_) => "SIGNATURE_FAILED",
            TransportError::InvalidUrl(_) => "INVALID_URL",
            TransportError::MissingCredentials(_) => "APIKEY_NOT_PROVIDED",
            TransportError::Status { .. } => "HTTP_ERROR",
            TransportError::Parse(_) => "INVALID_RESPONSE",
        }
    }

    fn into_envelope(self) -> Envelope {
        Envelope {
            success: false,
            result: None,
            message: Some(self.to_string()),
            code: Some(self.code().to_string()),
        }
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Exchange transport over HTTPS.
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    base_url: String,
    request_timeout: Duration,
    /// Absent for public-only access
    credentials: Option<ApiCredentials>,
}

impl HttpTransport {
    /// Transport limited to public market-data endpoints.
    pub fn public(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            credentials: None,
        }
    }

    /// Transport signing private requests with `credentials`.
    pub fn authenticated(base_url: impl Into<String>, credentials: ApiCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::public(base_url)
        }
    }

    /// Build from optional credentials.
    pub fn new(base_url: impl Into<String>, credentials: Option<ApiCredentials>) -> Self {
        match credentials {
            Some(credentials) => Self::authenticated(base_url, credentials),
            None => Self::public(base_url),
        }
    }

    /// Use a custom request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request URL, adding `apikey` and `nonce` for private endpoints.
    fn build_url(&self, endpoint: Endpoint, params: &Params) -> Result<Url, TransportError> {
        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        let nonce = Utc::now().timestamp_millis().to_string();

        if endpoint.requires_auth() {
            let credentials = self
                .credentials
                .as_ref()
                .ok_or(TransportError::MissingCredentials(endpoint.name()))?;
            pairs.push(("apikey", credentials.api_key.as_str()));
            pairs.push(("nonce", nonce.as_str()));
        }
        pairs.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let url = format!("{}{}", self.base_url, endpoint.path());
        Url::parse_with_params(&url, &pairs).map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    async fn send(&self, endpoint: Endpoint, params: &Params) -> Result<Envelope, TransportError> {
        let url = self.build_url(endpoint, params)?;

        let mut request = self.client.get(url.clone());
        if endpoint.requires_auth() {
            if let Some(credentials) = &self.credentials {
                let signature = sign(&credentials.api_secret, url.as_str())?;
                request = request.header(SIGNATURE_HEADER, signature);
            }
        }

        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        parse_envelope(status, &body)
    }
}

#[async_trait]
impl ExchangeTransport for HttpTransport {
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Envelope {
        debug!(%endpoint, "Calling exchange");

        match self.send(endpoint, params).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(%endpoint, error = %e, "Exchange call failed");
                e.into_envelope()
            },
        }
    }

    fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Hex HMAC-SHA512 of `payload`.
fn sign(secret: &str, payload: &str) -> Result<String, TransportError> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| TransportError::Signature(format!("HMAC error: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Read a response body as an envelope.
///
/// Error statuses still carry an envelope when the exchange sent one.
fn parse_envelope(status: StatusCode, body: &str) -> Result<Envelope, TransportError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(TransportError::Status {
            status,
            body: body.chars().take(200).collect(),
        }),
        Err(e) => Err(TransportError::Parse(e.to_string())),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_exec::{ExecError, ResponseValidator};

    fn authenticated() -> HttpTransport {
        HttpTransport::authenticated(
            "https://api.example.test/v2/",
            ApiCredentials::new("test_key", "test_secret"),
        )
    }

    #[test]
    fn test_sign_matches_hmac_sha512_vector() {
        let signature = sign("Jefe", "what do ya want for nothing?").unwrap();

        assert_eq!(
            signature,
            concat!(
                "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554",
                "9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737",
            )
        );
    }

    #[test]
    fn test_private_url_carries_key_and_nonce() {
        let transport = authenticated();
        let params = [("market", "BTC-ETH".to_string())];

        let url = transport.build_url(Endpoint::OpenOrders, &params).unwrap();
        let query = url.query().unwrap();

        assert!(url.as_str().starts_with("https://api.example.test/v2/market/getopenorders?"));
        assert!(query.starts_with("apikey=test_key&nonce="));
        assert!(query.ends_with("market=BTC-ETH"));
    }

    #[test]
    fn test_public_url_has_no_key() {
        let transport = HttpTransport::public("https://api.example.test/v2");
        let params = [("market", "BTC-ETH".to_string()), ("interval", "hour".to_string())];

        let url = transport.build_url(Endpoint::Candles, &params).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.test/v2/pub/market/getticks?market=BTC-ETH&interval=hour"
        );
    }

    #[test]
    fn test_private_endpoint_without_credentials() {
        let transport = HttpTransport::public("https://api.example.test/v2");

        let err = transport.build_url(Endpoint::Balances, &[]).unwrap_err();

        assert!(matches!(err, TransportError::MissingCredentials("balances")));
        assert_eq!(err.code(), "APIKEY_NOT_PROVIDED");
    }

    #[test]
    fn test_parse_envelope() {
        let envelope = parse_envelope(
            StatusCode::OK,
            r#"{"success": true, "message": "", "result": {"order_id": "abc"}}"#,
        )
        .unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.result.unwrap()["order_id"], "abc");

        // Error status with a readable envelope keeps the exchange's message
        let envelope = parse_envelope(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "message": "INSUFFICIENT_FUNDS"}"#,
        )
        .unwrap();
        assert_eq!(envelope.message.as_deref(), Some("INSUFFICIENT_FUNDS"));

        let err = parse_envelope(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.code(), "HTTP_ERROR");

        let err = parse_envelope(StatusCode::OK, "not json").unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_network_failures_are_retryable() {
        let validator = ResponseValidator::new();

        let failures = [
            TransportError::Timeout,
            TransportError::RequestFailed("refused".to_string()),
        ];
        for error in failures {
            let err = validator.validate(error.into_envelope(), None).unwrap_err();
            assert!(err.is_retryable());
            assert_eq!(err.code(), Some("NO_API_RESPONSE"));
        }

        let err = validator
            .validate(TransportError::Parse("eof".to_string()).into_envelope(), None)
            .unwrap_err();
        assert!(matches!(err, ExecError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_no_api_response() {
        let transport =
            HttpTransport::public("http://127.0.0.1:9").with_timeout(Duration::from_secs(2));

        let envelope = transport
            .call(Endpoint::LatestTick, &[("market", "BTC-ETH".to_string())])
            .await;

        assert!(!envelope.success);
        assert_eq!(envelope.code.as_deref(), Some("NO_API_RESPONSE"));
    }

    #[test]
    fn test_is_authenticated() {
        assert!(authenticated().is_authenticated());
        assert!(!HttpTransport::new("https://api.example.test", None).is_authenticated());
    }
}
