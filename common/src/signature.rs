// Inbound request signature verification
//
// Slack signs every request with HMAC-SHA256 over "v0:{timestamp}:{body}"
// keyed by the app's signing secret and sends the result as "v0=<hex>".

use crate::errors::AuthError;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
pub const SIGNATURE_VERSION: &str = "v0";

/// Maximum allowed distance between the request timestamp and now
pub const DEFAULT_FRESHNESS_WINDOW_SECONDS: i64 = 5 * 60;

/// Verifies that inbound requests were signed with the shared secret
#[derive(Clone)]
pub struct RequestAuthenticator {
    secret: Vec<u8>,
    freshness_window: Duration,
}

impl std::fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("secret", &"<redacted>")
            .field("freshness_window", &self.freshness_window)
            .finish()
    }
}

impl RequestAuthenticator {
    /// Create an authenticator with the default five minute freshness window
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            freshness_window: Duration::seconds(DEFAULT_FRESHNESS_WINDOW_SECONDS),
        }
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// Verify a request against the current clock
    ///
    /// # Arguments
    /// * `body` - The raw, unparsed request body
    /// * `timestamp` - Value of the `X-Slack-Request-Timestamp` header
    /// * `signature` - Value of the `X-Slack-Signature` header
    pub fn verify(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), AuthError> {
        self.verify_at(body, timestamp, signature, Utc::now())
    }

    /// Verify a request against an explicit "now"
    pub fn verify_at(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let timestamp = timestamp
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingHeader(SIGNATURE_HEADER))?;

        // Freshness is checked first and regardless of the signature
        let seconds: i64 = timestamp
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp(timestamp.to_string()))?;
        let skew_seconds = now.timestamp().saturating_sub(seconds);
        if skew_seconds.saturating_abs() > self.freshness_window.num_seconds() {
            return Err(AuthError::StaleTimestamp { skew_seconds });
        }

        let provided = decode_signature(signature)?;

        let mac = self.keyed_mac(timestamp, body)?;
        mac.verify_slice(&provided)
            .map_err(|_| AuthError::InvalidSignature)
    }

    /// Produce the header value for a request body.
    ///
    /// Used by tests and tooling that need to craft signed requests.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, AuthError> {
        let mac = self.keyed_mac(timestamp, body)?;
        Ok(format!(
            "{}={}",
            SIGNATURE_VERSION,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn keyed_mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}

fn decode_signature(signature: &str) -> Result<Vec<u8>, AuthError> {
    let hex_part = signature
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| AuthError::MalformedSignature("unsupported signature version".to_string()))?;

    hex::decode(hex_part).map_err(|e| AuthError::MalformedSignature(e.to_string()))
}

/// Constant-time equality for shared tokens such as the CloudFront origin header
pub fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
