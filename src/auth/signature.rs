//! HMAC-SHA256 service request signing and verification.
//!
//! A signed request carries three headers: the caller's service id, the unix
//! timestamp it was signed at, and a lowercase-hex HMAC-SHA256 over the
//! signing string
//!
//! ```text
//! <METHOD>\n<PATH>\n<RAW-TIMESTAMP>\n<HEX-SHA256-OF-BODY>
//! ```
//!
//! keyed with a secret shared between caller and callee.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::clock::{SystemTimeSource, TimeSource};
use super::replay::ReplayCache;
use super::verify::{AuthRequest, Principal, RequestVerifier};
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const SERVICE_ID_HEADER: &str = "X-Service-Id";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Signature";

pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 300;
pub const DEFAULT_REPLAY_WINDOW_SECS: u64 = 300;

/// Hex-encoded SHA-256 of the raw body bytes.
pub fn body_digest_hex(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Build the canonical signing string. Field order is fixed.
pub fn signing_string(
    method: &str,
    path: &str,
    timestamp_raw: &str,
    body_digest: &str,
) -> String {
    format!("{}\n{}\n{}\n{}", method, path, timestamp_raw, body_digest)
}

/// Compute the lowercase-hex signature a caller must send for a request.
pub fn sign_request(
    secret: &[u8],
    method: &str,
    path: &str,
    timestamp_raw: &str,
    body: &[u8],
) -> String {
    let message = signing_string(method, path, timestamp_raw, &body_digest_hex(body));
    hmac_hex(secret, message.as_bytes())
}

fn hmac_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Header values for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub service_id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignedHeaders {
    pub fn new(
        service_id: &str,
        secret: &[u8],
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: i64,
    ) -> Self {
        let timestamp = timestamp.to_string();
        let signature = sign_request(secret, method, path, &timestamp, body);
        Self {
            service_id: service_id.to_string(),
            timestamp,
            signature,
        }
    }

    /// `(header name, value)` pairs in a fixed order.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (SERVICE_ID_HEADER, self.service_id.as_str()),
            (TIMESTAMP_HEADER, self.timestamp.as_str()),
            (SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}

/// Per-request signing inputs extracted from headers and body.
#[derive(Debug, Clone)]
pub struct SigningContext<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Timestamp exactly as sent; this form is what gets signed.
    pub timestamp_raw: &'a str,
    pub timestamp: i64,
    pub body_digest: String,
    pub service_id: &'a str,
    pub signature: &'a str,
}

impl<'a> SigningContext<'a> {
    /// Read the signature headers and parse the timestamp.
    ///
    /// Every missing header is reported, not just the first.
    pub fn from_request(request: &AuthRequest<'a>) -> Result<Self, AuthError> {
        let service_id = request.header(SERVICE_ID_HEADER);
        let timestamp_raw = request.header(TIMESTAMP_HEADER);
        let signature = request.header(SIGNATURE_HEADER);

        let (service_id, timestamp_raw, signature) = match (service_id, timestamp_raw, signature)
        {
            (Some(id), Some(ts), Some(sig)) => (id, ts, sig),
            (id, ts, sig) => {
                let missing = [
                    (SERVICE_ID_HEADER, id.is_none()),
                    (TIMESTAMP_HEADER, ts.is_none()),
                    (SIGNATURE_HEADER, sig.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(AuthError::MissingHeader(missing));
            }
        };

        let timestamp = timestamp_raw
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidTimestamp)?;

        Ok(Self {
            method: request.method.as_str(),
            path: request.path,
            timestamp_raw,
            timestamp,
            body_digest: body_digest_hex(request.body),
            service_id,
            signature,
        })
    }

    pub fn signing_string(&self) -> String {
        signing_string(self.method, self.path, self.timestamp_raw, &self.body_digest)
    }

    /// Key under which an accepted request is remembered for replay suppression.
    pub fn replay_key(&self) -> String {
        format!("{}:{}:{}", self.service_id, self.timestamp_raw, self.signature)
    }
}

/// Verifier for HMAC-signed service-to-service requests.
pub struct SignatureVerifier {
    /// Name of the secret source, used in diagnostics.
    secret_name: String,
    secret: Option<Vec<u8>>,
    replay_cache: Arc<ReplayCache>,
    clock_skew_secs: u64,
    replay_window: Duration,
    time_source: Arc<dyn TimeSource>,
}

impl SignatureVerifier {
    /// Create a verifier. `secret` of `None` (or empty) leaves the verifier
    /// misconfigured: every request then fails with [`AuthError::MissingSecret`].
    pub fn new(
        secret_name: impl Into<String>,
        secret: Option<Vec<u8>>,
        replay_cache: Arc<ReplayCache>,
    ) -> Self {
        Self {
            secret_name: secret_name.into(),
            secret: secret.filter(|s| !s.is_empty()),
            replay_cache,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            replay_window: Duration::from_secs(DEFAULT_REPLAY_WINDOW_SECS),
            time_source: Arc::new(SystemTimeSource),
        }
    }

    pub fn with_clock_skew(mut self, seconds: u64) -> Self {
        self.clock_skew_secs = seconds;
        self
    }

    pub fn with_replay_window(mut self, seconds: u64) -> Self {
        self.replay_window = Duration::from_secs(seconds);
        self
    }

    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a signed request.
    ///
    /// Checks, in order:
    /// 1. All three signature headers are present
    /// 2. Timestamp parses and is within the clock skew window (inclusive)
    /// 3. A server secret is configured
    /// 4. Signature matches, compared in constant time
    /// 5. The (service id, timestamp, signature) triple has not been seen
    ///    within the replay window
    pub fn verify_signed(&self, request: &AuthRequest<'_>) -> Result<String, AuthError> {
        let ctx = SigningContext::from_request(request)?;

        let now = self.time_source.now();
        if now.abs_diff(ctx.timestamp) > self.clock_skew_secs {
            return Err(AuthError::ClockSkewExceeded);
        }

        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AuthError::MissingSecret(self.secret_name.clone()))?;

        let expected = hmac_hex(secret, ctx.signing_string().as_bytes());

        if !bool::from(ctx.signature.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AuthError::InvalidSignature);
        }

        if !self
            .replay_cache
            .check_and_store(&ctx.replay_key(), self.replay_window)
        {
            tracing::warn!(
                service_id = %ctx.service_id,
                timestamp = ctx.timestamp,
                "Replayed service request"
            );
            return Err(AuthError::ReplayDetected);
        }

        tracing::debug!(service_id = %ctx.service_id, "Service request authenticated");
        Ok(ctx.service_id.to_string())
    }
}

impl RequestVerifier for SignatureVerifier {
    fn verify(&self, request: &AuthRequest<'_>) -> Result<Principal, AuthError> {
        self.verify_signed(request).map(Principal::Service)
    }

    fn requires_body(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret_name", &self.secret_name)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("replay_window", &self.replay_window)
            .finish()
    }
}
