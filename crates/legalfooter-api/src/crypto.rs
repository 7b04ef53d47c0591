//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. Every `v1` entry is an
//! HMAC-SHA256 of `"{t}." ++ body` keyed by the endpoint's signing secret.
//! Several `v1` entries appear while a secret is being rolled; one match is
//! enough.

use std::{fmt, sync::Arc, time::Duration};

use hmac::{Hmac, Mac};
use legalfooter_core::{Clock, StripeEvent, WebhookError};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default maximum age of a signed timestamp.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

const TIMESTAMP_KEY: &str = "t";
const SIGNATURE_SCHEME: &str = "v1";

/// Signature verification errors.
///
/// Display strings are returned to the caller in 400 responses and never
/// contain the secret or the expected signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header absent or empty.
    #[error("No signature header value was provided")]
    MissingSignature,

    /// Header present but missing a timestamp or `v1` entry.
    #[error("Unable to extract timestamp and signatures from header: {0}")]
    InvalidFormat(String),

    /// No `v1` entry matched the expected signature.
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    /// Signature matched but the timestamp is older than the tolerance.
    #[error("Timestamp outside the tolerance zone ({age_seconds}s old, tolerance {tolerance_seconds}s)")]
    TimestampOutsideTolerance {
        /// Age of the signed timestamp
        age_seconds: i64,
        /// Configured tolerance
        tolerance_seconds: u64,
    },

    /// Signing secret is unusable.
    #[error("Webhook signing secret is empty")]
    InvalidSecret,
}

/// Verifies signed webhook payloads and turns them into events.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"***")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// Creates a verifier for the given signing secret.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::InvalidSecret` if the secret is empty.
    pub fn new(secret: impl Into<String>, clock: Arc<dyn Clock>) -> Result<Self, SignatureError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(SignatureError::InvalidSecret);
        }

        Ok(Self { secret, tolerance: DEFAULT_TOLERANCE, clock })
    }

    /// Sets the timestamp tolerance. Zero disables the age check.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Configured timestamp tolerance.
    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Checks that `header` carries a valid signature for `payload`.
    ///
    /// Future timestamps are accepted; only stale ones are rejected.
    ///
    /// # Errors
    ///
    /// Returns the first `SignatureError` encountered.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let header = header.map(str::trim).filter(|h| !h.is_empty());
        let parsed = parse_header(header.ok_or(SignatureError::MissingSignature)?)?;

        let mac = keyed_mac(&self.secret, parsed.timestamp, payload)?;
        let matched = parsed
            .signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

        if !matched {
            return Err(SignatureError::NoMatchingSignature);
        }

        if !self.tolerance.is_zero() {
            let age_seconds = self.clock.unix_timestamp().saturating_sub(parsed.timestamp);
            let tolerance_seconds = self.tolerance.as_secs();
            if age_seconds > i64::try_from(tolerance_seconds).unwrap_or(i64::MAX) {
                return Err(SignatureError::TimestampOutsideTolerance {
                    age_seconds,
                    tolerance_seconds,
                });
            }
        }

        Ok(())
    }

    /// Verifies the payload and parses it as an event.
    ///
    /// A body that is correctly signed but is not an event envelope is also
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Verification` on any signature or parse failure.
    pub fn construct_event(
        &self,
        payload: &[u8],
        header: Option<&str>,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify(payload, header)?;

        StripeEvent::from_slice(payload).map_err(|e| WebhookError::Verification {
            reason: format!("Invalid payload: {e}"),
        })
    }
}

impl From<SignatureError> for WebhookError {
    fn from(err: SignatureError) -> Self {
        Self::Verification { reason: err.to_string() }
    }
}

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    let mut saw_scheme = false;

    for item in header.split(',') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };

        match key.trim() {
            TIMESTAMP_KEY => {
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    SignatureError::InvalidFormat(format!("timestamp is not an integer: {value}"))
                })?;
                timestamp = Some(parsed);
            },
            SIGNATURE_SCHEME => {
                saw_scheme = true;
                // Undecodable entries can never match.
                if let Ok(bytes) = hex::decode(value.trim()) {
                    signatures.push(bytes);
                }
            },
            _ => {},
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| SignatureError::InvalidFormat("no timestamp".to_string()))?;
    if !saw_scheme {
        return Err(SignatureError::InvalidFormat("no v1 signature".to_string()));
    }

    Ok(ParsedHeader { timestamp, signatures })
}

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Computes the hex `v1` signature for `payload` signed at `timestamp`.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is rejected by the
/// MAC.
pub fn compute_signature(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a complete `Stripe-Signature` header value.
///
/// Used to sign test deliveries the same way the processor does.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is rejected by the
/// MAC.
pub fn signature_header(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, SignatureError> {
    Ok(format!("t={timestamp},v1={}", compute_signature(payload, secret, timestamp)?))
}
