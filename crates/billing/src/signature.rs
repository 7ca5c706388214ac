//! Stripe webhook signature verification
//!
//! Header format: `t=<timestamp>,v1=<signature>[,v1=<signature>...][,v0=<signature>]`.
//! The signature is hex(HMAC-SHA256(secret, "<timestamp>.<raw body>")), keyed
//! with the full `whsec_...` secret. Several `v1` entries appear while a
//! secret is being rolled; any of them may match.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{BillingError, BillingResult};

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance between the signed timestamp and now
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `stripe-signature` header
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> BillingResult<SignatureHeader<'_>> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => timestamp = value.parse().ok(),
            (Some("v1"), Some(value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        tracing::warn!("Missing or malformed timestamp in stripe-signature header");
        BillingError::SignatureInvalid
    })?;

    if signatures.is_empty() {
        tracing::warn!("Missing v1 signature in stripe-signature header");
        return Err(BillingError::SignatureInvalid);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> BillingResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Config("Invalid webhook secret key".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a header value the way Stripe does, for tests and local tooling
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> BillingResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Check `header` against `payload` at time `now` (unix seconds)
pub fn verify(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> BillingResult<()> {
    let header = parse_header(header)?;

    if now.abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        tracing::warn!(
            timestamp = header.timestamp,
            now = now,
            tolerance_secs = tolerance_secs,
            "Webhook timestamp outside tolerance"
        );
        return Err(BillingError::SignatureInvalid);
    }

    let expected = compute_signature(secret, header.timestamp, payload)?;
    let matched = header
        .signatures
        .iter()
        .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));

    if !matched {
        tracing::warn!("Webhook signature mismatch");
        return Err(BillingError::SignatureInvalid);
    }

    Ok(())
}
