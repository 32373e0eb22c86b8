//! Webhook signature verification.
//!
//! The gateway signs each delivery with HMAC-SHA256 over
//! `"{timestamp}.{raw_body}"` and sends `t=<unix_ts>,v1=<hex>` in the
//! signature header. Verification checks the timestamp freshness first, then
//! the MAC in constant time.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use hotdesk_core::gateway::GatewayError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Replay-defense window: deliveries older (or newer) than this are rejected.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a signature header against the raw request body.
///
/// `now` is injected so tests can pin the clock.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidSignature`] when the header is malformed or
/// the MAC does not match, and [`GatewayError::StaleTimestamp`] when the
/// timestamp is outside [`TOLERANCE_SECS`].
pub fn verify(
    secret: &str,
    header: &str,
    raw_body: &str,
    now: DateTime<Utc>,
) -> Result<(), GatewayError> {
    let mut timestamp: Option<i64> = None;
    let mut v1: Option<&str> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => v1 = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(GatewayError::InvalidSignature)?;
    let v1 = v1.ok_or(GatewayError::InvalidSignature)?;

    let age_secs = (now.timestamp() - timestamp).abs();
    if age_secs > TOLERANCE_SECS {
        return Err(GatewayError::StaleTimestamp { age_secs });
    }

    let provided = hex::decode(v1).map_err(|_| GatewayError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::InvalidSignature)?;
    mac.update(signed_payload(timestamp, raw_body).as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| GatewayError::InvalidSignature)
}

/// Produce a signature header for a body, as the gateway would.
///
/// Used by tests and by local webhook replay tooling.
#[must_use]
pub fn sign(secret: &str, raw_body: &str, at: DateTime<Utc>) -> String {
    let timestamp = at.timestamp();
    let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_or_else(
        |_| String::new(),
        |mut mac| {
            mac.update(signed_payload(timestamp, raw_body).as_bytes());
            hex::encode(mac.finalize().into_bytes())
        },
    );
    format!("t={timestamp},v1={mac}")
}

fn signed_payload(timestamp: i64, raw_body: &str) -> String {
    format!("{timestamp}.{raw_body}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &str = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn signed_header_verifies() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now);
        assert!(verify(SECRET, &header, BODY, now).is_ok());
    }

    #[test]
    fn tampered_body_rejected() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now);
        let err = verify(SECRET, &header, r#"{"id":"evt_2"}"#, now).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSignature));
    }

    #[test]
    fn wrong_secret_rejected() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now);
        let err = verify("whsec_other", &header, BODY, now).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSignature));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now - Duration::seconds(301));
        let err = verify(SECRET, &header, BODY, now).unwrap_err();
        assert!(matches!(err, GatewayError::StaleTimestamp { age_secs: 301 }));
    }

    #[test]
    fn timestamp_at_window_edge_accepted() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now - Duration::seconds(300));
        assert!(verify(SECRET, &header, BODY, now).is_ok());
    }

    #[test]
    fn future_timestamp_outside_window_rejected() {
        let now = Utc::now();
        let header = sign(SECRET, BODY, now + Duration::seconds(400));
        let err = verify(SECRET, &header, BODY, now).unwrap_err();
        assert!(matches!(err, GatewayError::StaleTimestamp { .. }));
    }

    #[test]
    fn malformed_header_rejected() {
        let now = Utc::now();
        for header in ["", "t=notanumber,v1=aa", "v1=aa", "t=123", "bogus"] {
            assert!(
                matches!(verify(SECRET, header, BODY, now), Err(GatewayError::InvalidSignature)),
                "header {header:?} should be rejected"
            );
        }
    }
}
