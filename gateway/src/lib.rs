//! Payment-gateway integration: HTTP client for checkout sessions and the
//! product/price catalog, plus webhook signature verification.
//!
//! The gateway speaks a Stripe-shaped JSON API. Signature verification
//! implements the `t=<unix_ts>,v1=<hex_hmac_sha256>` scheme over
//! `timestamp.rawBody` with a pre-shared per-environment secret and a 300 s
//! replay window.

pub mod client;
pub mod signature;
pub mod wire;

pub use client::{HttpGateway, HttpGatewayConfig};
pub use signature::{sign, verify, TOLERANCE_SECS};
