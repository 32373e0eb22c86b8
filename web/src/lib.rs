//! Axum surface for the reconciliation pipeline: reservation endpoints, the
//! gateway webhook endpoint, the bulk catalog resync endpoint, and the
//! supporting configuration and error bridging.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
