//! In-memory store implementations and recording mocks for the pipeline.
//!
//! Everything here is deterministic and lock-based, suitable for driving the
//! orchestrator, webhook processor, and sync worker in tests without a
//! database or a live gateway. The in-memory payment store enforces the same
//! session-id uniqueness as the `PostgreSQL` store, so idempotency paths are
//! exercised for real.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gateway;
pub mod side_effects;
pub mod stores;

pub use gateway::MockGateway;
pub use side_effects::{MockInvoicer, MockNotifier};
pub use stores::{
    InMemoryBookingStore, InMemoryPaymentStore, InMemorySpaceStore, InMemorySyncJobStore,
};
