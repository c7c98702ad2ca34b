//! Transaction-scoped external call tracking.
//!
//! Outbound HTTP calls made while serving a unit of work are timed, recorded
//! against that work's transaction id, and flushed incrementally to an
//! attribute sink. Idle transactions are evicted by a background sweeper.

pub mod aggregator;
pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod tracker;

pub use aggregator::{AggregatorStore, CallRecord, FlushPolicy};
pub use backend::{with_transaction, TransactionId};
pub use config::TrackerConfig;
pub use http::AppServer;
pub use lifecycle::Shutdown;
pub use tracker::{CallTracker, ExternalCallMonitor, TrackedClient};
