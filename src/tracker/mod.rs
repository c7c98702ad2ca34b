//! Outbound call tracking.
//!
//! # Data Flow
//! ```text
//! TrackedClient::fetch / CallTracker::track
//!     → backend: current transaction id
//!     → underlying call (awaited; the only suspension point)
//!     → outcome.rs: status / message extracted
//!     → CallRecord → AggregatorStore → FlushPolicy → AttributeSink
//!     → result handed back unchanged
//! ```
//!
//! # State Machine (per call)
//! ```text
//! PENDING → SUCCEEDED | FAILED → RECORDED
//! ```
//!
//! # Design Decisions
//! - Construction errors (`TrackerError`) are loud; telemetry errors are silent
//! - `ExternalCallMonitor` owns the sweeper so embedders control its lifetime

pub mod call;
pub mod client;
pub mod monitor;
pub mod outcome;
pub mod types;

pub use call::CallTracker;
pub use client::{FetchOptions, TrackedClient};
pub use monitor::ExternalCallMonitor;
pub use outcome::{ObservedError, ObservedResponse};
pub use types::{TrackerError, TrackingSettings};
