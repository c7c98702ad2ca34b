//! Tracing backend boundary.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → context.rs (task-local transaction scope)
//!
//! Tracked outbound call settles
//!     → TracingBackend::current_transaction_id
//!     → TracingBackend::start_external_segment / notice_error (best effort)
//!     → AttributeSink::add_attributes (flushed records, rollups)
//! ```
//!
//! # Design Decisions
//! - Every backend call returns a `TelemetryResult`; the tracker decides what
//!   to ignore, not the backend
//! - The sink receives the transaction id explicitly instead of relying on
//!   ambient context, so it can be called outside the request task
//! - Sinks must not block; they run on the caller's task

pub mod context;
pub mod segment;
pub mod sink;
pub mod types;

pub use context::{current_transaction, with_transaction, TaskLocalBackend};
pub use segment::{ExternalSegment, SegmentHandle};
pub use sink::{LogSink, MemorySink};
pub use types::{AttributeValue, Attributes, TelemetryError, TelemetryResult, TransactionId};

/// Transaction/segment API of the tracing backend.
pub trait TracingBackend: Send + Sync {
    /// The transaction the caller is currently serving, if any.
    fn current_transaction_id(&self) -> Option<TransactionId>;

    /// Open an external segment for a finished call.
    fn start_external_segment(&self, segment: &ExternalSegment) -> TelemetryResult<SegmentHandle>;

    /// Report a failed call.
    fn notice_error(&self, message: &str) -> TelemetryResult<()>;
}

/// Receiver of per-transaction attributes.
pub trait AttributeSink: Send + Sync {
    fn add_attributes(
        &self,
        transaction: &TransactionId,
        attributes: &Attributes,
    ) -> TelemetryResult<()>;
}
