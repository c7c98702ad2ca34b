//! Transaction-scoped external-call aggregator.
//!
//! # Data Flow
//! ```text
//! Tracked call settles
//!     → record.rs (CallRecord built from outcome)
//!     → store.rs (bucket for transaction, created on first use)
//!     → bucket.rs (append in settle order, refresh last access)
//!     → flush.rs (emit records newer than last flush mark)
//!
//! Timer (sweeper.rs):
//!     every SWEEP_INTERVAL → store.evict_stale() → idle buckets dropped
//! ```
//!
//! # Design Decisions
//! - All aggregator operations are synchronous; nothing awaits while a
//!   bucket is held
//! - Flush is at-most-once per record
//! - Eviction is purely time based; there is no end-of-transaction signal

pub mod bucket;
pub mod clock;
pub mod flush;
pub mod record;
pub mod store;
pub mod sweeper;

pub use bucket::TransactionBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use flush::{FlushBatch, FlushPolicy, EXTERNAL_CALL_PREFIX, EXTERNAL_PREFIX};
pub use record::CallRecord;
pub use store::{AggregatorStore, StoreSummary, BUCKET_TTL};
pub use sweeper::{Sweeper, SweeperHandle, SWEEP_INTERVAL};
