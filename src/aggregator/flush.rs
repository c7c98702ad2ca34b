//! Incremental flush of call records to an attribute sink.
//!
//! Each record becomes one attribute group under a 1-based positional prefix:
//!
//! ```text
//! externalCall.1.url         = "https://a.test/1"
//! externalCall.1.method      = "GET"
//! externalCall.1.statusCode  = 200
//! externalCall.1.duration    = 50
//! externalCall.1.success     = true
//! externalCall.2.error       = "HTTP 500 Internal Server Error"
//! externalCall.callCount     = 2      (rollups, when enabled)
//! externalCall.totalDuration = 80
//! externalCall.failedCount   = 1
//! ```
//!
//! Delivery is at-most-once: the flush mark advances before the sink sees the
//! batch, so a failing sink loses that batch instead of replaying it.

use crate::aggregator::bucket::TransactionBucket;
use crate::aggregator::record::CallRecord;
use crate::aggregator::store::AggregatorStore;
use crate::backend::{AttributeSink, AttributeValue, Attributes, TelemetryResult, TransactionId};
use crate::observability::metrics;

/// Attribute prefix used by the interceptor path.
pub const EXTERNAL_PREFIX: &str = "external";

/// Attribute prefix used by the client-wrapper path.
pub const EXTERNAL_CALL_PREFIX: &str = "externalCall";

/// Attributes produced by one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushBatch {
    pub attributes: Attributes,
    /// Number of records newly emitted.
    pub records: usize,
}

/// Decides which records are new and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushPolicy {
    prefix: String,
    emit_rollups: bool,
}

impl FlushPolicy {
    pub fn new(prefix: impl Into<String>, emit_rollups: bool) -> Self {
        Self {
            prefix: prefix.into(),
            emit_rollups,
        }
    }

    /// `external.*` groups, no rollups.
    pub fn external() -> Self {
        Self::new(EXTERNAL_PREFIX, false)
    }

    /// `externalCall.*` groups plus rollups.
    pub fn external_call() -> Self {
        Self::new(EXTERNAL_CALL_PREFIX, true)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn emit_rollups(&self) -> bool {
        self.emit_rollups
    }

    /// Build attributes for records not yet flushed and advance the flush mark.
    ///
    /// Returns `None` and leaves the bucket untouched when there is nothing new.
    pub fn drain(&self, bucket: &mut TransactionBucket) -> Option<FlushBatch> {
        let start = bucket.next_unflushed();
        let fresh = bucket.unflushed();
        if fresh.is_empty() {
            return None;
        }

        let mut attributes = Attributes::new();
        for (offset, record) in fresh.iter().enumerate() {
            self.write_group(&mut attributes, start + offset + 1, record);
        }
        let records = fresh.len();

        if self.emit_rollups {
            self.write_rollups(&mut attributes, bucket.calls());
        }

        bucket.mark_flushed();
        Some(FlushBatch { attributes, records })
    }

    /// Append `record` to the bucket for `transaction` and flush what is new.
    ///
    /// The append and the drain happen under one bucket lock; the sink runs
    /// after it is released.
    pub fn record_and_flush(
        &self,
        store: &AggregatorStore,
        transaction: &TransactionId,
        record: CallRecord,
        sink: &dyn AttributeSink,
    ) -> TelemetryResult<usize> {
        let batch = store.with_bucket(Some(transaction), |bucket| {
            bucket.push(record);
            self.drain(bucket)
        });
        deliver(transaction, batch, sink)
    }

    /// Flush the bucket for `transaction` into `sink`.
    ///
    /// Returns the number of records emitted; a missing bucket emits nothing.
    pub fn flush(
        &self,
        store: &AggregatorStore,
        transaction: &TransactionId,
        sink: &dyn AttributeSink,
    ) -> TelemetryResult<usize> {
        let batch = store
            .with_existing_bucket(transaction, |bucket| self.drain(bucket))
            .flatten();
        deliver(transaction, batch, sink)
    }

    fn write_group(&self, attributes: &mut Attributes, position: usize, record: &CallRecord) {
        let key = |field: &str| format!("{}.{}.{}", self.prefix, position, field);
        attributes.insert(key("url"), AttributeValue::from(record.url.as_str()));
        attributes.insert(key("method"), AttributeValue::from(record.method.as_str()));
        attributes.insert(key("statusCode"), AttributeValue::from(record.status_code));
        attributes.insert(key("duration"), AttributeValue::from(record.duration_ms));
        attributes.insert(key("success"), AttributeValue::from(record.success));
        if let Some(error) = &record.error {
            attributes.insert(key("error"), AttributeValue::from(error.as_str()));
        }
    }

    fn write_rollups(&self, attributes: &mut Attributes, calls: &[CallRecord]) {
        let total_duration: u64 = calls
            .iter()
            .map(|c| c.duration_ms)
            .fold(0, u64::saturating_add);
        let failed = calls.iter().filter(|c| !c.success).count();

        let key = |field: &str| format!("{}.{}", self.prefix, field);
        attributes.insert(key("callCount"), AttributeValue::from(calls.len()));
        attributes.insert(key("totalDuration"), AttributeValue::from(total_duration));
        attributes.insert(key("failedCount"), AttributeValue::from(failed));
    }
}

fn deliver(
    transaction: &TransactionId,
    batch: Option<FlushBatch>,
    sink: &dyn AttributeSink,
) -> TelemetryResult<usize> {
    let Some(batch) = batch else {
        return Ok(0);
    };
    sink.add_attributes(transaction, &batch.attributes)?;
    metrics::record_flushed(batch.records);
    Ok(batch.records)
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::external_call()
    }
}
