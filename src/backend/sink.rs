//! Attribute sink implementations.

use dashmap::DashMap;
use std::sync::Arc;

use crate::backend::types::{Attributes, TelemetryResult, TransactionId};
use crate::backend::AttributeSink;

/// Emits attributes as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AttributeSink for LogSink {
    fn add_attributes(
        &self,
        transaction: &TransactionId,
        attributes: &Attributes,
    ) -> TelemetryResult<()> {
        for (key, value) in attributes {
            tracing::info!(
                target: "call_tracker::attributes",
                transaction = %transaction,
                key = %key,
                value = %value,
                "Transaction attribute"
            );
        }
        Ok(())
    }
}

/// Keeps the latest value of each attribute per transaction in memory.
///
/// Later writes to the same key overwrite earlier ones, matching how the
/// backend treats rollups.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<DashMap<TransactionId, Attributes>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded for `transaction`.
    pub fn attributes(&self, transaction: &TransactionId) -> Attributes {
        self.inner
            .get(transaction)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Number of transactions with at least one attribute.
    pub fn transaction_count(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl AttributeSink for MemorySink {
    fn add_attributes(
        &self,
        transaction: &TransactionId,
        attributes: &Attributes,
    ) -> TelemetryResult<()> {
        let mut entry = self.inner.entry(transaction.clone()).or_default();
        for (key, value) in attributes {
            entry.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
