//! Transaction-keyed bucket store.
//!
//! # Responsibilities
//! - Own the map of transaction id to bucket
//! - Create buckets lazily and refresh their last-access time
//! - Delete single buckets, all buckets, or idle buckets
//!
//! # Design Decisions
//! - DashMap shard locks are the only synchronization; closures passed to
//!   [`AggregatorStore::with_bucket`] run under the shard lock and must not
//!   call back into the store
//! - Calls without a transaction operate on a throwaway bucket so call sites
//!   never branch on absence

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::bucket::TransactionBucket;
use crate::aggregator::clock::Clock;
use crate::aggregator::record::CallRecord;
use crate::backend::TransactionId;

/// Maximum inactivity before a bucket is evicted.
pub const BUCKET_TTL: Duration = Duration::from_secs(5 * 60);

/// Point-in-time counts over all live buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub buckets: usize,
    pub calls: usize,
    pub unflushed: usize,
}

/// Map of transaction id to [`TransactionBucket`].
pub struct AggregatorStore {
    buckets: DashMap<TransactionId, TransactionBucket>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl AggregatorStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
            ttl: BUCKET_TTL,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run `f` against the bucket for `transaction`, creating it if needed.
    ///
    /// The bucket's last-access time is refreshed first. With no transaction,
    /// `f` gets an empty bucket that is discarded afterwards.
    pub fn with_bucket<R>(
        &self,
        transaction: Option<&TransactionId>,
        f: impl FnOnce(&mut TransactionBucket) -> R,
    ) -> R {
        let now = self.clock.now();
        let Some(id) = transaction else {
            let mut detached = TransactionBucket::new(now);
            return f(&mut detached);
        };

        let mut bucket = match self.buckets.entry(id.clone()) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                tracing::trace!(transaction = %id, "Creating transaction bucket");
                vacant.insert(TransactionBucket::new(now))
            }
        };
        bucket.touch(now);
        f(bucket.value_mut())
    }

    /// Run `f` against an existing bucket. Returns `None` if there is none.
    pub fn with_existing_bucket<R>(
        &self,
        transaction: &TransactionId,
        f: impl FnOnce(&mut TransactionBucket) -> R,
    ) -> Option<R> {
        let now = self.clock.now();
        let mut bucket = self.buckets.get_mut(transaction)?;
        bucket.touch(now);
        Some(f(bucket.value_mut()))
    }

    /// Ensure a bucket exists for `transaction` without recording a call.
    pub fn touch(&self, transaction: &TransactionId) {
        self.with_bucket(Some(transaction), |_| ());
    }

    /// Append a record to the bucket for `transaction`.
    pub fn append(&self, transaction: Option<&TransactionId>, record: CallRecord) {
        self.with_bucket(transaction, |bucket| bucket.push(record));
    }

    /// Snapshot of the records held for `transaction`, in settle order.
    pub fn calls(&self, transaction: &TransactionId) -> Option<Vec<CallRecord>> {
        self.with_existing_bucket(transaction, |bucket| bucket.calls().to_vec())
    }

    pub fn contains(&self, transaction: &TransactionId) -> bool {
        self.buckets.contains_key(transaction)
    }

    /// Remove one bucket. Returns whether it existed.
    pub fn delete(&self, transaction: &TransactionId) -> bool {
        self.buckets.remove(transaction).is_some()
    }

    /// Remove every bucket.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Delete buckets idle for longer than the TTL. Returns how many went.
    pub fn evict_stale(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut evicted = 0;
        self.buckets.retain(|id, bucket| {
            if bucket.is_stale(now, ttl) {
                tracing::trace!(
                    transaction = %id,
                    calls = bucket.len(),
                    "Evicting idle transaction bucket"
                );
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    pub fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary::default();
        for r in self.buckets.iter() {
            summary.buckets += 1;
            summary.calls += r.value().len();
            summary.unflushed += r.value().unflushed().len();
        }
        summary
    }
}
