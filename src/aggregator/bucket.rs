//! Per-transaction accumulator.

use std::time::Instant;

use crate::aggregator::record::CallRecord;

/// Live call records for one transaction.
///
/// `calls` is append-only. `last_flushed` is the index of the last record
/// handed to a sink (`None` until the first flush) and only ever moves forward.
#[derive(Debug, Clone)]
pub struct TransactionBucket {
    calls: Vec<CallRecord>,
    last_access: Instant,
    last_flushed: Option<usize>,
}

impl TransactionBucket {
    /// Create an empty bucket accessed at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            calls: Vec::new(),
            last_access: now,
            last_flushed: None,
        }
    }

    /// Record an access.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_access {
            self.last_access = now;
        }
    }

    /// Append a record in settle order.
    pub fn push(&mut self, record: CallRecord) {
        self.calls.push(record);
    }

    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    pub fn last_flushed_index(&self) -> Option<usize> {
        self.last_flushed
    }

    /// Index of the first record not yet flushed.
    pub fn next_unflushed(&self) -> usize {
        self.last_flushed.map_or(0, |i| i + 1)
    }

    /// Records appended since the last flush.
    pub fn unflushed(&self) -> &[CallRecord] {
        &self.calls[self.next_unflushed()..]
    }

    /// Mark every record currently held as flushed.
    pub fn mark_flushed(&mut self) {
        if let Some(last) = self.calls.len().checked_sub(1) {
            self.last_flushed = Some(last);
        }
    }

    /// True once the bucket has been idle for longer than `ttl`.
    pub fn is_stale(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_access) > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(n: u16) -> CallRecord {
        CallRecord::from_response(format!("https://a.test/{}", n), "GET", 200, "OK", Duration::ZERO)
    }

    #[test]
    fn test_unflushed_window() {
        let mut bucket = TransactionBucket::new(Instant::now());
        assert!(bucket.unflushed().is_empty());
        assert_eq!(bucket.last_flushed_index(), None);

        bucket.push(record(1));
        bucket.push(record(2));
        assert_eq!(bucket.unflushed().len(), 2);

        bucket.mark_flushed();
        assert_eq!(bucket.last_flushed_index(), Some(1));
        assert!(bucket.unflushed().is_empty());

        bucket.push(record(3));
        assert_eq!(bucket.unflushed(), &[record(3)]);
        assert_eq!(bucket.next_unflushed(), 2);
    }

    #[test]
    fn test_mark_flushed_on_empty_bucket_is_noop() {
        let mut bucket = TransactionBucket::new(Instant::now());
        bucket.mark_flushed();
        assert_eq!(bucket.last_flushed_index(), None);
    }

    #[test]
    fn test_staleness() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(300);
        let mut bucket = TransactionBucket::new(t0);

        assert!(!bucket.is_stale(t0 + ttl, ttl));
        assert!(bucket.is_stale(t0 + ttl + Duration::from_millis(1), ttl));

        bucket.touch(t0 + ttl);
        assert!(!bucket.is_stale(t0 + ttl + Duration::from_millis(1), ttl));
    }
}
