//! Call tracker entry point.
//!
//! # Responsibilities
//! - Register the current transaction's bucket before the call runs
//! - Time a wrapped outbound call
//! - Turn its outcome into a [`CallRecord`]
//! - Append the record to the current transaction and flush new records
//! - Annotate the backend with an external segment (best effort)
//!
//! # Design Decisions
//! - The wrapped call's result is returned untouched, success or failure
//! - Telemetry failures are `Result`s internally and are dropped only in
//!   [`CallTracker::track`]
//! - Settings live behind an `ArcSwap` so config reloads apply to the next call

use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;

use crate::aggregator::{AggregatorStore, CallRecord};
use crate::backend::{
    AttributeSink, ExternalSegment, TelemetryError, TelemetryResult, TracingBackend, TransactionId,
};
use crate::observability::metrics;
use crate::tracker::outcome::{ObservedError, ObservedResponse};
use crate::tracker::types::TrackingSettings;

/// Wraps outbound calls and feeds their outcomes into the aggregator.
#[derive(Clone)]
pub struct CallTracker {
    store: Arc<AggregatorStore>,
    backend: Arc<dyn TracingBackend>,
    sink: Arc<dyn AttributeSink>,
    settings: Arc<ArcSwap<TrackingSettings>>,
}

impl CallTracker {
    pub fn new(
        store: Arc<AggregatorStore>,
        backend: Arc<dyn TracingBackend>,
        sink: Arc<dyn AttributeSink>,
        settings: TrackingSettings,
    ) -> Self {
        Self {
            store,
            backend,
            sink,
            settings: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    pub fn store(&self) -> &Arc<AggregatorStore> {
        &self.store
    }

    pub fn settings(&self) -> Arc<TrackingSettings> {
        self.settings.load_full()
    }

    /// Replace settings for subsequent calls.
    pub fn apply_settings(&self, settings: TrackingSettings) {
        tracing::info!(
            prefix = settings.policy.prefix(),
            emit_rollups = settings.policy.emit_rollups(),
            external_segments = settings.external_segments,
            "Tracking settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Perform `call` and record its outcome against the current transaction.
    ///
    /// The transaction's bucket is created or refreshed before `call` starts,
    /// so a sweep running while the call is in flight does not evict it. The
    /// result of `call` is returned exactly as produced.
    pub async fn track<F, Fut, T, E>(&self, url: &str, method: &str, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: ObservedResponse,
        E: ObservedError,
    {
        let transaction = match self.register_current() {
            Ok(id) => Some(id),
            Err(e) => {
                discard(e);
                None
            }
        };
        let clock = self.store.clock().clone();
        let started = clock.now();

        let result = call().await;

        let elapsed = clock.now().saturating_duration_since(started);
        let settings = self.settings.load_full();
        let url = settings.redactor.redact(url);
        let record = match &result {
            Ok(response) => {
                let status_text = response.status_text();
                CallRecord::from_response(url, method, response.status(), &status_text, elapsed)
            }
            Err(error) => {
                let message = error.message();
                CallRecord::from_error(url, method, error.status(), &message, elapsed)
            }
        };

        self.observe(transaction.as_ref(), record, &settings);
        result
    }

    /// Record an already-settled call, e.g. from a client interceptor hook.
    ///
    /// Returns the number of records flushed to the sink.
    pub fn record(
        &self,
        transaction: Option<&TransactionId>,
        record: CallRecord,
    ) -> TelemetryResult<usize> {
        let transaction = transaction.ok_or(TelemetryError::NoTransaction)?;
        let settings = self.settings.load_full();
        settings
            .policy
            .record_and_flush(&self.store, transaction, record, self.sink.as_ref())
    }

    /// Create or refresh the bucket for the current transaction.
    pub fn register_current(&self) -> TelemetryResult<TransactionId> {
        let transaction = self
            .backend
            .current_transaction_id()
            .ok_or(TelemetryError::NoTransaction)?;
        self.store.touch(&transaction);
        Ok(transaction)
    }

    /// Snapshot of the records for the current transaction, in settle order.
    pub fn calls_for_current_transaction(&self) -> Vec<CallRecord> {
        self.backend
            .current_transaction_id()
            .and_then(|tx| self.store.calls(&tx))
            .unwrap_or_default()
    }

    /// Drop every bucket.
    pub fn clear_all(&self) {
        self.store.clear();
    }

    fn observe(
        &self,
        transaction: Option<&TransactionId>,
        record: CallRecord,
        settings: &TrackingSettings,
    ) {
        metrics::record_external_call(&record.method, record.success, record.duration_ms);
        tracing::trace!(
            url = %record.url,
            method = %record.method,
            status = record.status_code,
            duration_ms = record.duration_ms,
            success = record.success,
            "External call settled"
        );

        if settings.external_segments {
            if let Err(e) = self.emit_segment(&record) {
                discard(e);
            }
        }

        if let Some(message) = &record.error {
            if let Err(e) = self.backend.notice_error(message) {
                discard(e);
            }
        }

        // Without a transaction the record is dropped; that was already logged.
        let Some(transaction) = transaction else {
            return;
        };
        let flushed = settings
            .policy
            .record_and_flush(&self.store, transaction, record, self.sink.as_ref());
        if let Err(e) = flushed {
            discard(e);
        }
    }

    fn emit_segment(&self, record: &CallRecord) -> TelemetryResult<()> {
        let segment = ExternalSegment::from_record(record)?;
        self.backend.start_external_segment(&segment)?.end();
        Ok(())
    }
}

fn discard(error: TelemetryError) {
    match error {
        TelemetryError::NoTransaction => {
            tracing::trace!("No active transaction, call not aggregated")
        }
        other => {
            tracing::debug!(error = %other, "Discarding telemetry error");
            metrics::record_telemetry_error(other.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{FlushPolicy, ManualClock, Sweeper, BUCKET_TTL};
    use crate::backend::{
        with_transaction, AttributeValue, Attributes, MemorySink, SegmentHandle, TaskLocalBackend,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Resp(u16);

    impl ObservedResponse for Resp {
        fn status(&self) -> u16 {
            self.0
        }

        fn status_text(&self) -> String {
            match self.0 {
                200 => "OK".into(),
                500 => "Internal Server Error".into(),
                _ => String::new(),
            }
        }
    }

    #[derive(Debug, PartialEq)]
    struct Failure(&'static str);

    impl ObservedError for Failure {
        fn message(&self) -> String {
            self.0.to_string()
        }
    }

    type Outcome = Result<Resp, Failure>;

    fn tracker() -> (Arc<ManualClock>, MemorySink, CallTracker) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(AggregatorStore::new(clock.clone()));
        let sink = MemorySink::new();
        let tracker = CallTracker::new(
            store,
            Arc::new(TaskLocalBackend),
            Arc::new(sink.clone()),
            TrackingSettings::default(),
        );
        (clock, sink, tracker)
    }

    #[tokio::test]
    async fn test_two_calls_example() {
        let (clock, sink, tracker) = tracker();
        let tx = TransactionId::from("tx1");

        let calls = with_transaction(tx.clone(), async {
            let c = clock.clone();
            let first: Outcome = tracker
                .track("https://a.test/1", "get", || async move {
                    c.advance(Duration::from_millis(50));
                    Ok(Resp(200))
                })
                .await;
            assert!(first.is_ok());

            let c = clock.clone();
            let second: Outcome = tracker
                .track("https://a.test/2", "GET", || async move {
                    c.advance(Duration::from_millis(30));
                    Ok(Resp(500))
                })
                .await;
            assert_eq!(second.map(|r| r.0).ok(), Some(500));

            tracker.calls_for_current_transaction()
        })
        .await;

        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            CallRecord {
                url: "https://a.test/1".into(),
                method: "GET".into(),
                status_code: 200,
                duration_ms: 50,
                success: true,
                error: None,
            }
        );
        assert_eq!(calls[1].status_code, 500);
        assert_eq!(calls[1].duration_ms, 30);
        assert!(!calls[1].success);
        assert_eq!(calls[1].error.as_deref(), Some("HTTP 500 Internal Server Error"));

        let attrs = sink.attributes(&tx);
        assert!(attrs.contains_key("externalCall.1.url"));
        assert!(attrs.contains_key("externalCall.2.url"));
        assert_eq!(attrs["externalCall.callCount"], AttributeValue::Int(2));
        assert_eq!(attrs["externalCall.failedCount"], AttributeValue::Int(1));
        assert_eq!(attrs["externalCall.totalDuration"], AttributeValue::Int(80));
    }

    #[tokio::test]
    async fn test_bucket_exists_while_call_is_in_flight() {
        let (_, _, tracker) = tracker();
        let store = tracker.store().clone();
        let tx = TransactionId::from("tx1");

        with_transaction(tx.clone(), async {
            let (store, tx) = (&store, &tx);
            let _: Outcome = tracker
                .track("https://a.test/", "GET", || async move {
                    assert!(store.contains(tx));
                    assert_eq!(store.calls(tx), Some(Vec::new()));
                    Ok(Resp(200))
                })
                .await;
        })
        .await;

        assert_eq!(store.calls(&tx).map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn test_sweep_during_call_keeps_transaction() {
        let (clock, sink, tracker) = tracker();
        let sweeper = Sweeper::new(tracker.store().clone());
        let tx = TransactionId::from("tx1");

        with_transaction(tx.clone(), async {
            let _: Outcome = tracker
                .track("https://a.test/first", "GET", || async { Ok(Resp(200)) })
                .await;
            clock.advance(Duration::from_secs(290));

            // Idle for 290s when the call starts, 305s since the first call at the sweep.
            let c = clock.clone();
            let sweeper = &sweeper;
            let _: Outcome = tracker
                .track("https://a.test/second", "GET", || async move {
                    c.advance(Duration::from_secs(15));
                    assert_eq!(sweeper.sweep(), 0);
                    c.advance(Duration::from_secs(5));
                    Ok(Resp(200))
                })
                .await;
        })
        .await;

        let urls: Vec<String> = tracker
            .store()
            .calls(&tx)
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.url)
            .collect();
        assert_eq!(urls, vec!["https://a.test/first", "https://a.test/second"]);

        let attrs = sink.attributes(&tx);
        assert_eq!(attrs["externalCall.1.url"], AttributeValue::from("https://a.test/first"));
        assert_eq!(attrs["externalCall.2.url"], AttributeValue::from("https://a.test/second"));
        assert_eq!(attrs["externalCall.callCount"], AttributeValue::Int(2));
    }

    #[tokio::test]
    async fn test_idle_transaction_still_evicted_between_calls() {
        let (clock, _, tracker) = tracker();
        let sweeper = Sweeper::new(tracker.store().clone());
        let tx = TransactionId::from("tx1");

        with_transaction(tx.clone(), async {
            let _: Outcome = tracker
                .track("https://a.test/", "GET", || async { Ok(Resp(200)) })
                .await;
        })
        .await;

        clock.advance(BUCKET_TTL + Duration::from_secs(1));
        assert_eq!(sweeper.sweep(), 1);
        assert!(!tracker.store().contains(&tx));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let (_, _, tracker) = tracker();
        let (result, calls) = with_transaction(TransactionId::from("tx"), async {
            let result: Outcome = tracker
                .track("https://down.test/", "post", || async {
                    Err(Failure("connection refused"))
                })
                .await;
            (result, tracker.calls_for_current_transaction())
        })
        .await;

        assert_eq!(result.err(), Some(Failure("connection refused")));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status_code, 0);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_no_transaction_passes_through() {
        let (_, sink, tracker) = tracker();
        let result: Outcome = tracker
            .track("https://a.test/", "GET", || async { Ok(Resp(200)) })
            .await;

        assert_eq!(result.ok().map(|r| r.0), Some(200));
        assert!(tracker.store().is_empty());
        assert_eq!(sink.transaction_count(), 0);
        assert!(tracker.calls_for_current_transaction().is_empty());
    }

    #[tokio::test]
    async fn test_redaction_applies_to_records() {
        let (_, _, tracker) = tracker();
        let calls = with_transaction(TransactionId::from("tx"), async {
            let _: Outcome = tracker
                .track("https://a.test/x?token=secret", "GET", || async { Ok(Resp(200)) })
                .await;
            tracker.calls_for_current_transaction()
        })
        .await;
        assert_eq!(calls[0].url, "https://a.test/x?token=%5BREDACTED%5D");
    }

    struct BrokenSink;

    impl AttributeSink for BrokenSink {
        fn add_attributes(&self, _: &TransactionId, _: &Attributes) -> TelemetryResult<()> {
            Err(TelemetryError::Sink("down".into()))
        }
    }

    struct BrokenBackend {
        segments: AtomicUsize,
    }

    impl TracingBackend for BrokenBackend {
        fn current_transaction_id(&self) -> Option<TransactionId> {
            Some(TransactionId::from("fixed"))
        }

        fn start_external_segment(&self, _: &ExternalSegment) -> TelemetryResult<SegmentHandle> {
            self.segments.fetch_add(1, Ordering::SeqCst);
            Err(TelemetryError::BackendUnavailable("agent not loaded".into()))
        }

        fn notice_error(&self, _: &str) -> TelemetryResult<()> {
            Err(TelemetryError::BackendUnavailable("agent not loaded".into()))
        }
    }

    #[tokio::test]
    async fn test_telemetry_failures_are_invisible() {
        let store = Arc::new(AggregatorStore::new(Arc::new(ManualClock::new())));
        let backend = Arc::new(BrokenBackend {
            segments: AtomicUsize::new(0),
        });
        let tracker = CallTracker::new(
            store.clone(),
            backend.clone(),
            Arc::new(BrokenSink),
            TrackingSettings::default(),
        );

        let ok: Outcome = tracker
            .track("https://a.test/", "GET", || async { Ok(Resp(200)) })
            .await;
        assert!(ok.is_ok());
        let err: Outcome = tracker
            .track("https://a.test/", "GET", || async { Err(Failure("x")) })
            .await;
        assert_eq!(err.err(), Some(Failure("x")));

        assert_eq!(backend.segments.load(Ordering::SeqCst), 2);
        // Records are kept even though their flush was lost.
        let fixed = TransactionId::from("fixed");
        assert_eq!(store.calls(&fixed).unwrap().len(), 2);
        let flushed = store.with_existing_bucket(&fixed, |b| b.last_flushed_index());
        assert_eq!(flushed, Some(Some(1)));
    }

    #[tokio::test]
    async fn test_malformed_url_still_recorded() {
        let (_, _, tracker) = tracker();
        let calls = with_transaction(TransactionId::from("tx"), async {
            let _: Outcome = tracker
                .track("::not a url::", "GET", || async { Err(Failure("builder error")) })
                .await;
            tracker.calls_for_current_transaction()
        })
        .await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "::not a url::");
    }

    #[tokio::test]
    async fn test_apply_settings_switches_policy() {
        let (_, sink, tracker) = tracker();
        tracker.apply_settings(TrackingSettings {
            policy: FlushPolicy::external(),
            ..TrackingSettings::default()
        });
        let tx = TransactionId::from("tx");
        with_transaction(tx.clone(), async {
            let _: Outcome = tracker
                .track("https://a.test/", "GET", || async { Ok(Resp(204)) })
                .await;
        })
        .await;

        let attrs = sink.attributes(&tx);
        assert_eq!(attrs["external.1.statusCode"], AttributeValue::Int(204));
        assert!(!attrs.contains_key("external.callCount"));
    }

    #[test]
    fn test_record_and_register_without_scope() {
        let (_, _, tracker) = tracker();
        assert!(matches!(tracker.register_current(), Err(TelemetryError::NoTransaction)));

        let tx = TransactionId::from("hook");
        let rec = CallRecord::from_response("https://a.test/", "GET", 200, "OK", Duration::ZERO);
        assert_eq!(tracker.record(Some(&tx), rec.clone()).unwrap(), 1);
        assert_eq!(tracker.store().calls(&tx).unwrap(), vec![rec]);

        let orphan = CallRecord::from_error("u", "GET", None, "e", Duration::ZERO);
        assert!(matches!(tracker.record(None, orphan), Err(TelemetryError::NoTransaction)));
    }
}
