//! Owner of the aggregator, tracker and sweeper lifecycle.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::aggregator::{
    AggregatorStore, CallRecord, Clock, StoreSummary, Sweeper, SweeperHandle, SystemClock,
};
use crate::backend::{AttributeSink, TracingBackend};
use crate::tracker::call::CallTracker;
use crate::tracker::types::{TrackerError, TrackingSettings};

/// Builds and owns one aggregator instance.
///
/// The sweeper is not started implicitly; call
/// [`ExternalCallMonitor::start_sweeper`] from inside a Tokio runtime.
pub struct ExternalCallMonitor {
    store: Arc<AggregatorStore>,
    tracker: CallTracker,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl ExternalCallMonitor {
    pub fn new(
        backend: Arc<dyn TracingBackend>,
        sink: Arc<dyn AttributeSink>,
        settings: TrackingSettings,
    ) -> Self {
        Self::with_clock(Arc::new(SystemClock), backend, sink, settings)
    }

    pub fn with_clock(
        clock: Arc<dyn Clock>,
        backend: Arc<dyn TracingBackend>,
        sink: Arc<dyn AttributeSink>,
        settings: TrackingSettings,
    ) -> Self {
        let store = Arc::new(AggregatorStore::new(clock));
        let tracker = CallTracker::new(store.clone(), backend, sink, settings);
        Self {
            store,
            tracker,
            sweeper: Mutex::new(None),
        }
    }

    pub fn tracker(&self) -> &CallTracker {
        &self.tracker
    }

    pub fn store(&self) -> &Arc<AggregatorStore> {
        &self.store
    }

    /// Start the eviction loop. A second call while running is a no-op.
    pub fn start_sweeper(&self, shutdown: broadcast::Receiver<()>) -> Result<(), TrackerError> {
        self.start_with(Sweeper::new(self.store.clone()), shutdown)
    }

    /// Start a custom-configured sweeper over this monitor's store.
    pub fn start_with(
        &self,
        sweeper: Sweeper,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), TrackerError> {
        tokio::runtime::Handle::try_current().map_err(|e| TrackerError::NoRuntime(e.to_string()))?;

        let mut slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }
        *slot = Some(sweeper.spawn(shutdown));
        Ok(())
    }

    /// Stop the eviction loop and wait for it to exit.
    pub async fn stop_sweeper(&self) {
        let handle = self.sweeper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn calls_for_current_transaction(&self) -> Vec<CallRecord> {
        self.tracker.calls_for_current_transaction()
    }

    pub fn clear_all(&self) {
        self.tracker.clear_all();
    }

    pub fn summary(&self) -> StoreSummary {
        self.store.summary()
    }
}
