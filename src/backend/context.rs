//! Task-scoped transaction context.
//!
//! The inbound middleware runs each request inside [`with_transaction`]; code
//! running on that task (and only that task) then sees the id through
//! [`current_transaction`]. Work moved to a `tokio::spawn`ed task must be
//! re-scoped explicitly.

use std::future::Future;

use crate::backend::segment::{ExternalSegment, SegmentHandle};
use crate::backend::types::{TelemetryResult, TransactionId};
use crate::backend::TracingBackend;

tokio::task_local! {
    static CURRENT_TRANSACTION: TransactionId;
}

/// Run `fut` with `id` as the current transaction.
pub async fn with_transaction<F>(id: TransactionId, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TRANSACTION.scope(id, fut).await
}

/// The transaction active on this task, if any.
pub fn current_transaction() -> Option<TransactionId> {
    CURRENT_TRANSACTION.try_with(|id| id.clone()).ok()
}

/// Backend that reads the task-local transaction and reports segments and
/// errors through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalBackend;

impl TracingBackend for TaskLocalBackend {
    fn current_transaction_id(&self) -> Option<TransactionId> {
        current_transaction()
    }

    fn start_external_segment(&self, segment: &ExternalSegment) -> TelemetryResult<SegmentHandle> {
        let span = tracing::info_span!(
            "external",
            transaction = tracing::field::Empty,
            name = %segment.name,
            host = %segment.host,
            method = %segment.method,
            status = segment.status_code,
            duration_ms = segment.duration_ms,
        );
        if let Some(id) = current_transaction() {
            span.record("transaction", tracing::field::display(&id));
        }
        Ok(SegmentHandle::new(span))
    }

    fn notice_error(&self, message: &str) -> TelemetryResult<()> {
        match current_transaction() {
            Some(id) => tracing::warn!(transaction = %id, error = %message, "External call failed"),
            None => tracing::warn!(error = %message, "External call failed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_is_visible_inside_only() {
        assert!(current_transaction().is_none());

        let seen = with_transaction(TransactionId::from("tx1"), async {
            tokio::task::yield_now().await;
            current_transaction()
        })
        .await;

        assert_eq!(seen, Some(TransactionId::from("tx1")));
        assert!(current_transaction().is_none());
    }

    #[tokio::test]
    async fn test_nested_scopes() {
        let outer = TransactionId::from("outer");
        let inner = TransactionId::from("inner");
        with_transaction(outer.clone(), async {
            let seen = with_transaction(inner.clone(), async { current_transaction() }).await;
            assert_eq!(seen, Some(inner));
            assert_eq!(current_transaction(), Some(outer.clone()));
        })
        .await;
    }

    #[tokio::test]
    async fn test_backend_reads_scope() {
        let backend = TaskLocalBackend;
        assert!(backend.current_transaction_id().is_none());
        let id = with_transaction(TransactionId::from(7u64), async {
            backend.current_transaction_id()
        })
        .await;
        assert_eq!(id, Some(TransactionId::from("7")));
    }
}
