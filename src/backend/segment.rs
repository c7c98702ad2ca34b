//! External segment annotations.

use url::Url;

use crate::aggregator::CallRecord;
use crate::backend::types::{TelemetryError, TelemetryResult};

/// Descriptor of one outbound call, as shown on the backend's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSegment {
    /// Segment name, `External/<host>/<METHOD>`.
    pub name: String,
    pub host: String,
    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub duration_ms: u64,
}

impl ExternalSegment {
    /// Derive a segment from a call record.
    ///
    /// Fails if the record's URL has no parsable host.
    pub fn from_record(record: &CallRecord) -> TelemetryResult<Self> {
        let parsed = Url::parse(&record.url).map_err(|e| TelemetryError::InvalidUrl {
            url: record.url.clone(),
            reason: e.to_string(),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| TelemetryError::InvalidUrl {
                url: record.url.clone(),
                reason: "missing host".to_string(),
            })?
            .to_string();

        Ok(Self {
            name: format!("External/{}/{}", host, record.method),
            host,
            url: record.url.clone(),
            method: record.method.clone(),
            status_code: record.status_code,
            duration_ms: record.duration_ms,
        })
    }
}

/// An open segment. Closing it is [`SegmentHandle::end`].
#[derive(Debug)]
#[must_use = "segments should be ended explicitly"]
pub struct SegmentHandle {
    span: tracing::Span,
}

impl SegmentHandle {
    pub fn new(span: tracing::Span) -> Self {
        Self { span }
    }

    /// A handle with nothing behind it.
    pub fn detached() -> Self {
        Self {
            span: tracing::Span::none(),
        }
    }

    pub fn end(self) {
        drop(self.span);
    }
}
