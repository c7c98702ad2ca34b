//! Tracker settings and construction errors.

use thiserror::Error;

use crate::aggregator::FlushPolicy;
use crate::config::loader::ConfigError;
use crate::config::schema::TrackingConfig;
use crate::security::UrlRedactor;

/// Runtime-adjustable tracking behavior. Swapped atomically on config reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSettings {
    pub policy: FlushPolicy,
    /// Open a zero-duration external segment per call.
    pub external_segments: bool,
    pub redactor: UrlRedactor,
}

impl TrackingSettings {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            policy: FlushPolicy::new(config.attribute_prefix.clone(), config.emit_rollups),
            external_segments: config.external_segments,
            redactor: UrlRedactor::new(&config.redact_query_params),
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

/// Precondition failures. Unlike telemetry errors these reach the caller.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client unavailable: {0}")]
    Client(#[from] reqwest::Error),

    /// Background tasks need a Tokio runtime.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
