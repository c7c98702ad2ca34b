//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tracker
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::aggregator::EXTERNAL_CALL_PREFIX;
use crate::security::redact::DEFAULT_SENSITIVE_PARAMS;

/// Root configuration for the tracker service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,

    /// Outbound HTTP client settings.
    pub client: ClientConfig,

    /// Attribute naming, segments and scrubbing.
    pub tracking: TrackingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed to serve one inbound request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// User-Agent sent on outbound calls.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            user_agent: format!("call-tracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Tracking behavior. Hot-reloadable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Attribute prefix: "externalCall" (client wrapper) or "external" (interceptor).
    pub attribute_prefix: String,

    /// Emit callCount / totalDuration / failedCount rollups.
    pub emit_rollups: bool,

    /// Open a zero-duration external segment per call.
    pub external_segments: bool,

    /// Query parameters whose values are masked before recording.
    pub redact_query_params: Vec<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            attribute_prefix: EXTERNAL_CALL_PREFIX.to_string(),
            emit_rollups: true,
            external_segments: true,
            redact_query_params: DEFAULT_SENSITIVE_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Expose `/admin/transactions`.
    pub enabled: bool,

    /// Bearer token required on admin requests. Must be set when enabled.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
        }
    }
}
