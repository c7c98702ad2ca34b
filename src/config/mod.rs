//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TrackerConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → update sent over channel
//!     → tracking section swapped into the CallTracker (ArcSwap)
//! ```
//!
//! # Design Decisions
//! - Only the `tracking` section is hot-reloadable; server, client and
//!   observability changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ClientConfig, ObservabilityConfig, ServerConfig, TrackerConfig, TrackingConfig,
};
pub use watcher::ConfigWatcher;
