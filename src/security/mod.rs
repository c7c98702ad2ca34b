//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call URL
//!     → redact.rs (strip userinfo, mask sensitive query values)
//!     → CallRecord.url / attributes
//! ```
//!
//! # Design Decisions
//! - Scrubbing happens before a URL enters any record, so nothing downstream
//!   (sink, segment, admin API) ever sees the raw value
//! - Parameter names match case-insensitively

pub mod redact;

pub use redact::UrlRedactor;
