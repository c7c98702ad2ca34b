//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware/transaction.rs (transaction id, request attributes, scope)
//!     → handlers.rs (tracked outbound call through TrackedClient)
//!     → JSON report with the transaction's call records
//!
//! Admin:
//!     → handlers.rs (bucket summary, clear all)
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use middleware::X_TRANSACTION_ID;
pub use server::{AppServer, AppState};
