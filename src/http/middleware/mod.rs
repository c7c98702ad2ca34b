//! HTTP middleware.

pub mod admin;
pub mod transaction;

pub use admin::{admin_auth_middleware, AdminAuth};
pub use transaction::{transaction_middleware, TransactionState, X_TRANSACTION_ID};
