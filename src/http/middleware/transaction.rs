//! Inbound transaction middleware.
//!
//! Each request becomes one transaction: the id is taken from
//! `x-transaction-id` when the caller supplies one, otherwise generated. The
//! downstream handler runs inside the transaction scope, so tracked calls it
//! makes are aggregated under that id.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::backend::{with_transaction, AttributeSink, AttributeValue, Attributes, TransactionId};

/// Header carrying the transaction id in both directions.
pub const X_TRANSACTION_ID: &str = "x-transaction-id";

const MAX_TRANSACTION_ID_LEN: usize = 128;

/// State for [`transaction_middleware`].
#[derive(Clone)]
pub struct TransactionState {
    pub sink: Arc<dyn AttributeSink>,
}

/// Transaction id requested by the caller, if usable.
pub fn requested_transaction_id(request: &Request<Body>) -> Option<TransactionId> {
    request
        .headers()
        .get(X_TRANSACTION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_TRANSACTION_ID_LEN)
        .map(TransactionId::from)
}

/// Request metadata recorded once per transaction.
pub fn request_attributes(request: &Request<Body>) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("request.method".into(), AttributeValue::from(request.method().as_str()));
    attributes.insert("request.uri".into(), AttributeValue::from(request.uri().path()));
    if let Some(agent) = request.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        attributes.insert("request.userAgent".into(), AttributeValue::from(agent));
    }
    attributes
}

pub async fn transaction_middleware(
    State(state): State<TransactionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let transaction = requested_transaction_id(&request).unwrap_or_else(TransactionId::generate);

    if let Err(e) = state.sink.add_attributes(&transaction, &request_attributes(&request)) {
        tracing::debug!(transaction = %transaction, error = %e, "Dropping request attributes");
    }

    let echo = HeaderValue::from_str(transaction.as_str()).ok();
    let mut response = with_transaction(transaction, next.run(request)).await;
    if let Some(value) = echo {
        response.headers_mut().insert(X_TRANSACTION_ID, value);
    }
    response
}
