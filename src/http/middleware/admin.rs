//! Bearer-key authentication for the admin routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// State for [`admin_auth_middleware`].
#[derive(Clone)]
pub struct AdminAuth {
    api_key: Arc<str>,
}

impl AdminAuth {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: Arc::from(api_key),
        }
    }

    /// True if the request carries `Authorization: Bearer <api_key>`.
    ///
    /// An empty key authorizes nothing.
    pub fn authorizes(&self, request: &Request<Body>) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|key| key == &*self.api_key)
    }
}

pub async fn admin_auth_middleware(
    State(auth): State<AdminAuth>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.authorizes(&request) {
        return Ok(next.run(request).await);
    }
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "Rejected unauthenticated admin request"
    );
    Err(StatusCode::UNAUTHORIZED)
}
