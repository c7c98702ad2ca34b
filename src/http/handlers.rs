//! Request handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::aggregator::{CallRecord, StoreSummary};
use crate::backend::current_transaction;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub url: String,
}

/// Outcome of `/fetch`, including everything tracked so far for the transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchReport {
    pub transaction: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub calls: Vec<CallRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionsSummary {
    #[serde(flatten)]
    pub store: StoreSummary,
    pub sweeper_running: bool,
}

pub async fn health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
    })
}

/// Perform a tracked GET against `url`.
pub async fn fetch(State(state): State<AppState>, Query(params): Query<FetchParams>) -> Response {
    let transaction = current_transaction().map(|t| t.to_string());

    match state.client.get(&params.url).await {
        Ok(response) => {
            let report = FetchReport {
                transaction,
                status: Some(response.status().as_u16()),
                error: None,
                calls: state.monitor.calls_for_current_transaction(),
            };
            Json(report).into_response()
        }
        Err(e) => {
            tracing::warn!(url = %params.url, error = %e, "Upstream call failed");
            let report = FetchReport {
                transaction,
                status: None,
                error: Some(e.to_string()),
                calls: state.monitor.calls_for_current_transaction(),
            };
            (StatusCode::BAD_GATEWAY, Json(report)).into_response()
        }
    }
}

pub async fn get_transactions(State(state): State<AppState>) -> Json<TransactionsSummary> {
    Json(TransactionsSummary {
        store: state.monitor.summary(),
        sweeper_running: state.monitor.sweeper_running(),
    })
}

pub async fn clear_transactions(State(state): State<AppState>) -> StatusCode {
    state.monitor.clear_all();
    tracing::info!("All transaction buckets cleared via admin API");
    StatusCode::NO_CONTENT
}
