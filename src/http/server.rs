//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, transaction scope, admin key)
//! - Own the call monitor and start its sweeper
//! - Apply hot-reloaded tracking settings
//! - Serve until the shutdown signal, then stop background tasks

use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::backend::{AttributeSink, TaskLocalBackend};
use crate::config::TrackerConfig;
use crate::http::handlers;
use crate::http::middleware::{
    admin_auth_middleware, transaction_middleware, AdminAuth, TransactionState,
};
use crate::lifecycle::Shutdown;
use crate::tracker::{ExternalCallMonitor, TrackedClient, TrackerError, TrackingSettings};

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<ExternalCallMonitor>,
    pub client: TrackedClient,
}

/// HTTP server whose handlers make tracked outbound calls.
pub struct AppServer {
    router: Router,
    config: TrackerConfig,
    monitor: Arc<ExternalCallMonitor>,
}

impl AppServer {
    /// Build the server. Fails if the outbound HTTP client cannot be built.
    pub fn new(config: TrackerConfig, sink: Arc<dyn AttributeSink>) -> Result<Self, TrackerError> {
        let monitor = Arc::new(ExternalCallMonitor::new(
            Arc::new(TaskLocalBackend),
            sink.clone(),
            TrackingSettings::from_config(&config.tracking),
        ));
        let client = TrackedClient::new(&config.client, monitor.tracker().clone())?;

        let state = AppState {
            monitor: monitor.clone(),
            client,
        };
        let router = Self::build_router(&config, state, sink);

        Ok(Self {
            router,
            config,
            monitor,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &TrackerConfig,
        state: AppState,
        sink: Arc<dyn AttributeSink>,
    ) -> Router {
        let tracked = Router::new()
            .route("/fetch", get(handlers::fetch))
            .layer(from_fn_with_state(TransactionState { sink }, transaction_middleware));

        let mut router = Router::new()
            .merge(tracked)
            .route("/health", get(handlers::health));

        if config.admin.enabled {
            let admin = Router::new()
                .route(
                    "/admin/transactions",
                    get(handlers::get_transactions).delete(handlers::clear_transactions),
                )
                .layer(from_fn_with_state(
                    AdminAuth::new(&config.admin.api_key),
                    admin_auth_middleware,
                ));
            router = router.merge(admin);
        }

        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        )
    }

    pub fn monitor(&self) -> &Arc<ExternalCallMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Shutdown subscriptions are taken when `run` is called, so a trigger
    /// that lands before the returned future is polled still stops it.
    /// Tracking settings from `config_updates` are applied as they arrive.
    pub fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<TrackerConfig>,
        shutdown: Shutdown,
    ) -> impl Future<Output = ServeResult> + Send {
        let drain = shutdown.wait();
        let sweeper_stop = shutdown.subscribe();
        let reload_stop = shutdown.subscribe();

        async move {
            let addr = listener.local_addr()?;
            tracing::info!(address = %addr, "HTTP server starting");

            self.monitor.start_sweeper(sweeper_stop)?;
            tokio::spawn(apply_config_updates(
                self.monitor.clone(),
                config_updates,
                reload_stop,
            ));

            axum::serve(listener, self.router)
                .with_graceful_shutdown(drain)
                .await?;

            self.monitor.stop_sweeper().await;
            tracing::info!("HTTP server stopped");
            ServeResult::Ok(())
        }
    }
}

async fn apply_config_updates(
    monitor: Arc<ExternalCallMonitor>,
    mut updates: mpsc::UnboundedReceiver<TrackerConfig>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    let settings = TrackingSettings::from_config(&config.tracking);
                    monitor.tracker().apply_settings(settings);
                }
                None => break,
            },
            _ = stop.recv() => break,
        }
    }
}
