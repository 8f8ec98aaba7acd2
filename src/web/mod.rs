mod handlers;

use std::{future::Future, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{history::CsvHistory, session::SessionService};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_error;

#[derive(Clone)]
pub struct AppState {
    pub service: SessionService,
    pub history: Arc<CsvHistory>,
    pub push_interval: Duration,
    /// Ends open event streams so graceful shutdown can complete.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/stream", get(handlers::stream))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/history", get(handlers::download_history))
        .route("/api/snapshot", get(handlers::snapshot))
        .route("/health", get(handlers::health))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Unexpected failure inside a handler; logged and reported as a bare 500.
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_error!("request failed: {:?}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}
