use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    Json,
};
use futures::Stream;
use tokio::time::{self, MissedTickBehavior};

use crate::models::Snapshot;

use super::{ApiError, AppState};

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const NO_HISTORY_MESSAGE: &str = "No history file to download yet.";

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// One snapshot per push interval until the client disconnects or the server
/// shuts down. The store lock is only held while the snapshot is taken.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let service = state.service.clone();
    let shutdown = state.shutdown.clone();
    let push_interval = state.push_interval;

    let events = async_stream::stream! {
        let mut ticker = time::interval(push_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
            }
            let snapshot = service.handle_snapshot().await;
            yield Event::default().json_data(snapshot);
        }
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn start(State(state): State<AppState>) -> Redirect {
    state.service.handle_start().await;
    Redirect::to("/")
}

pub async fn stop(State(state): State<AppState>) -> Redirect {
    state.service.handle_stop().await;
    Redirect::to("/")
}

pub async fn snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.service.handle_snapshot().await)
}

pub async fn download_history(State(state): State<AppState>) -> Result<Response, ApiError> {
    let history = state.history.clone();
    let contents = tokio::task::spawn_blocking(move || history.contents()).await??;

    let Some(bytes) = contents else {
        return Ok((StatusCode::NOT_FOUND, NO_HISTORY_MESSAGE).into_response());
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"history.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.service.handle_snapshot().await;
    Json(serde_json::json!({
        "status": "ok",
        "active": snapshot.active,
    }))
}
