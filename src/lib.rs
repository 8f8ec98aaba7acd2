pub mod history;
pub mod models;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;
pub mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;

use history::CsvHistory;
use models::HistoryRecord;
use sensing::{open_sensor, SamplerConfig, SamplerController};
use session::{SessionService, SessionStore};
use settings::Settings;
use web::AppState;

pub async fn run() -> Result<()> {
    // RUST_LOG overrides the default level.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("linewatch starting up...");

    let settings = Settings::load()?;

    let store = SessionStore::new();
    let history = Arc::new(CsvHistory::new(settings.history_path.clone()));
    let service = SessionService::new(store.clone(), history.clone());

    let sensor = open_sensor(&settings.sensor).await?;
    let mut sampler = SamplerController::new();
    sampler.start_sampling(
        store,
        sensor,
        SamplerConfig {
            poll_interval: settings.poll_interval(),
            debounce: settings.debounce(),
        },
    )?;

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);
    info!("History log at {}", history.path().display());

    let shutdown = CancellationToken::new();
    let state = AppState {
        service: service.clone(),
        history,
        push_interval: settings.push_interval(),
        shutdown: shutdown.clone(),
    };

    let served = web::serve(listener, state, shutdown_signal(shutdown)).await;

    wind_down(&mut sampler, &service).await;

    info!("linewatch stopped");
    served
}

/// Stops sampling and records a session that was still running. A failed
/// sampler join is logged so the session is still written.
async fn wind_down(
    sampler: &mut SamplerController,
    service: &SessionService,
) -> Option<HistoryRecord> {
    if let Err(err) = sampler.stop_sampling().await {
        error!("Sampler did not shut down cleanly: {err:?}");
    }

    let record = service.handle_stop().await?;
    warn!(
        "Session still running at shutdown was recorded (uptime={:.2}s, stops={})",
        record.uptime_seconds, record.stop_count
    );
    Some(record)
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensing::SignalSensor;
    use tokio::time::Duration;

    struct PanickingSensor;

    impl SignalSensor for PanickingSensor {
        fn read_signal(&mut self) -> Result<bool> {
            panic!("sensor driver crashed");
        }

        fn describe(&self) -> String {
            "panicking test sensor".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_sampler_still_records_running_session() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let history = Arc::new(CsvHistory::new(temp_dir.path().join("history.csv")));
        let store = SessionStore::new();
        let service = SessionService::new(store.clone(), history.clone());
        assert!(service.handle_start().await);

        let mut sampler = SamplerController::new();
        sampler
            .start_sampling(
                store,
                Box::new(PanickingSensor),
                SamplerConfig {
                    poll_interval: Duration::from_millis(100),
                    debounce: Duration::from_secs(10),
                },
            )
            .expect("start sampler");
        tokio::time::sleep(Duration::from_millis(250)).await;

        let record = wind_down(&mut sampler, &service)
            .await
            .expect("running session recorded");
        assert!(record.uptime_seconds >= 0.25);
        assert!(!sampler.is_running());

        let text = String::from_utf8(history.contents().unwrap().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!service.handle_snapshot().await.active);
    }
}
