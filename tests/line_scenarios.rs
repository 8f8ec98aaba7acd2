use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use linewatch_lib::{
    history::CsvHistory,
    sensing::{SamplerConfig, SamplerController, SignalSensor},
    session::{SessionService, SessionStore},
};
use tokio::time::{sleep, Duration};

/// Sensor whose level the test flips directly.
struct ScriptedSensor(Arc<AtomicBool>);

impl SignalSensor for ScriptedSensor {
    fn read_signal(&mut self) -> Result<bool> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

struct Line {
    level: Arc<AtomicBool>,
    service: SessionService,
    history: Arc<CsvHistory>,
    sampler: SamplerController,
    _dir: tempfile::TempDir,
}

fn line_with_debounce(debounce: Duration) -> Line {
    let dir = tempfile::tempdir().expect("temp dir");
    let level = Arc::new(AtomicBool::new(true));
    let store = SessionStore::new();
    let history = Arc::new(CsvHistory::new(dir.path().join("history.csv")));
    let service = SessionService::new(store.clone(), history.clone());

    let mut sampler = SamplerController::new();
    sampler
        .start_sampling(
            store,
            Box::new(ScriptedSensor(level.clone())),
            SamplerConfig {
                poll_interval: Duration::from_millis(100),
                debounce,
            },
        )
        .expect("start sampler");

    Line {
        level,
        service,
        history,
        sampler,
        _dir: dir,
    }
}

fn history_rows(history: &CsvHistory) -> Vec<csv::StringRecord> {
    let Some(bytes) = history.contents().expect("read history") else {
        return Vec::new();
    };
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(bytes.as_slice())
        .records()
        .collect::<Result<_, _>>()
        .expect("parse history")
}

#[tokio::test(start_paused = true)]
async fn eleven_second_outage_counts_one_stop() {
    let mut line = line_with_debounce(Duration::from_secs(10));

    line.service.handle_start().await;
    sleep(Duration::from_secs(5)).await;
    line.level.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(11)).await;
    line.level.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(4)).await;

    let snapshot = line.service.handle_snapshot().await;
    assert!(snapshot.active);
    assert_eq!(snapshot.stop_count, 1);
    assert!((snapshot.uptime_seconds - 20.0).abs() < 0.2);

    let record = line.service.handle_stop().await.expect("session was running");
    assert_eq!(record.stop_count, 1);
    assert!((record.uptime_seconds - 20.0).abs() < 0.2);
    assert!((record.ratio - 20.0).abs() < 0.2);

    let rows = history_rows(&line.history);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "1");

    line.sampler.stop_sampling().await.expect("stop sampler");
}

#[tokio::test(start_paused = true)]
async fn outage_just_under_debounce_is_ignored() {
    let mut line = line_with_debounce(Duration::from_secs(10));

    line.service.handle_start().await;
    sleep(Duration::from_secs(2)).await;
    line.level.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(9_700)).await;
    line.level.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(2)).await;

    assert_eq!(line.service.handle_snapshot().await.stop_count, 0);
    line.sampler.stop_sampling().await.expect("stop sampler");
}

#[tokio::test(start_paused = true)]
async fn prolonged_outage_is_one_stop() {
    let mut line = line_with_debounce(Duration::from_secs(10));

    line.service.handle_start().await;
    sleep(Duration::from_secs(1)).await;
    line.level.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(300)).await;

    let snapshot = line.service.handle_snapshot().await;
    assert_eq!(snapshot.stop_count, 1);

    // A second outage after the line comes back counts again.
    line.level.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(1)).await;
    line.level.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(15)).await;
    assert_eq!(line.service.handle_snapshot().await.stop_count, 2);

    line.sampler.stop_sampling().await.expect("stop sampler");
}

#[tokio::test(start_paused = true)]
async fn outages_outside_a_session_are_not_counted() {
    let mut line = line_with_debounce(Duration::from_secs(10));

    line.level.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(30)).await;
    line.level.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(1)).await;

    line.service.handle_start().await;
    let snapshot = line.service.handle_snapshot().await;
    assert_eq!(snapshot.stop_count, 0);
    assert_eq!(snapshot.uptime_seconds, 0.0);

    assert!(line.service.handle_stop().await.is_some());
    assert!(line.service.handle_stop().await.is_none());
    assert_eq!(history_rows(&line.history).len(), 1);

    line.sampler.stop_sampling().await.expect("stop sampler");
}

#[tokio::test(start_paused = true)]
async fn restart_resets_counts() {
    let mut line = line_with_debounce(Duration::from_secs(1));

    line.service.handle_start().await;
    for _ in 0..3 {
        line.level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(500)).await;
        line.level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(1_500)).await;
    }
    let first = line.service.handle_stop().await.expect("first session");
    assert_eq!(first.stop_count, 3);

    line.level.store(true, Ordering::SeqCst);
    line.service.handle_start().await;
    sleep(Duration::from_secs(4)).await;
    let second = line.service.handle_stop().await.expect("second session");
    assert_eq!(second.stop_count, 0);
    assert_eq!(second.ratio, 0.0);

    let rows = history_rows(&line.history);
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][2], "3");
    assert_eq!(&rows[1][2], "0");

    line.sampler.stop_sampling().await.expect("stop sampler");
}
