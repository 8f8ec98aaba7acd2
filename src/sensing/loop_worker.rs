use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::{Observation, SessionStore};

use super::SignalSensor;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Consecutive read failures are logged on the first and then every Nth.
const READ_FAILURE_LOG_EVERY: u32 = 50;

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

pub async fn sampling_loop(
    store: SessionStore,
    mut sensor: Box<dyn SignalSensor>,
    config: SamplerConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failures: u32 = 0;

    log_info!(
        "sampling loop started ({}, every {}ms, debounce {:.1}s)",
        sensor.describe(),
        config.poll_interval.as_millis(),
        config.debounce.as_secs_f64()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let asserted = match sensor.read_signal() {
                    Ok(asserted) => {
                        if failures > 0 {
                            log_info!("sensor recovered after {failures} failed reads");
                            failures = 0;
                        }
                        asserted
                    }
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        if failures == 1 || failures % READ_FAILURE_LOG_EVERY == 0 {
                            log_warn!("sensor read failed ({failures} in a row): {err:?}");
                        }
                        continue;
                    }
                };

                if let Observation::StopCounted(count) =
                    store.record_sample(asserted, config.debounce).await
                {
                    log_info!("line stop detected (stops this session: {count})");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
        }
    }
}
