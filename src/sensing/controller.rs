use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::SessionStore;

use super::loop_worker::{sampling_loop, SamplerConfig};
use super::SignalSensor;

/// Owns the background sampling task.
pub struct SamplerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_sampling(
        &mut self,
        store: SessionStore,
        sensor: Box<dyn SignalSensor>,
        config: SamplerConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sampler already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(store, sensor, config, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sampling(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")?;
            info!("Sampler stopped");
        }
        Ok(())
    }
}

impl Default for SamplerController {
    fn default() -> Self {
        Self::new()
    }
}
