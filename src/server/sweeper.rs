//! Periodic deadline sweep: asks the engine actor to fail overdue quests at a
//! configurable interval. Runs as its own task so a slow sweep never blocks
//! request handling for longer than one actor turn.

use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::engine::errors::StoreError;
use crate::server::service::ServiceHandle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 10,
        }
    }
}

/// Spawn the sweep task. Returns `None` when disabled. The task exits when
/// the engine actor goes away.
pub fn spawn_sweeper(handle: ServiceHandle, config: SweeperConfig) -> Option<JoinHandle<()>> {
    if !config.enabled || config.interval_minutes == 0 {
        info!("quest expiry sweep disabled");
        return None;
    }
    let period = Duration::from_secs(config.interval_minutes * 60);
    Some(tokio::spawn(async move {
        info!(
            "quest expiry sweep running every {} minute(s)",
            config.interval_minutes
        );
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; sweep once at startup to catch
        // quests that expired while the service was down.
        loop {
            ticker.tick().await;
            match handle.fail_expired_quests().await {
                Ok(0) => debug!("expiry sweep: nothing overdue"),
                Ok(swept) => info!("expiry sweep failed {} overdue quest(s)", swept),
                Err(StoreError::ServiceUnavailable) => {
                    debug!("expiry sweep stopping: service gone");
                    return;
                }
                Err(err) => warn!("expiry sweep error: {}", err),
            }
        }
    }))
}
