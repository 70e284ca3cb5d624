use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::asset_registry::AssetRegistry;
use crate::application::router::Router;

/// Periodic background refresh loop. Each cycle walks enabled assets in
/// (priority asc, symbol asc) order and pulls an incremental window through
/// the Router with storage writes enabled. Per-asset errors are logged and
/// skipped; the loop itself never dies from them.
pub struct Collector {
    router: Arc<Router>,
    registry: Arc<AssetRegistry>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Collector {
    pub fn new(router: Arc<Router>, registry: Arc<AssetRegistry>, interval_seconds: u64) -> Self {
        Self {
            router,
            registry,
            interval: Duration::from_secs(interval_seconds),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn start(&self) -> JoinHandle<()> {
        let router = self.router.clone();
        let registry = self.registry.clone();
        let interval = self.interval;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }

                if let Err(e) = run_cycle(&router, &registry).await {
                    error!(error = %e, "collector: cycle-level failure, backing off 60s");
                    sleep_interruptible(Duration::from_secs(60), &shutdown).await;
                    continue;
                }

                sleep_interruptible(interval, &shutdown).await;
            }
            info!("collector: shut down");
        })
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Sleeps in 1s slices so a stop signal is observed within a second instead
/// of blocking for the full interval.
async fn sleep_interruptible(duration: Duration, shutdown: &AtomicBool) {
    let mut remaining = duration;
    let tick = Duration::from_secs(1);
    while remaining > Duration::ZERO {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let step = remaining.min(tick);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
}

async fn run_cycle(router: &Router, registry: &AssetRegistry) -> Result<(), crate::domain::errors::AppError> {
    let assets = registry.enabled_snapshot();
    let now = Utc::now();

    for asset in assets {
        let window_start = asset
            .last_collected
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| (now - chrono::Duration::days(365)).date_naive());
        let window_end = now.date_naive();

        match router
            .fetch_historical(&asset.symbol, window_start, window_end, None)
            .await
        {
            Ok(observations) if !observations.is_empty() => {
                info!(
                    symbol = asset.symbol.as_str(),
                    count = observations.len(),
                    "collector: refreshed asset"
                );
                registry.mark_collected(&asset.symbol, now);
            }
            Ok(_) => {
                warn!(symbol = asset.symbol.as_str(), "collector: empty batch, last_collected unchanged");
            }
            Err(e) => {
                warn!(symbol = asset.symbol.as_str(), error = %e, "collector: asset refresh failed, continuing");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_flag_halts_the_interruptible_sleep_promptly() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_task = shutdown.clone();
        let start = std::time::Instant::now();
        let handle = tokio::spawn(async move {
            sleep_interruptible(Duration::from_secs(30), &shutdown_for_task).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.store(true, Ordering::Relaxed);
        handle.await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
