// src/realtime/health.rs - Heartbeat monitor shared by all subscriptions

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Shared;

/// Every heartbeat interval: flag a stale connection, then queue a
/// heartbeat on every open socket. Runs until `cancel` fires.
pub(crate) async fn monitor(shared: Arc<Shared>, cancel: CancellationToken) {
    // tokio intervals reject a zero period
    let period = shared.config.heartbeat_interval().max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => shared.health_tick(),
        }
    }
    tracing::debug!("Heartbeat monitor stopped");
}
