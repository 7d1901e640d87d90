//! Periodic reclamation of idle sessions.
//!
//! Sessions live in process memory until removed. When
//! `sessions.idle_timeout_secs` is configured, a reaper task calls
//! [`SessionRegistry::reap_idle`] on a fixed interval so abandoned sessions
//! do not accumulate.

use std::sync::Arc;
use std::time::Duration;

use selection_engine::SessionRegistry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Reaper settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionReaper {
    /// Sessions idle at least this long are removed.
    pub idle_timeout: Duration,
    /// Time between sweeps.
    pub interval: Duration,
}

impl SessionReaper {
    /// Run one sweep, returning how many sessions were removed.
    pub fn sweep(&self, registry: &SessionRegistry) -> usize {
        let reaped = registry.reap_idle(self.idle_timeout);
        if reaped > 0 {
            tracing::info!(
                reaped,
                remaining = registry.len(),
                idle_timeout_secs = self.idle_timeout.as_secs(),
                "Reclaimed idle sessions"
            );
        }
        reaped
    }
}

/// Spawn the reaper loop. The first sweep happens after one interval.
pub fn spawn_reaper(registry: Arc<SessionRegistry>, reaper: SessionReaper) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reaper.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            reaper.sweep(&registry);
        }
    })
}
