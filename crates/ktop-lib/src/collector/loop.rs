//! Periodic collection loop
//!
//! Runs one cycle immediately, then on every interval tick or manual
//! refresh request. Cycles never overlap: a refresh requested while a
//! cycle is running is queued (at most one) and served afterwards.

use super::Collector;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Shortest accepted refresh interval
pub const MIN_INTERVAL: Duration = Duration::from_millis(500);
/// Longest accepted refresh interval
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between cycles (default: 2 seconds)
    pub interval: Duration,
    /// Deadline for all reads of one cycle (default: 10 seconds)
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PollingConfig {
    /// Clamp the interval into `MIN_INTERVAL..=MAX_INTERVAL`
    pub fn clamped(mut self) -> Self {
        self.interval = self.interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        self
    }
}

/// Requests an out-of-band collection cycle
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Queue a refresh; returns false if one is already pending
    pub fn request(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Counters returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollingStats {
    pub succeeded: u64,
    pub failed: u64,
}

impl PollingStats {
    pub fn cycles(&self) -> u64 {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Tick,
    Manual,
}

/// Polling loop that drives a [`Collector`]
pub struct PollingLoop {
    collector: Arc<Collector>,
    config: PollingConfig,
    refresh_rx: mpsc::Receiver<()>,
    stats: PollingStats,
}

impl PollingLoop {
    /// Create a loop; the interval is clamped to the accepted range
    pub fn new(collector: Arc<Collector>, config: PollingConfig) -> (Self, RefreshHandle) {
        // Capacity 1: further requests coalesce into the pending one
        let (tx, refresh_rx) = mpsc::channel(1);

        let polling_loop = Self {
            collector,
            config: config.clamped(),
            refresh_rx,
            stats: PollingStats::default(),
        };

        (polling_loop, RefreshHandle { tx })
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Run until `shutdown` fires or its sender is dropped
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> PollingStats {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Starting collection loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let trigger = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutting down collection loop");
                    break;
                }
                _ = ticker.tick() => Trigger::Tick,
                Some(()) = self.refresh_rx.recv() => Trigger::Manual,
            };

            self.cycle(trigger).await;
        }

        self.stats
    }

    async fn cycle(&mut self, trigger: Trigger) {
        let start = Instant::now();

        match self.collector.collect(self.config.timeout).await {
            Ok(snapshot) => {
                self.stats.succeeded += 1;
                debug!(
                    trigger = ?trigger,
                    nodes = snapshot.nodes.len(),
                    pods = snapshot.pods.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Collection cycle complete"
                );
            }
            Err(e) => {
                // Already logged by the collector; the previous snapshot stays up
                self.stats.failed += 1;
                debug!(trigger = ?trigger, kind = e.kind(), "Collection cycle discarded");
            }
        }
    }
}

/// Builder for the polling loop
pub struct PollingLoopBuilder {
    collector: Option<Arc<Collector>>,
    config: PollingConfig,
}

impl PollingLoopBuilder {
    pub fn new() -> Self {
        Self {
            collector: None,
            config: PollingConfig::default(),
        }
    }

    pub fn collector(mut self, collector: Arc<Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<(PollingLoop, RefreshHandle)> {
        let collector = self
            .collector
            .ok_or_else(|| anyhow::anyhow!("Collector is required"))?;

        Ok(PollingLoop::new(collector, self.config))
    }
}

impl Default for PollingLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
