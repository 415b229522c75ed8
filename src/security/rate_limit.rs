//! Per-address fixed-window rate limiting.
//!
//! Each source address gets a counter that resets once its window has
//! elapsed. Bursts straddling a window boundary can see up to twice the
//! limit; that is the accepted cost of a fixed window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::pipeline::{Denial, GateDecision};

/// Counter state for one source address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub window_start: Instant,
    pub count: u64,
}

impl RateLimitRecord {
    fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 1,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Fixed-window limiter owning its per-address state.
///
/// Construct one per server (or per test); nothing here is global.
#[derive(Debug)]
pub struct RateLimiter {
    records: DashMap<String, RateLimitRecord>,
    window: Duration,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u64) -> Self {
        Self {
            records: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms), config.max_requests)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Count a request from `source` at `now` and decide whether it may pass.
    ///
    /// The entry guard holds the shard lock for the whole check-reset-increment
    /// sequence, so concurrent requests from one address cannot both observe a
    /// stale count.
    pub fn evaluate(&self, source: &str, now: Instant) -> GateDecision {
        let decision = match self.records.entry(source.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitRecord::starting_at(now));
                None
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.expired(now, self.window) {
                    *record = RateLimitRecord::starting_at(now);
                } else {
                    // Requests past the limit keep counting, but one over the
                    // limit is enough to deny until the window resets.
                    record.count = record.count.saturating_add(1).min(self.max_requests.saturating_add(1));
                }
                Some(self.decide(record.count))
            }
        };

        // len() takes every shard lock, so only after the entry guard is gone
        decision.unwrap_or_else(|| {
            metrics::record_tracked_addresses(self.tracked_addresses());
            self.decide(1)
        })
    }

    fn decide(&self, count: u64) -> GateDecision {
        if count > self.max_requests {
            GateDecision::Deny(Denial::TOO_MANY_REQUESTS)
        } else {
            GateDecision::Allow(())
        }
    }

    /// Snapshot of one address's record.
    pub fn record(&self, source: &str) -> Option<RateLimitRecord> {
        self.records.get(source).map(|r| *r)
    }

    /// Number of addresses currently tracked.
    pub fn tracked_addresses(&self) -> usize {
        self.records.len()
    }

    /// Drop records whose window has expired. Returns how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.records.len();
        let window = self.window;
        self.records.retain(|_, record| !record.expired(now, window));
        before.saturating_sub(self.records.len())
    }

    /// Periodically prune expired records until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        if interval.is_zero() {
            tracing::info!("Rate limit sweeper disabled");
            return;
        }

        tracing::info!(interval_ms = interval.as_millis() as u64, "Rate limit sweeper starting");

        let mut ticker = time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.prune(Instant::now());
                    let tracked = self.tracked_addresses();
                    if removed > 0 {
                        tracing::debug!(removed, tracked, "Pruned expired rate limit records");
                    }
                    metrics::record_tracked_addresses(tracked);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
