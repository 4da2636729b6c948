// Performance metrics module
//
// Counters for account loading and transfers, logged once at shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide counters.
///
/// Atomic so loader tasks and the controller can record without locking.
#[derive(Debug)]
pub struct Metrics {
    /// Accounts accepted by discovery
    pub accounts_discovered: AtomicUsize,

    /// Avatars downloaded and cached
    pub avatars_fetched: AtomicUsize,

    /// Avatar downloads that failed
    pub avatar_failures: AtomicUsize,

    pub imports_succeeded: AtomicUsize,
    pub imports_failed: AtomicUsize,
    pub exports_succeeded: AtomicUsize,
    pub exports_failed: AtomicUsize,

    /// Time spent in imports and exports, in milliseconds
    pub total_transfer_time_ms: AtomicU64,

    /// Number of state updates performed
    pub state_updates: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            accounts_discovered: AtomicUsize::new(0),
            avatars_fetched: AtomicUsize::new(0),
            avatar_failures: AtomicUsize::new(0),
            imports_succeeded: AtomicUsize::new(0),
            imports_failed: AtomicUsize::new(0),
            exports_succeeded: AtomicUsize::new(0),
            exports_failed: AtomicUsize::new(0),
            total_transfer_time_ms: AtomicU64::new(0),
            state_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_accounts_discovered(&self, count: usize) {
        self.accounts_discovered.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one avatar download attempt
    pub fn record_avatar(&self, fetched: bool) {
        let counter = if fetched {
            &self.avatars_fetched
        } else {
            &self.avatar_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_import(&self, success: bool, duration: Duration) {
        let counter = if success {
            &self.imports_succeeded
        } else {
            &self.imports_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_transfer_time(duration);
    }

    pub fn record_export(&self, success: bool, duration: Duration) {
        let counter = if success {
            &self.exports_succeeded
        } else {
            &self.exports_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_transfer_time(duration);
    }

    fn record_transfer_time(&self, duration: Duration) {
        self.total_transfer_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a state update
    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Total imports and exports attempted
    pub fn transfers(&self) -> usize {
        self.imports_succeeded.load(Ordering::Relaxed)
            + self.imports_failed.load(Ordering::Relaxed)
            + self.exports_succeeded.load(Ordering::Relaxed)
            + self.exports_failed.load(Ordering::Relaxed)
    }

    /// Average transfer time in milliseconds
    pub fn avg_transfer_time_ms(&self) -> f64 {
        let total = self.total_transfer_time_ms.load(Ordering::Relaxed);
        match self.transfers() {
            0 => 0.0,
            count => total as f64 / count as f64,
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Accounts: {} discovered, avatars {} fetched / {} failed",
            self.accounts_discovered.load(Ordering::Relaxed),
            self.avatars_fetched.load(Ordering::Relaxed),
            self.avatar_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Imports: {} ok, {} failed; exports: {} ok, {} failed",
            self.imports_succeeded.load(Ordering::Relaxed),
            self.imports_failed.load(Ordering::Relaxed),
            self.exports_succeeded.load(Ordering::Relaxed),
            self.exports_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Transfer time: {:.2}s (avg: {:.2}ms), state updates: {}",
            self.total_transfer_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_transfer_time_ms(),
            self.state_updates.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.accounts_discovered.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.transfers(), 0);
    }

    #[test]
    fn test_record_avatars() {
        let metrics = Metrics::new();

        metrics.record_avatar(true);
        metrics.record_avatar(true);
        metrics.record_avatar(false);

        assert_eq!(metrics.avatars_fetched.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.avatar_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_transfers() {
        let metrics = Metrics::new();

        metrics.record_import(true, Duration::from_millis(100));
        metrics.record_export(false, Duration::from_millis(200));

        assert_eq!(metrics.imports_succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.exports_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_transfer_time_ms.load(Ordering::Relaxed), 300);
        assert_eq!(metrics.avg_transfer_time_ms(), 150.0);
    }

    #[test]
    fn test_avg_transfer_time_without_transfers() {
        assert_eq!(Metrics::new().avg_transfer_time_ms(), 0.0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
