use serde::Serialize;
use tokio::sync::watch;

/// Aggregate counters for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current >= self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current * 100) / self.total).min(100) as u8
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({}%) success: {} failed: {}",
            self.current,
            self.total,
            self.percent(),
            self.success,
            self.failed
        )
    }
}

/// Shared progress counters, published to any number of watchers.
///
/// Every write goes through `watch::Sender::send_modify`, so concurrent
/// sequencers never lose an increment. `update_stats` overwrites rather than
/// adds: callers recount from the account list each time.
pub struct ProgressAggregator {
    tx: watch::Sender<Progress>,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Progress::default());
        Self { tx }
    }

    pub fn set_total(&self, total: usize) {
        self.tx.send_modify(|p| {
            p.total = total;
            p.current = p.current.min(total);
        });
    }

    /// Zeroes `current`, `success` and `failed`; `total` is kept.
    pub fn reset(&self) {
        self.tx.send_modify(|p| {
            p.current = 0;
            p.success = 0;
            p.failed = 0;
        });
    }

    /// Bumps `current`, never past `total`.
    pub fn increment(&self) {
        self.tx.send_modify(|p| {
            p.current = (p.current + 1).min(p.total);
        });
    }

    pub fn update_stats(&self, success: usize, failed: usize) {
        self.tx.send_modify(|p| {
            p.success = success;
            p.failed = failed;
        });
    }

    pub fn snapshot(&self) -> Progress {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }
}
