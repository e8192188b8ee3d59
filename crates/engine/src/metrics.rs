use std::sync::atomic::{AtomicU64, Ordering};

/// Per-service, per-worker execution counters.
///
/// Mutated only by the owning worker; safe to read from any thread via [`Metrics::snapshot`].
#[derive(Debug, Default)]
pub struct Metrics {
    step_count: AtomicU64,
    total_step_nanos: AtomicU64,
    min_step_nanos: AtomicU64,
    max_step_nanos: AtomicU64,
    error_count: AtomicU64,
    consecutive_errors: AtomicU64,
}

/// A consistent point-in-time read of a [`Metrics`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub step_count: u64,
    pub total_step_nanos: u64,
    pub min_step_nanos: u64,
    pub max_step_nanos: u64,
    pub error_count: u64,
    pub consecutive_errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful work step and resets the consecutive-error counter.
    pub fn record_step(&self, nanos: u64) {
        self.step_count.fetch_add(1, Ordering::Relaxed);
        self.total_step_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.consecutive_errors.store(0, Ordering::Relaxed);

        self.min_step_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(if cur == 0 { nanos } else { cur.min(nanos) })
            })
            .ok();
        self.max_step_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.max(nanos))
            })
            .ok();
    }

    /// Records a failed work step; returns the updated consecutive-error count.
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn reset(&self) {
        self.step_count.store(0, Ordering::Relaxed);
        self.total_step_nanos.store(0, Ordering::Relaxed);
        self.min_step_nanos.store(0, Ordering::Relaxed);
        self.max_step_nanos.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        self.consecutive_errors.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            step_count: self.step_count.load(Ordering::Relaxed),
            total_step_nanos: self.total_step_nanos.load(Ordering::Relaxed),
            min_step_nanos: self.min_step_nanos.load(Ordering::Relaxed),
            max_step_nanos: self.max_step_nanos.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            consecutive_errors: self.consecutive_errors.load(Ordering::Relaxed),
        }
    }

    pub fn consecutive_errors(&self) -> u64 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_is_zero_until_first_sample() {
        let m = Metrics::new();
        assert_eq!(m.snapshot().min_step_nanos, 0);
        m.record_step(500);
        assert_eq!(m.snapshot().min_step_nanos, 500);
    }

    #[test]
    fn success_resets_consecutive_errors() {
        let m = Metrics::new();
        m.record_error();
        m.record_error();
        assert_eq!(m.consecutive_errors(), 2);
        m.record_step(10);
        assert_eq!(m.consecutive_errors(), 0);
    }

    #[test]
    fn min_and_max_track_extremes() {
        let m = Metrics::new();
        m.record_step(100);
        m.record_step(10);
        m.record_step(1000);
        let snap = m.snapshot();
        assert_eq!(snap.min_step_nanos, 10);
        assert_eq!(snap.max_step_nanos, 1000);
        assert_eq!(snap.step_count, 3);
        assert_eq!(snap.total_step_nanos, 1110);
    }

    #[test]
    fn record_error_returns_running_consecutive_count() {
        let m = Metrics::new();
        assert_eq!(m.record_error(), 1);
        assert_eq!(m.record_error(), 2);
        assert_eq!(m.record_error(), 3);
    }

    #[test]
    fn reset_clears_all_fields() {
        let m = Metrics::new();
        m.record_step(100);
        m.record_step(200);
        m.record_error();
        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
