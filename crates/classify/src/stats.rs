//! Prediction statistics: atomic counters, rolling latency average and a
//! confidence-band histogram.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram bands over prediction confidence
const BAND_BOUNDS: [f64; 3] = [0.25, 0.50, 0.85];

/// Live statistics; counters are atomic, the histogram sits behind a short
/// critical section.
#[derive(Debug, Default)]
pub struct PerformanceStats {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    total_time_micros: AtomicU64,
    confidence_bands: Mutex<[u64; 4]>,
}

/// Consistent point-in-time view of [`PerformanceStats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_predictions: u64,
    pub successful_predictions: u64,
    pub failed_predictions: u64,
    pub cache_hits: u64,
    /// Rolling average over successful, non-cached predictions
    pub avg_processing_time_ms: f64,
    /// Counts per confidence band: [0, .25), [.25, .5), [.5, .85), [.85, 1]
    pub confidence_bands: [u64; 4],
}

impl PerformanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed prediction with its confidence and wall time
    pub fn record_success(&self, confidence: f64, elapsed: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.total_time_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        let band = BAND_BOUNDS.iter().filter(|b| confidence >= **b).count();
        let mut bands = self.confidence_bands.lock();
        bands[band] += 1;
    }

    pub fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hits count toward totals but never toward timing
    pub fn record_cache_hit(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let successful = self.successful.load(Ordering::Relaxed);
        let total_micros = self.total_time_micros.load(Ordering::Relaxed);
        let avg_processing_time_ms = if successful == 0 {
            0.0
        } else {
            total_micros as f64 / successful as f64 / 1000.0
        };
        StatsSnapshot {
            total_predictions: self.total.load(Ordering::Relaxed),
            successful_predictions: successful,
            failed_predictions: self.failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            avg_processing_time_ms,
            confidence_bands: *self.confidence_bands.lock(),
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.total_time_micros.store(0, Ordering::Relaxed);
        *self.confidence_bands.lock() = [0; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = PerformanceStats::new();
        stats.record_success(0.9, Duration::from_millis(10));
        stats.record_success(0.6, Duration::from_millis(20));
        stats.record_failure();
        stats.record_cache_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_predictions, 4);
        assert_eq!(snapshot.successful_predictions, 2);
        assert_eq!(snapshot.failed_predictions, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert!((snapshot.avg_processing_time_ms - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_bands() {
        let stats = PerformanceStats::new();
        stats.record_success(0.1, Duration::ZERO);
        stats.record_success(0.3, Duration::ZERO);
        stats.record_success(0.6, Duration::ZERO);
        stats.record_success(0.9, Duration::ZERO);
        stats.record_success(0.85, Duration::ZERO);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.confidence_bands, [1, 1, 1, 2]);
    }

    #[test]
    fn test_cache_hits_do_not_affect_timing() {
        let stats = PerformanceStats::new();
        stats.record_success(0.9, Duration::from_millis(10));
        stats.record_cache_hit();
        let snapshot = stats.snapshot();
        assert!((snapshot.avg_processing_time_ms - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        let stats = Arc::new(PerformanceStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.record_success(0.9, Duration::from_micros(100));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_predictions, 800);
        assert_eq!(snapshot.successful_predictions, 800);
        assert_eq!(snapshot.confidence_bands[3], 800);
    }

    #[test]
    fn test_reset() {
        let stats = PerformanceStats::new();
        stats.record_success(0.9, Duration::from_millis(5));
        stats.reset();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_predictions, 0);
        assert_eq!(snapshot.confidence_bands, [0; 4]);
    }
}
