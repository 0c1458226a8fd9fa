//! Latency, throughput and memory benchmarking of the prediction service.

use crate::service::PredictionService;
use media_butler_core::cancellation::CancellationSignal;
use media_butler_core::error::MediaButlerError;
use media_butler_core::math::{mean, percentile_sorted};
use media_butler_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between resource samples
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Benchmark run parameters and pass/fail thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Unmeasured predictions run first to warm caches and branch
    /// predictors
    pub warmup_count: usize,
    pub prediction_count: usize,
    /// Filenames cycled through for the run
    pub benchmark_filenames: Vec<String>,
    pub max_average_latency_ms: Option<f64>,
    pub max_p95_latency_ms: Option<f64>,
    pub min_throughput_per_sec: Option<f64>,
    pub max_memory_mb: Option<f64>,
    pub sample_cpu: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_count: 10,
            prediction_count: 100,
            benchmark_filenames: Vec::new(),
            max_average_latency_ms: None,
            max_p95_latency_ms: None,
            min_throughput_per_sec: None,
            max_memory_mb: None,
            sample_cpu: false,
        }
    }
}

/// Resident memory sampled during the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub peak_rss_mb: f64,
    pub average_rss_mb: f64,
    pub samples: usize,
}

/// Benchmark outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceBenchmark {
    pub prediction_count: usize,
    pub average_latency_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub throughput_per_sec: f64,
    pub memory: Option<MemoryStats>,
    pub cpu_percent: Option<f64>,
    pub elapsed_ms: f64,
    /// All configured thresholds held
    pub passed: bool,
    pub violations: Vec<String>,
}

/// Run a benchmark against a ready service.
///
/// Warmup predictions are not measured. Resident memory is sampled every
/// 100 ms on a background task. Cancellation is honored between
/// predictions.
pub async fn run_benchmark(
    service: &PredictionService,
    config: &BenchmarkConfig,
    cancellation: Option<&CancellationSignal>,
) -> Result<PerformanceBenchmark> {
    if config.benchmark_filenames.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }
    if !service.is_ready() {
        return Err(MediaButlerError::ModelNotLoaded);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let rss_samples: Arc<parking_lot::Mutex<Vec<f64>>> =
        Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sampler = {
        let stop = Arc::clone(&stop);
        let rss_samples = Arc::clone(&rss_samples);
        tokio::spawn(async move {
            while !stop.load(Ordering::Relaxed) {
                if let Some(rss) = read_rss_mb() {
                    rss_samples.lock().push(rss);
                }
                tokio::time::sleep(SAMPLE_INTERVAL).await;
            }
        })
    };

    let cpu_before = config.sample_cpu.then(read_cpu_seconds).flatten();

    let cycle = |i: usize| &config.benchmark_filenames[i % config.benchmark_filenames.len()];
    let run_result: Result<(Vec<f64>, f64)> = (|| {
        for i in 0..config.warmup_count {
            if let Some(signal) = cancellation {
                signal.checkpoint()?;
            }
            let _ = service.predict(cycle(i))?;
        }

        let measured_span = Instant::now();
        let mut timings = Vec::with_capacity(config.prediction_count);
        for i in 0..config.prediction_count {
            if let Some(signal) = cancellation {
                signal.checkpoint()?;
            }
            let started = Instant::now();
            let _ = service.predict(cycle(i))?;
            timings.push(started.elapsed().as_secs_f64() * 1000.0);
        }
        Ok((timings, measured_span.elapsed().as_secs_f64() * 1000.0))
    })();

    stop.store(true, Ordering::Relaxed);
    let _ = sampler.await;
    let (timings, elapsed_ms) = run_result?;

    let mut sorted = timings.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let average_latency_ms = mean(&timings);
    let median_latency_ms = percentile_sorted(&sorted, 50.0);
    let p95_latency_ms = percentile_sorted(&sorted, 95.0);
    let p99_latency_ms = percentile_sorted(&sorted, 99.0);
    let throughput_per_sec = if elapsed_ms > 0.0 {
        timings.len() as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };

    let samples = rss_samples.lock().clone();
    let memory = if samples.is_empty() {
        None
    } else {
        Some(MemoryStats {
            peak_rss_mb: samples.iter().copied().fold(0.0, f64::max),
            average_rss_mb: mean(&samples),
            samples: samples.len(),
        })
    };

    let cpu_percent = match (cpu_before, config.sample_cpu.then(read_cpu_seconds).flatten()) {
        (Some(before), Some(after)) if elapsed_ms > 0.0 => {
            Some(((after - before) / (elapsed_ms / 1000.0)) * 100.0)
        }
        _ => None,
    };

    let mut violations = Vec::new();
    if let Some(max) = config.max_average_latency_ms {
        if average_latency_ms > max {
            violations.push(format!(
                "average latency {average_latency_ms:.2}ms exceeds {max:.2}ms"
            ));
        }
    }
    if let Some(max) = config.max_p95_latency_ms {
        if p95_latency_ms > max {
            violations.push(format!("p95 latency {p95_latency_ms:.2}ms exceeds {max:.2}ms"));
        }
    }
    if let Some(min) = config.min_throughput_per_sec {
        if throughput_per_sec < min {
            violations.push(format!(
                "throughput {throughput_per_sec:.1}/s below {min:.1}/s"
            ));
        }
    }
    if let (Some(max), Some(stats)) = (config.max_memory_mb, memory.as_ref()) {
        if stats.peak_rss_mb > max {
            violations.push(format!(
                "peak RSS {:.1}MB exceeds {max:.1}MB",
                stats.peak_rss_mb
            ));
        }
    }

    let benchmark = PerformanceBenchmark {
        prediction_count: timings.len(),
        average_latency_ms,
        median_latency_ms,
        p95_latency_ms,
        p99_latency_ms,
        throughput_per_sec,
        memory,
        cpu_percent,
        elapsed_ms,
        passed: violations.is_empty(),
        violations,
    };
    tracing::info!(
        predictions = benchmark.prediction_count,
        avg_ms = benchmark.average_latency_ms,
        p95_ms = benchmark.p95_latency_ms,
        throughput = benchmark.throughput_per_sec,
        passed = benchmark.passed,
        "Benchmark complete"
    );
    Ok(benchmark)
}

/// Resident set size in MB from /proc, where available
#[cfg(target_os = "linux")]
fn read_rss_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn read_rss_mb() -> Option<f64> {
    None
}

/// Combined user+system CPU seconds of this process
#[cfg(target_os = "linux")]
fn read_cpu_seconds() -> Option<f64> {
    let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
    // Fields 14 and 15 (1-based) are utime and stime in clock ticks; the
    // command field may contain spaces, so skip past the closing paren.
    let after_comm = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let utime: f64 = fields.get(11)?.parse().ok()?;
    let stime: f64 = fields.get(12)?.parse().ok()?;
    Some((utime + stime) / 100.0)
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_seconds() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::train_model;
    use crate::registry::CategoryRegistry;
    use crate::training::{SampleSource, TrainingSample};
    use media_butler_core::config::ClassifierConfig;

    fn ready_service() -> PredictionService {
        let samples = vec![
            TrainingSample::new(
                "Il.Trono.Di.Spade.8x04.ITA.WEBMux.x264-UBi.mkv",
                "IL TRONO DI SPADE",
                1.0,
                SampleSource::ManuallyCurated,
            ),
            TrainingSample::new(
                "One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv",
                "ONE PIECE",
                1.0,
                SampleSource::ManuallyCurated,
            ),
        ];
        let config = ClassifierConfig::default();
        let model = train_model(&samples, &config, "1.0.0").unwrap();
        let service = PredictionService::new(config, Arc::new(CategoryRegistry::new()));
        service.load_model(model).unwrap();
        service
    }

    fn bench_config(count: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            warmup_count: 2,
            prediction_count: count,
            benchmark_filenames: vec![
                "Il.Trono.Di.Spade.8x04.ITA.WEBMux.x264-UBi.mkv".to_string(),
                "One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv".to_string(),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_benchmark_basic_run() {
        let service = ready_service();
        let benchmark = run_benchmark(&service, &bench_config(20), None)
            .await
            .unwrap();

        assert_eq!(benchmark.prediction_count, 20);
        assert!(benchmark.average_latency_ms >= 0.0);
        assert!(benchmark.p95_latency_ms >= benchmark.median_latency_ms);
        assert!(benchmark.p99_latency_ms >= benchmark.p95_latency_ms);
        assert!(benchmark.throughput_per_sec > 0.0);
        assert!(benchmark.passed);
        assert!(benchmark.violations.is_empty());
    }

    #[tokio::test]
    async fn test_benchmark_threshold_violation() {
        let service = ready_service();
        let config = BenchmarkConfig {
            // Impossible threshold: everything takes longer than 0 ms.
            max_average_latency_ms: Some(0.0),
            ..bench_config(5)
        };
        let benchmark = run_benchmark(&service, &config, None).await.unwrap();
        assert!(!benchmark.passed);
        assert_eq!(benchmark.violations.len(), 1);
    }

    #[tokio::test]
    async fn test_benchmark_requires_filenames() {
        let service = ready_service();
        let config = BenchmarkConfig::default();
        assert!(matches!(
            run_benchmark(&service, &config, None).await,
            Err(MediaButlerError::EmptyDataset)
        ));
    }

    #[tokio::test]
    async fn test_benchmark_requires_model() {
        let service = PredictionService::new(
            ClassifierConfig::default(),
            Arc::new(CategoryRegistry::new()),
        );
        assert!(matches!(
            run_benchmark(&service, &bench_config(5), None).await,
            Err(MediaButlerError::ModelNotLoaded)
        ));
    }

    #[tokio::test]
    async fn test_benchmark_cancellation() {
        let service = ready_service();
        let signal = CancellationSignal::new();
        signal.cancel();
        let result = run_benchmark(&service, &bench_config(5), Some(&signal)).await;
        assert!(matches!(result, Err(MediaButlerError::Cancelled)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rss_readable_on_linux() {
        let rss = read_rss_mb().unwrap();
        assert!(rss > 0.0);
    }
}
