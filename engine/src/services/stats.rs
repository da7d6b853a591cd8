//! Engine usage counters and inference latency percentiles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Cap on retained latency samples; older half is dropped beyond this.
const MAX_LATENCY_SAMPLES: usize = 10_000;

#[derive(Debug, Default)]
pub struct EngineStats {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
    /// Inference times in nanoseconds, bounded window
    latencies: Mutex<Vec<u128>>,
}

impl EngineStats {
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency_ns: u128) {
        let mut times = match self.latencies.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        times.push(latency_ns);
        if times.len() > MAX_LATENCY_SAMPLES {
            let cut = times.len() - MAX_LATENCY_SAMPLES / 2;
            *times = times[cut..].to_vec();
        }
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        let times = self
            .latencies
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        let (p50_ms, p95_ms, p99_ms, avg_ms) = if times.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let mut sorted = times;
            sorted.sort_unstable();
            let len = sorted.len();
            let p50 = sorted[len / 2];
            let p95 = sorted[(((len as f64) * 0.95) as usize).min(len - 1)];
            let p99 = sorted[(((len as f64) * 0.99) as usize).min(len - 1)];
            let avg = sorted.iter().sum::<u128>() / len as u128;
            (
                p50 as f64 / 1_000_000.0,
                p95 as f64 / 1_000_000.0,
                p99 as f64 / 1_000_000.0,
                avg as f64 / 1_000_000.0,
            )
        };

        EngineStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            p50_ms,
            p95_ms,
            p99_ms,
            avg_ms,
        }
    }
}

/// Point-in-time view of engine usage
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStatsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub errors: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub avg_ms: f64,
}
