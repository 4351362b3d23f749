//! Per-route API metrics.
//!
//! When metrics are enabled every mounted handler is wrapped by
//! [`metrics_decorator`], which counts calls by status code and records
//! latencies into a fixed-bucket histogram. [`ApiMetrics::render`] produces
//! the Prometheus text exposition format served on `/metrics`.

use super::service::{Decorator, HandlerFn};

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use dashmap::DashMap;
use futures::FutureExt;
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Histogram upper bounds, in seconds.
pub const LATENCY_BUCKETS: [f64; 11] = [
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RequestKey {
    route: String,
    method: String,
    code: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct LatencyKey {
    route: String,
    method: String,
}

#[derive(Debug, Default)]
struct Histogram {
    buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    count: AtomicU64,
    sum_micros: AtomicU64,
}

impl Histogram {
    fn observe(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        for (bound, bucket) in LATENCY_BUCKETS.iter().zip(self.buckets.iter()) {
            if secs <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Request counters and latency histograms keyed by route and method.
#[derive(Debug, Default)]
pub struct ApiMetrics {
    requests: DashMap<RequestKey, AtomicU64>,
    latencies: DashMap<LatencyKey, Histogram>,
}

impl ApiMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn observe(&self, route: &str, method: &Method, status: StatusCode, elapsed: Duration) {
        let key = RequestKey {
            route: route.to_string(),
            method: method.as_str().to_string(),
            code: status.as_u16(),
        };
        self.requests
            .entry(key)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);

        let key = LatencyKey {
            route: route.to_string(),
            method: method.as_str().to_string(),
        };
        self.latencies.entry(key).or_default().observe(elapsed);
    }

    /// Number of calls recorded for `route` and `method` with status `code`.
    pub fn request_count(&self, route: &str, method: &Method, code: u16) -> u64 {
        let key = RequestKey {
            route: route.to_string(),
            method: method.as_str().to_string(),
            code,
        };
        self.requests
            .get(&key)
            .map(|counter| counter.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let mut requests: Vec<(RequestKey, u64)> = self
            .requests
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        requests.sort();

        out.push_str("# HELP http_requests_total Total number of handled HTTP requests.\n");
        out.push_str("# TYPE http_requests_total counter\n");
        for (key, count) in requests {
            let _ = writeln!(
                out,
                "http_requests_total{{route=\"{}\",method=\"{}\",code=\"{}\"}} {}",
                escape_label(&key.route),
                key.method,
                key.code,
                count
            );
        }

        let mut keys: Vec<LatencyKey> = self
            .latencies
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        out.push_str("# HELP http_request_duration_seconds HTTP request latencies in seconds.\n");
        out.push_str("# TYPE http_request_duration_seconds histogram\n");
        for key in keys {
            let Some(histogram) = self.latencies.get(&key) else {
                continue;
            };
            let labels = format!(
                "route=\"{}\",method=\"{}\"",
                escape_label(&key.route),
                key.method
            );
            for (bound, bucket) in LATENCY_BUCKETS.iter().zip(histogram.buckets.iter()) {
                let _ = writeln!(
                    out,
                    "http_request_duration_seconds_bucket{{{},le=\"{}\"}} {}",
                    labels,
                    bound,
                    bucket.load(Ordering::Relaxed)
                );
            }
            let count = histogram.count.load(Ordering::Relaxed);
            let _ = writeln!(
                out,
                "http_request_duration_seconds_bucket{{{},le=\"+Inf\"}} {}",
                labels, count
            );
            let sum = histogram.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            let _ = writeln!(out, "http_request_duration_seconds_sum{{{}}} {}", labels, sum);
            let _ = writeln!(out, "http_request_duration_seconds_count{{{}}} {}", labels, count);
        }

        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Decorator recording every call of the wrapped handler into `metrics`.
pub fn metrics_decorator(metrics: Arc<ApiMetrics>) -> Decorator {
    Arc::new(move |route: &str, inner: HandlerFn| {
        let metrics = metrics.clone();
        let route = route.to_string();
        let wrapped: HandlerFn = Arc::new(move |req: Request| {
            let metrics = metrics.clone();
            let route = route.clone();
            let method = req.method().clone();
            let start = Instant::now();
            let call = inner(req);
            async move {
                let response = call.await;
                metrics.observe(&route, &method, response.status(), start.elapsed());
                response
            }
            .boxed()
        });
        wrapped
    })
}
