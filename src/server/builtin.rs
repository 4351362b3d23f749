//! Built-in services installed by the server itself.
//!
//! They implement [`Service`] like any user service, so they are mounted
//! through the same path (decoration included) and show up in discovery.

use super::config::{BUILD_DATE, RUSTC_VERSION, VERSION};
use super::error::ApiError;
use super::inflight::InFlightTracker;
use super::metrics::ApiMetrics;
use super::service::{Endpoint, Service};
use crate::registry::{ApiGroup, Resource, ServiceRegistry};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{Method, header};
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;

pub const GROUP_VERSION: &str = "/version";
pub const GROUP_DISCOVERY: &str = "/apis";
pub const GROUP_METRICS: &str = "/metrics";
pub const GROUP_PPROF: &str = "/debug/pprof";

// --- Version ---

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_date: &'static str,
    pub rustc_version: &'static str,
}

pub struct VersionService;

impl Service for VersionService {
    fn api_group(&self) -> String {
        GROUP_VERSION.to_string()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        vec![Endpoint::stateless(
            Resource::new("version", "/", Method::GET),
            handle_version,
        )]
    }
}

async fn handle_version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: VERSION,
        build_date: BUILD_DATE,
        rustc_version: RUSTC_VERSION,
    })
}

// --- Discovery ---

pub struct DiscoveryService {
    registry: Arc<ServiceRegistry>,
}

impl DiscoveryService {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }
}

impl Service for DiscoveryService {
    fn api_group(&self) -> String {
        GROUP_DISCOVERY.to_string()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        vec![
            Endpoint::new(
                Resource::new("apis", "/", Method::GET),
                handle_list_groups,
                self.registry.clone(),
            ),
            Endpoint::new(
                Resource::new("apigroup", "/*group", Method::GET),
                handle_list_resources,
                self.registry.clone(),
            ),
        ]
    }
}

async fn handle_list_groups(State(registry): State<Arc<ServiceRegistry>>) -> Json<Value> {
    Json(json!({ "apis": registry.list_groups() }))
}

async fn handle_list_resources(
    State(registry): State<Arc<ServiceRegistry>>,
    Path(group): Path<String>,
) -> Result<Json<ApiGroup>, ApiError> {
    registry
        .list_resources(&group)
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("APIGroup:{} not found", group.trim_matches('/')))
        })
}

// --- Metrics ---

pub struct MetricsService {
    metrics: Arc<ApiMetrics>,
}

impl MetricsService {
    pub fn new(metrics: Arc<ApiMetrics>) -> Self {
        Self { metrics }
    }
}

impl Service for MetricsService {
    fn api_group(&self) -> String {
        GROUP_METRICS.to_string()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        vec![Endpoint::new(
            Resource::new("metrics", "/", Method::GET),
            handle_metrics,
            self.metrics.clone(),
        )]
    }
}

async fn handle_metrics(State(metrics): State<Arc<ApiMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}

// --- Profiling ---

#[derive(Clone)]
pub struct ProfilingState {
    started: Instant,
    in_flight: Arc<InFlightTracker>,
}

pub struct ProfilingService {
    state: ProfilingState,
}

impl ProfilingService {
    pub fn new(in_flight: Arc<InFlightTracker>) -> Self {
        Self {
            state: ProfilingState {
                started: Instant::now(),
                in_flight,
            },
        }
    }
}

impl Service for ProfilingService {
    fn api_group(&self) -> String {
        GROUP_PPROF.to_string()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        vec![
            Endpoint::stateless(Resource::new("index", "/", Method::GET), handle_pprof_index),
            Endpoint::new(
                Resource::new("runtime", "/runtime", Method::GET),
                handle_pprof_runtime,
                self.state.clone(),
            ),
            Endpoint::stateless(
                Resource::new("cmdline", "/cmdline", Method::GET),
                handle_pprof_cmdline,
            ),
        ]
    }
}

async fn handle_pprof_index() -> Json<Value> {
    Json(json!({
        "profiles": [
            { "name": "runtime", "path": "/debug/pprof/runtime" },
            { "name": "cmdline", "path": "/debug/pprof/cmdline" },
        ]
    }))
}

async fn handle_pprof_runtime(State(state): State<ProfilingState>) -> Json<Value> {
    let metrics = tokio::runtime::Handle::current().metrics();
    Json(json!({
        "uptime_seconds": state.started.elapsed().as_secs_f64(),
        "workers": metrics.num_workers(),
        "alive_tasks": metrics.num_alive_tasks(),
        "global_queue_depth": metrics.global_queue_depth(),
        "in_flight_requests": state.in_flight.snapshot(),
    }))
}

async fn handle_pprof_cmdline() -> impl IntoResponse {
    let args: Vec<String> = std::env::args().collect();
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        args.join("\0"),
    )
}
