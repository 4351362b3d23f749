//! In-flight request tracking.
//!
//! Every request passing through the router is recorded for as long as its
//! handler runs, so a graceful drain that times out can report exactly which
//! requests were still outstanding.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Clone)]
struct InFlightEntry {
    method: String,
    route: String,
    uri: String,
    started: Instant,
}

#[derive(Debug, Default)]
pub struct InFlightTracker {
    next_id: AtomicU64,
    requests: DashMap<u64, InFlightEntry>,
}

/// Removes its request from the tracker when dropped, including when the
/// handler future is cancelled mid-flight.
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.requests.remove(&self.id);
    }
}

impl InFlightTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn begin(
        self: &Arc<Self>,
        method: &str,
        route: &str,
        uri: &str,
    ) -> InFlightGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.requests.insert(
            id,
            InFlightEntry {
                method: method.to_string(),
                route: route.to_string(),
                uri: uri.to_string(),
                started: Instant::now(),
            },
        );
        InFlightGuard {
            tracker: self.clone(),
            id,
        }
    }

    pub fn count(&self) -> usize {
        self.requests.len()
    }

    /// Describes each outstanding request as `METHOD route (uri) for 1.2s`,
    /// oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        let mut entries: Vec<(u64, InFlightEntry)> = self
            .requests
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
            .into_iter()
            .map(|(_, e)| {
                format!(
                    "{} {} ({}) for {:.1}s",
                    e.method,
                    e.route,
                    e.uri,
                    e.started.elapsed().as_secs_f64()
                )
            })
            .collect()
    }
}

/// Router middleware registering the request for the duration of the call.
pub async fn track_in_flight(
    State(tracker): State<Arc<InFlightTracker>>,
    req: Request,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let _guard = tracker.begin(req.method().as_str(), &route, &req.uri().to_string());
    next.run(req).await
}
