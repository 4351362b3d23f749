use super::builtin::{DiscoveryService, MetricsService, ProfilingService, VersionService};
use super::config::Config;
use super::error::ServerError;
use super::inflight::{InFlightTracker, track_in_flight};
use super::metrics::{ApiMetrics, metrics_decorator};
use super::service::{Decorator, HandlerFn, Service, identity_decorator, route_path};
use crate::registry::ServiceRegistry;
use crate::storage::protocol::MAX_BODY_LEN;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::Method;
use axum::routing::{MethodFilter, MethodRouter};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Mount {
    path: String,
    filter: MethodFilter,
    handler: HandlerFn,
}

/// Composes services into one HTTP server and owns its lifecycle.
///
/// Services are mounted with [`Server::register_service`]; [`Server::run`]
/// (or [`Server::bind`] + [`BoundServer::serve`]) adds the built-in routes,
/// binds the listener and serves until a [`ShutdownHandle`] fires.
pub struct Server {
    config: Config,
    registry: Arc<ServiceRegistry>,
    decorate: Decorator,
    metrics: Option<Arc<ApiMetrics>>,
    in_flight: Arc<InFlightTracker>,
    mounts: Vec<Mount>,
    routes: HashSet<(Method, String)>,
    paths: Vec<String>,
    shutdown: ShutdownHandle,
}

impl Server {
    pub fn new(config: Config) -> Self {
        // Decided once here; handlers never check the flag per request.
        let metrics = config.enable_metrics.then(ApiMetrics::new);
        let decorate = match &metrics {
            Some(metrics) => metrics_decorator(metrics.clone()),
            None => identity_decorator(),
        };

        Self {
            config,
            registry: ServiceRegistry::new(),
            decorate,
            metrics,
            in_flight: InFlightTracker::new(),
            mounts: Vec::new(),
            routes: HashSet::new(),
            paths: Vec::new(),
            shutdown: ShutdownHandle::new(),
        }
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Option<Arc<ApiMetrics>> {
        self.metrics.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Mounts every endpoint of `service` below its API group and records
    /// the resources in the registry.
    ///
    /// All endpoints are validated first; if any is rejected nothing of
    /// the service is mounted.
    pub fn register_service<S: Service + ?Sized>(
        &mut self,
        service: &S,
    ) -> Result<(), ServerError> {
        let group = service.api_group();
        let endpoints = service.handlers();

        let mut staged = Vec::with_capacity(endpoints.len());
        let mut staged_routes: HashSet<(Method, String)> = HashSet::new();
        let mut staged_paths: Vec<String> = Vec::new();

        for endpoint in endpoints {
            let path = route_path(&group, &endpoint.resource.path);
            validate_path(&path)?;

            let method = endpoint.resource.method.clone();
            let filter = MethodFilter::try_from(method.clone()).map_err(|_| {
                ServerError::UnsupportedMethod {
                    method: method.clone(),
                    path: path.clone(),
                }
            })?;

            let key = (method.clone(), path.clone());
            if self.routes.contains(&key) || !staged_routes.insert(key) {
                return Err(ServerError::DuplicateRoute { method, path });
            }

            if !self.paths.contains(&path) && !staged_paths.contains(&path) {
                if let Some(existing) = self
                    .paths
                    .iter()
                    .chain(staged_paths.iter())
                    .find(|existing| paths_conflict(existing, &path))
                {
                    return Err(ServerError::ConflictingRoute {
                        path,
                        existing: existing.clone(),
                    });
                }
                staged_paths.push(path.clone());
            }

            staged.push((path, filter, endpoint));
        }

        for (path, filter, endpoint) in staged {
            tracing::info!(
                "Mounted {} {} ({})",
                endpoint.resource.method,
                path,
                endpoint.resource.name
            );
            let handler = (self.decorate)(&path, endpoint.handler);
            self.routes
                .insert((endpoint.resource.method.clone(), path.clone()));
            self.mounts.push(Mount {
                path,
                filter,
                handler,
            });
            self.registry.add_resource(&group, endpoint.resource);
        }
        self.paths.extend(staged_paths);

        Ok(())
    }

    /// Installs the built-in routes, binds and serves until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await
    }

    /// Installs the built-in routes and binds the listener without serving yet.
    pub async fn bind(mut self) -> Result<BoundServer, ServerError> {
        self.register_service(&VersionService)?;
        self.register_service(&DiscoveryService::new(self.registry.clone()))?;
        if self.config.enable_pprof {
            self.register_service(&ProfilingService::new(self.in_flight.clone()))?;
        }
        if let Some(metrics) = self.metrics.clone() {
            self.register_service(&MetricsService::new(metrics))?;
        }

        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        tracing::info!("HTTP server listening on {}", local_addr);

        let grace = self.config.grace_shutdown_timeout();
        let router = self.build_router();

        Ok(BoundServer {
            listener,
            local_addr,
            router,
            grace,
            in_flight: self.in_flight,
            shutdown: self.shutdown,
        })
    }

    fn build_router(&mut self) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for mount in self.mounts.drain(..) {
            let handler = mount.handler;
            let method_router = by_path
                .remove(&mount.path)
                .unwrap_or_else(MethodRouter::new);
            by_path.insert(
                mount.path,
                method_router.on(mount.filter, move |req: Request| handler(req)),
            );
        }

        let mut router = Router::new();
        for (path, method_router) in by_path {
            router = router.route(&path, method_router);
        }

        router
            .layer(axum::middleware::from_fn_with_state(
                self.in_flight.clone(),
                track_in_flight,
            ))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(MAX_BODY_LEN))
    }
}

/// A server whose listener is bound but which is not serving yet.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    grace: Duration,
    in_flight: Arc<InFlightTracker>,
    shutdown: ShutdownHandle,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until shutdown is requested.
    ///
    /// On shutdown the listener is closed and every connection is asked to
    /// finish its current request. In-flight requests get the configured
    /// grace period; connections still open after it are force-closed and
    /// `ServerError::DrainTimeout` lists the requests that were cut off.
    pub async fn serve(self) -> Result<(), ServerError> {
        let BoundServer {
            listener,
            local_addr: _,
            router,
            grace,
            in_flight,
            shutdown,
        } = self;

        let mut connections = JoinSet::new();
        let stop = shutdown.wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            router.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_connection_exit(joined);
                }
            }
        }
        drop(listener);

        tracing::info!(
            "Shutting down: draining {} in-flight request(s) on {} connection(s), timeout {:?}",
            in_flight.count(),
            connections.len(),
            grace
        );

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = connections.join_next().await {
                log_connection_exit(joined);
            }
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::info!("Graceful shutdown complete");
                Ok(())
            }
            Err(_) => {
                let outstanding = in_flight.snapshot();
                tracing::warn!(
                    "Drain timed out, force-closing {} connection(s)",
                    connections.len()
                );
                connections.shutdown().await;
                Err(ServerError::DrainTimeout {
                    timeout: grace,
                    outstanding,
                })
            }
        }
    }
}

/// Drives one HTTP/1 connection until it closes or shutdown asks it to
/// finish the request in progress.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    shutdown: ShutdownHandle,
) -> Result<(), hyper::Error> {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
    }

    let conn = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.wait() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

fn log_connection_exit(joined: Result<Result<(), hyper::Error>, JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Connection closed with error: {}", e),
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!("Connection task failed: {}", e),
    }
}

/// Cloneable trigger for a graceful shutdown.
///
/// Triggering before the server starts serving is remembered, so the
/// server drains as soon as it starts.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Stops accepting new connections and starts the bounded drain.
    pub fn shutdown(&self) {
        tracing::info!("Shutdown requested");
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut rx = self.tx.subscribe();
        async move {
            // The sender lives as long as any handle, so this only errors
            // if every handle is gone, in which case nobody can trigger it.
            if rx.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Rejects paths the router cannot represent.
fn validate_path(path: &str) -> Result<(), ServerError> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let last = segments.len().saturating_sub(1);

    for (i, segment) in segments.iter().enumerate() {
        let invalid = |reason| ServerError::InvalidPath {
            path: path.to_string(),
            reason,
        };
        if segment.is_empty() && i != last {
            return Err(invalid("empty path segment"));
        }
        if let Some(name) = segment.strip_prefix('*') {
            if i != last {
                return Err(invalid("wildcard must be the last segment"));
            }
            if name.is_empty() {
                return Err(invalid("wildcard needs a name"));
            }
        } else if segment.contains('*') {
            return Err(invalid("wildcard must start a segment"));
        }
        if *segment == ":" {
            return Err(invalid("parameter needs a name"));
        }
    }
    Ok(())
}

/// Two different paths conflict when one has a wildcard at a position where
/// the other continues with the same prefix, or when they first diverge at a
/// `:param` segment (differently named parameter or a literal).
fn paths_conflict(a: &str, b: &str) -> bool {
    fn segments(path: &str) -> Vec<&str> {
        path.trim_start_matches('/').split('/').collect()
    }
    fn same(x: &str, y: &str) -> bool {
        x == y || (x.starts_with(':') && y.starts_with(':'))
    }
    fn shadows(wild: &[&str], other: &[&str]) -> bool {
        let Some(pos) = wild.iter().position(|s| s.starts_with('*')) else {
            return false;
        };
        other.len() > pos && wild[..pos].iter().zip(other).all(|(x, y)| same(x, y))
    }

    fn params_clash(a: &[&str], b: &[&str]) -> bool {
        a.iter()
            .zip(b)
            .find(|(x, y)| x != y)
            .is_some_and(|(x, y)| x.starts_with(':') || y.starts_with(':'))
    }

    if a == b {
        return false;
    }
    let (a, b) = (segments(a), segments(b));
    shadows(&a, &b) || shadows(&b, &a) || params_clash(&a, &b)
}
