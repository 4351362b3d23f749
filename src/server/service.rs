//! Service capability
//!
//! A `Service` is anything that can name an API group and list the endpoints
//! it wants mounted under it. The server composer only ever sees this trait,
//! so the key-value service and the built-in services are treated the same.

use crate::registry::Resource;

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::Response;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Type alias for a thread-safe, type-erased request handler.
/// It takes the full request and resolves to a response.
pub type HandlerFn = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wraps a handler with cross-cutting behavior. Receives the full route
/// (e.g. `/v0/kv/*key`) the handler is about to be mounted on.
pub type Decorator = Arc<dyn Fn(&str, HandlerFn) -> HandlerFn + Send + Sync>;

/// A resource together with the handler serving it.
#[derive(Clone)]
pub struct Endpoint {
    pub resource: Resource,
    pub handler: HandlerFn,
}

impl Endpoint {
    /// Builds an endpoint from any axum handler and the state it extracts.
    ///
    /// The handler keeps its normal extractor signature
    /// (`State`, `Path`, `Json`, ...); the concrete future type is erased
    /// so endpoints of different services can live in the same list.
    pub fn new<H, T, S>(resource: Resource, handler: H, state: S) -> Self
    where
        H: Handler<T, S> + Sync,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let handler_fn: HandlerFn =
            Arc::new(move |req: Request| handler.clone().call(req, state.clone()).boxed());

        Self {
            resource,
            handler: handler_fn,
        }
    }

    /// Builds an endpoint from a handler that needs no state.
    pub fn stateless<H, T>(resource: Resource, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(resource, handler, ())
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// A group of routes that can be mounted on the server.
pub trait Service: Send + Sync {
    /// URL prefix of the group (e.g. `/v0`). Slashes are trimmed on use.
    fn api_group(&self) -> String;

    /// The endpoints to mount below `api_group`.
    fn handlers(&self) -> Vec<Endpoint>;
}

impl<T: Service + ?Sized> Service for Arc<T> {
    fn api_group(&self) -> String {
        (**self).api_group()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        (**self).handlers()
    }
}

/// Decorator that returns the handler unchanged.
pub fn identity_decorator() -> Decorator {
    Arc::new(|_route: &str, handler: HandlerFn| handler)
}

/// Joins a group prefix and a resource path into one absolute route.
///
/// `("/v0/", "/kv/*key")` -> `/v0/kv/*key`, `("apis", "/")` -> `/apis`.
pub fn route_path(group: &str, path: &str) -> String {
    let group = group.trim_matches('/');
    let path = path.trim_matches('/');
    match (group.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => format!("/{}", group),
        (false, false) => format!("/{}/{}", group, path),
    }
}
