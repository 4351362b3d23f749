//! Server Composer Module
//!
//! Bridges declarative service descriptions and the live HTTP dispatch tree,
//! and owns the serving lifecycle.
//!
//! ## Request path
//! HTTP request -> router -> (optional metrics decorator) -> service handler.
//!
//! ## Submodules
//! - **`service`**: The `Service` trait, `Endpoint` and the type-erased `HandlerFn`.
//! - **`server`**: `Server` (registration, bind, serve) and `ShutdownHandle`.
//! - **`builtin`**: Version, discovery, metrics and profiling services.
//! - **`metrics`**: Per-route counters/histograms and the decorator recording them.
//! - **`inflight`**: Tracks running requests so a stuck drain can be diagnosed.
//! - **`config`**: Command-line configuration.
//! - **`error`**: `ServerError` (lifecycle) and `ApiError` (HTTP responses).

pub mod builtin;
pub mod config;
pub mod error;
pub mod inflight;
pub mod metrics;
pub mod server;
pub mod service;

pub use config::Config;
pub use error::{ApiError, ServerError};
pub use server::{BoundServer, Server, ShutdownHandle};
pub use service::{Decorator, Endpoint, HandlerFn, Service};

#[cfg(test)]
mod tests;
