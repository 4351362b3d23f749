//! Composable HTTP Key-Value Server Library
//!
//! This library crate defines the core modules of the key-value server.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of three subsystems:
//!
//! - **`storage`**: The key-value store. A single in-memory map behind a
//!   reader/writer lock, plus the `KvService` exposing it over HTTP.
//! - **`registry`**: The service registry. Records which resources are mounted
//!   under which API group and answers discovery queries.
//! - **`server`**: The server composer. Mounts services onto one router,
//!   optionally decorates handlers with metrics, installs the built-in
//!   routes (`/version`, `/apis`, `/metrics`, `/debug/pprof`) and runs the
//!   listener with a bounded graceful drain.

pub mod registry;
pub mod server;
pub mod storage;
