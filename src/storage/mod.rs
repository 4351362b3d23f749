//! Key-Value Storage Module
//!
//! A single in-memory map from string keys to string values, served over HTTP.
//!
//! ## Core Concepts
//! - **Store**: `KvStore` guards the map with a reader/writer lock; reads run in
//!   parallel, writes are serialized. Nothing is persisted.
//! - **Absence**: a missing key is reported as "not found", never as an empty value.
//!   Deleting a missing key is a no-op.
//! - **Limits**: values are capped at 512 KiB of decoded payload. The cap is
//!   enforced by the HTTP handlers, not by the store.
//! - **Service**: `KvService` mounts GET/PUT/DELETE `{group}/kv/*key`.

pub mod handlers;
pub mod memory;
pub mod protocol;
pub mod service;

pub use memory::KvStore;
pub use service::KvService;

#[cfg(test)]
mod tests;
