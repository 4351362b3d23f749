//! Service Registry Module
//!
//! Records which resources are mounted under which API group so the server
//! can describe itself through the discovery endpoints.
//!
//! ## Core Concepts
//! - **Resource**: one routable operation (name, path pattern, HTTP method).
//! - **API Group**: a named URL prefix collecting the resources mounted below it.
//!   Group names are stored with leading/trailing slashes trimmed.
//! - **Registry**: append-only; there is no deregistration. Safe to mutate
//!   while discovery requests are being served.

pub mod registry;
pub mod types;

pub use registry::ServiceRegistry;
pub use types::{ApiGroup, Resource, normalize_group};
