use super::handlers::{handle_delete, handle_get, handle_put};
use super::memory::KvStore;
use super::protocol::{DEFAULT_KV_GROUP, ENDPOINT_KV, RESOURCE_KV};
use crate::registry::Resource;
use crate::server::{Endpoint, Service};

use axum::http::Method;
use std::sync::Arc;

/// Exposes a [`KvStore`] as GET/PUT/DELETE on `{group}/kv/*key`.
pub struct KvService {
    group: String,
    store: Arc<KvStore>,
}

impl KvService {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self::with_group(DEFAULT_KV_GROUP, store)
    }

    pub fn with_group(group: &str, store: Arc<KvStore>) -> Self {
        Self {
            group: group.to_string(),
            store,
        }
    }

    pub fn store(&self) -> Arc<KvStore> {
        self.store.clone()
    }
}

impl Service for KvService {
    fn api_group(&self) -> String {
        self.group.clone()
    }

    fn handlers(&self) -> Vec<Endpoint> {
        vec![
            Endpoint::new(
                Resource::new(RESOURCE_KV, ENDPOINT_KV, Method::GET),
                handle_get,
                self.store.clone(),
            ),
            Endpoint::new(
                Resource::new(RESOURCE_KV, ENDPOINT_KV, Method::PUT),
                handle_put,
                self.store.clone(),
            ),
            Endpoint::new(
                Resource::new(RESOURCE_KV, ENDPOINT_KV, Method::DELETE),
                handle_delete,
                self.store.clone(),
            ),
        ]
    }
}
