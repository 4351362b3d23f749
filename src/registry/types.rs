use axum::http::Method;
use serde::{Serialize, Serializer};

/// One addressable operation belonging to an API group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    /// Human readable name, shared by all methods of the same resource (e.g. `kv`).
    pub name: String,
    /// Path pattern relative to the group. May end in a `*name` wildcard.
    pub path: String,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
}

impl Resource {
    pub fn new(name: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method,
        }
    }
}

/// A named collection of resources, as reported by `GET /apis/{group}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiGroup {
    pub name: String,
    pub resources: Vec<Resource>,
}

impl ApiGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
        }
    }
}

/// Trims leading and trailing path separators: `"/v0/"` -> `"v0"`.
pub fn normalize_group(group: &str) -> String {
    group.trim_matches('/').to_string()
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}
