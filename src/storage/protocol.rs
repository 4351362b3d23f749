//! Key-Value HTTP Protocol
//!
//! Defines the resource paths, limits and Data Transfer Objects (DTOs) used by
//! clients of the key-value service.

use serde::{Deserialize, Serialize};

// --- Limits ---

/// Largest accepted value, measured on the decoded string (512 KiB).
pub const MAX_VALUE_LEN: usize = 512 * 1024;

/// Transport-level cap on PUT bodies.
///
/// JSON escaping can inflate a value up to six times (`\u0000`), so the raw
/// body is allowed to be larger than `MAX_VALUE_LEN`; the real limit is
/// checked after decoding.
pub const MAX_BODY_LEN: usize = MAX_VALUE_LEN * 6 + 1024;

// --- Resources ---

/// Default API group the key-value service is mounted under.
pub const DEFAULT_KV_GROUP: &str = "/v0";
/// Resource name reported by discovery.
pub const RESOURCE_KV: &str = "kv";
/// Path of the key-value resource, relative to its API group.
/// The trailing wildcard captures the whole key, separators included.
pub const ENDPOINT_KV: &str = "/kv/*key";

// --- Data Transfer Objects ---

/// Body of a PUT request. The `value` field is required.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub value: String,
}

/// Body of a successful GET response.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: String,
}
