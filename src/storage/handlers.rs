use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::memory::KvStore;
use super::protocol::{GetResponse, MAX_VALUE_LEN, PutRequest};
use crate::server::ApiError;

pub async fn handle_get(
    State(store): State<Arc<KvStore>>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>, StatusCode> {
    match store.get(&key) {
        Some(value) => Ok(Json(GetResponse { value })),
        None => {
            tracing::debug!("GET: key not found: {}", key);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Stores the `value` field of the JSON body under `key`.
///
/// The body is decoded regardless of its content type. A missing or
/// malformed body, or a value above `MAX_VALUE_LEN` bytes, is rejected with
/// 400 and leaves any previous value untouched.
pub async fn handle_put(
    State(store): State<Arc<KvStore>>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let body = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("missing request body".to_string()));
    }

    let req: PutRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if req.value.len() > MAX_VALUE_LEN {
        return Err(ApiError::BadRequest("exceed max_data_len(512K)".to_string()));
    }

    store.put(key, req.value);
    Ok(StatusCode::OK)
}

pub async fn handle_delete(
    State(store): State<Arc<KvStore>>,
    Path(key): Path<String>,
) -> StatusCode {
    store.delete(&key);
    StatusCode::OK
}
