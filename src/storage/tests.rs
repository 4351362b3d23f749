//! Storage Module Tests
//!
//! Validates the key-value store semantics and its HTTP handlers.
//!
//! ## Test Scopes
//! - **KvStore**: Put/Get/Delete/Exists, absence vs. empty values, overwrite.
//! - **Concurrency**: Parallel writers to one key leave exactly one of the written values.
//! - **Handlers**: Status codes for found/missing keys, malformed bodies and the size cap.
//! - **Service**: The declared resources of `KvService`.
//!
//! *Note: Full request routing through the server is covered in `tests/http_api.rs`.*

#[cfg(test)]
mod tests {
    use crate::server::{ApiError, Service};
    use crate::storage::handlers::{handle_delete, handle_get, handle_put};
    use crate::storage::memory::KvStore;
    use crate::storage::protocol::{ENDPOINT_KV, MAX_VALUE_LEN};
    use crate::storage::service::KvService;
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{Method, StatusCode};
    use axum::response::IntoResponse;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn put_body(value: &str) -> Bytes {
        Bytes::from(serde_json::json!({ "value": value }).to_string())
    }

    // ============================================================
    // KV STORE TESTS
    // ============================================================

    #[test]
    fn test_store_put_and_get() {
        let store = KvStore::new();

        store.put("book-001", "Rust Programming");

        assert_eq!(store.get("book-001"), Some("Rust Programming".to_string()));
        assert!(store.exists("book-001"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent_key() {
        let store = KvStore::new();

        assert_eq!(store.get("nonexistent"), None);
        assert!(!store.exists("nonexistent"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_empty_value_is_not_absence() {
        let store = KvStore::new();

        store.put("empty", "");

        assert_eq!(store.get("empty"), Some(String::new()));
        assert!(store.exists("empty"));
    }

    #[test]
    fn test_store_overwrite_value() {
        let store = KvStore::new();

        store.put("book-001", "Original Title");
        store.put("book-001", "Updated Title");

        assert_eq!(store.get("book-001"), Some("Updated Title".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let store = KvStore::new();
        store.put("k", "v");

        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert!(!store.delete("never-existed"));

        assert_eq!(store.get("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_keys_with_separators() {
        let store = KvStore::new();

        store.put("a/b/c", "nested");
        store.put("a", "top");

        assert_eq!(store.get("a/b/c"), Some("nested".to_string()));
        assert_eq!(store.get("a"), Some("top".to_string()));
        assert_eq!(store.get("a/b"), None);
    }

    #[test]
    fn test_store_multiple_keys() {
        let store = KvStore::new();

        for i in 0..100 {
            store.put(format!("book-{:03}", i), format!("Title {}", i));
        }

        for i in 0..100 {
            let key = format!("book-{:03}", i);
            assert_eq!(store.get(&key), Some(format!("Title {}", i)), "{} should exist", key);
        }
        assert_eq!(store.len(), 100);
    }

    // ============================================================
    // CONCURRENCY
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writers_leave_one_value() {
        let store = Arc::new(KvStore::new());
        let values: Vec<String> = (0..64).map(|i| format!("value-{}", i).repeat(100)).collect();

        let mut handles = Vec::new();
        for value in values.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put("shared", value);
                let seen = store.get("shared").unwrap();
                assert!(seen.starts_with("value-"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let final_value = store.get("shared").unwrap();
        assert!(values.contains(&final_value), "no partial write may be visible");
        assert_eq!(store.len(), 1);
    }

    // ============================================================
    // HANDLER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_handle_get_found_and_missing() {
        let store = Arc::new(KvStore::new());
        store.put("k", "v");

        let found = handle_get(State(store.clone()), Path("k".to_string())).await;
        assert_eq!(found.unwrap().0.value, "v");

        let missing = handle_get(State(store), Path("missing".to_string())).await;
        assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handle_put_stores_value() {
        let store = Arc::new(KvStore::new());

        let status = handle_put(State(store.clone()), Path("k".to_string()), Ok(put_body("v")))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_handle_put_rejects_bad_bodies() {
        let store = Arc::new(KvStore::new());

        for body in ["", "not json", "{}", "{\"value\": 42}", "{\"other\": \"x\"}"] {
            let result = handle_put(
                State(store.clone()),
                Path("k".to_string()),
                Ok(Bytes::from(body)),
            )
            .await;

            let err = result.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "body {:?}", body);
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_handle_put_size_boundary() {
        let store = Arc::new(KvStore::new());
        let max = "x".repeat(MAX_VALUE_LEN);
        let too_big = "y".repeat(MAX_VALUE_LEN + 1);

        let ok = handle_put(State(store.clone()), Path("k".to_string()), Ok(put_body(&max))).await;
        assert_eq!(ok.unwrap(), StatusCode::OK);

        let rejected =
            handle_put(State(store.clone()), Path("k".to_string()), Ok(put_body(&too_big))).await;
        assert!(matches!(rejected, Err(ApiError::BadRequest(_))));

        // The previous value survives the rejected write.
        assert_eq!(store.get("k"), Some(max));
    }

    #[tokio::test]
    async fn test_handle_put_measures_decoded_length() {
        let store = Arc::new(KvStore::new());
        // Each '"' is escaped on the wire, doubling the encoded size.
        let quoted = "\"".repeat(MAX_VALUE_LEN);

        let result =
            handle_put(State(store.clone()), Path("k".to_string()), Ok(put_body(&quoted))).await;

        assert_eq!(result.unwrap(), StatusCode::OK);
        assert_eq!(store.get("k").map(|v| v.len()), Some(MAX_VALUE_LEN));
    }

    #[tokio::test]
    async fn test_handle_delete_is_idempotent() {
        let store = Arc::new(KvStore::new());
        store.put("k", "v");

        for _ in 0..2 {
            let status = handle_delete(State(store.clone()), Path("k".to_string())).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(
            handle_delete(State(store.clone()), Path("never".to_string())).await,
            StatusCode::OK
        );
        assert!(store.get("k").is_none());
    }

    // ============================================================
    // SERVICE
    // ============================================================

    #[test]
    fn test_kv_service_declares_three_methods() {
        let service = KvService::new(Arc::new(KvStore::new()));

        assert_eq!(service.api_group(), "/v0");

        let endpoints = service.handlers();
        assert_eq!(endpoints.len(), 3);
        assert!(endpoints.iter().all(|e| e.resource.path == ENDPOINT_KV));
        assert!(endpoints.iter().all(|e| e.resource.name == "kv"));

        let methods: HashSet<Method> =
            endpoints.iter().map(|e| e.resource.method.clone()).collect();
        assert_eq!(methods, HashSet::from([Method::GET, Method::PUT, Method::DELETE]));
    }

    #[test]
    fn test_kv_service_custom_group_shares_store() {
        let store = Arc::new(KvStore::new());
        let service = KvService::with_group("/v2/", store.clone());

        assert_eq!(service.api_group(), "/v2/");
        service.store().put("k", "v");
        assert_eq!(store.get("k"), Some("v".to_string()));
    }
}
