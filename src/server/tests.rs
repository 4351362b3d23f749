//! Server Module Tests
//!
//! ## Test Scopes
//! - **Registration**: Endpoints land in the registry under the normalized group.
//! - **Validation**: Duplicate, conflicting and malformed routes are rejected atomically.
//! - **Routing helpers**: Group/path joining.
//! - **Lifecycle**: Bind failures surface as startup errors; shutdown stops serving.

#[cfg(test)]
mod tests {
    use crate::registry::Resource;
    use crate::server::service::route_path;
    use crate::server::{Config, Endpoint, Server, ServerError, Service};
    use axum::http::{Method, StatusCode};
    use std::collections::HashSet;
    use std::time::Duration;

    /// Minimal service declaring a fixed list of (name, path, method).
    struct StaticService {
        group: &'static str,
        routes: Vec<(&'static str, &'static str, Method)>,
    }

    impl Service for StaticService {
        fn api_group(&self) -> String {
            self.group.to_string()
        }

        fn handlers(&self) -> Vec<Endpoint> {
            self.routes
                .iter()
                .map(|(name, path, method)| {
                    Endpoint::stateless(Resource::new(*name, *path, method.clone()), || async {
                        StatusCode::NO_CONTENT
                    })
                })
                .collect()
        }
    }

    fn local_config() -> Config {
        Config {
            bind_addr: "127.0.0.1:0".to_string(),
            grace_shutdown_timeout: 5,
            ..Config::default()
        }
    }

    // ============================================================
    // ROUTING HELPERS
    // ============================================================

    #[test]
    fn test_route_path_joins_and_trims() {
        assert_eq!(route_path("/v0", "/kv/*key"), "/v0/kv/*key");
        assert_eq!(route_path("v0/", "kv/*key"), "/v0/kv/*key");
        assert_eq!(route_path("/apis", "/"), "/apis");
        assert_eq!(route_path("/debug/pprof/", "/runtime"), "/debug/pprof/runtime");
        assert_eq!(route_path("/", "/"), "/");
        assert_eq!(route_path("", "/version"), "/version");
    }

    // ============================================================
    // REGISTRATION
    // ============================================================

    #[test]
    fn test_register_service_records_resources() {
        let mut server = Server::new(local_config());
        let service = StaticService {
            group: "/g/",
            routes: vec![("r1", "/one", Method::GET), ("r2", "/two/*rest", Method::POST)],
        };

        server.register_service(&service).unwrap();

        let registry = server.registry();
        assert_eq!(registry.list_groups(), vec!["g"]);
        let resources: HashSet<Resource> = registry
            .list_resources("g")
            .unwrap()
            .resources
            .into_iter()
            .collect();
        assert_eq!(
            resources,
            HashSet::from([
                Resource::new("r1", "/one", Method::GET),
                Resource::new("r2", "/two/*rest", Method::POST),
            ])
        );
    }

    #[test]
    fn test_same_path_different_methods_is_allowed() {
        let mut server = Server::new(local_config());
        let service = StaticService {
            group: "/g",
            routes: vec![
                ("r", "/x/*k", Method::GET),
                ("r", "/x/*k", Method::PUT),
                ("r", "/x/*k", Method::DELETE),
            ],
        };

        assert!(server.register_service(&service).is_ok());
        assert_eq!(server.registry().list_resources("g").unwrap().resources.len(), 3);
    }

    #[test]
    fn test_two_services_share_a_group() {
        let mut server = Server::new(local_config());

        server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("a", "/a", Method::GET)],
            })
            .unwrap();
        server
            .register_service(&StaticService {
                group: "g",
                routes: vec![("b", "/b", Method::GET)],
            })
            .unwrap();

        assert_eq!(server.registry().list_resources("g").unwrap().resources.len(), 2);
    }

    // ============================================================
    // VALIDATION
    // ============================================================

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut server = Server::new(local_config());
        let service = StaticService {
            group: "/g",
            routes: vec![("a", "/a", Method::GET)],
        };

        server.register_service(&service).unwrap();
        let err = server.register_service(&service).unwrap_err();

        assert!(matches!(err, ServerError::DuplicateRoute { .. }));
        assert_eq!(server.registry().list_resources("g").unwrap().resources.len(), 1);
    }

    #[test]
    fn test_rejected_service_mounts_nothing() {
        let mut server = Server::new(local_config());
        let service = StaticService {
            group: "/g",
            routes: vec![("ok", "/ok", Method::GET), ("bad", "/*x/tail", Method::GET)],
        };

        let err = server.register_service(&service).unwrap_err();

        assert!(matches!(err, ServerError::InvalidPath { .. }));
        assert!(server.registry().list_resources("g").is_none());
    }

    #[test]
    fn test_conflicting_wildcard_is_rejected() {
        let mut server = Server::new(local_config());
        server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("all", "/*rest", Method::GET)],
            })
            .unwrap();

        let err = server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("kv", "/kv/*key", Method::PUT)],
            })
            .unwrap_err();

        assert!(matches!(err, ServerError::ConflictingRoute { .. }));
    }

    #[tokio::test]
    async fn test_differently_named_params_are_rejected() {
        // ARRANGE
        let mut server = Server::new(local_config());
        server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("a", "/:a", Method::GET)],
            })
            .unwrap();

        // ACT
        let err = server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("b", "/:b", Method::PUT)],
            })
            .unwrap_err();

        // ASSERT
        match err {
            ServerError::ConflictingRoute { path, existing } => {
                assert_eq!(path, "/g/:b");
                assert_eq!(existing, "/g/:a");
            }
            other => panic!("expected ConflictingRoute, got {:?}", other),
        }
        let bound = server.bind().await.unwrap();
        assert_ne!(bound.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_same_param_name_with_different_methods_binds() {
        let mut server = Server::new(local_config());
        server
            .register_service(&StaticService {
                group: "/g",
                routes: vec![("get", "/:id", Method::GET), ("put", "/:id", Method::PUT)],
            })
            .unwrap();

        assert!(server.bind().await.is_ok());
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let mut server = Server::new(local_config());
        let service = StaticService {
            group: "/g",
            routes: vec![("c", "/c", Method::from_bytes(b"PURGE").unwrap())],
        };

        let err = server.register_service(&service).unwrap_err();

        assert!(matches!(err, ServerError::UnsupportedMethod { .. }));
    }

    // ============================================================
    // LIFECYCLE
    // ============================================================

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap();

        let server = Server::new(Config {
            bind_addr: addr.to_string(),
            ..local_config()
        });
        let result = server.run().await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_bind_installs_builtins() {
        let server = Server::new(Config {
            enable_metrics: true,
            enable_pprof: true,
            ..local_config()
        });
        let registry = server.registry();

        let bound = server.bind().await.unwrap();

        assert_ne!(bound.local_addr().port(), 0);
        assert_eq!(
            registry.list_groups(),
            vec!["apis", "debug/pprof", "metrics", "version"]
        );
    }

    #[tokio::test]
    async fn test_optional_builtins_are_off_by_default() {
        let server = Server::new(local_config());
        let registry = server.registry();

        let _bound = server.bind().await.unwrap();

        assert_eq!(registry.list_groups(), vec!["apis", "version"]);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_requests_returns_ok() {
        let server = Server::new(local_config());
        let handle = server.shutdown_handle();
        let bound = server.bind().await.unwrap();

        let serving = tokio::spawn(bound.serve());
        handle.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("serve should return after shutdown")
            .unwrap();
        assert!(result.is_ok());
    }
}
