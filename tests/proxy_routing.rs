//! End-to-end routing tests: path split, rewrite, verbatim responses.

use std::sync::Arc;

use reqwest::StatusCode;
use service_gateway::config::GatewayConfig;
use service_gateway::discovery::StaticCatalog;

mod common;
use common::{client, instance, start_gateway, start_mock_backend, start_programmable_backend};

#[tokio::test]
async fn test_forwards_remainder_path_and_returns_response_verbatim() {
    let (backend, captured) =
        start_programmable_backend(|_| async { (201, "created order".to_string()) }).await;
    let catalog = StaticCatalog::from_config(&[instance("orders", "orders-1", backend)]);
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(catalog)).await;

    let res = client()
        .post(gateway.url("/orders/123?expand=items"))
        .body("{\"qty\":2}")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers().get("x-backend").unwrap().to_str().unwrap(),
        backend.port().to_string()
    );
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "created order");

    let seen = captured.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].target, "/123?expand=items");
    assert_eq!(seen[0].body, "{\"qty\":2}");
    assert_eq!(seen[0].header("x-forwarded-for"), Some("127.0.0.1"));
    assert_eq!(seen[0].header("host"), Some(backend.to_string().as_str()));
}

#[tokio::test]
async fn test_service_root_forwards_to_slash() {
    let (backend, captured) = start_mock_backend("root").await;
    let catalog = StaticCatalog::from_config(&[instance("users", "users-1", backend)]);
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(catalog)).await;

    let res = client().get(gateway.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "root");

    let res = client().get(gateway.url("/users/a/b/c")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let targets: Vec<String> = captured
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.target.clone())
        .collect();
    assert_eq!(targets, vec!["/".to_string(), "/a/b/c".to_string()]);
}

#[tokio::test]
async fn test_missing_service_name_is_not_found() {
    let discovery = Arc::new(common::CountingDiscovery::new(&[]));
    let gateway = start_gateway(GatewayConfig::default(), discovery.clone()).await;

    for path in ["/", "//foo"] {
        let res = client().get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {}", path);
    }
    assert_eq!(discovery.lookups(), 0);
    assert!(gateway.breakers.is_empty());
}

#[tokio::test]
async fn test_allow_list_rejects_unknown_services() {
    let (backend, _) = start_mock_backend("ok").await;
    let discovery = Arc::new(common::CountingDiscovery::new(&[instance(
        "orders", "orders-1", backend,
    )]));

    let mut config = GatewayConfig::default();
    config.routing.allowed_services = vec!["orders".to_string()];
    let gateway = start_gateway(config, discovery.clone()).await;

    let res = client().get(gateway.url("/random-name/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(discovery.lookups(), 0);
    assert!(gateway.breakers.get("random-name").is_none());

    let res = client().get(gateway.url("/orders/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_errors_pass_through_without_tripping() {
    let (backend, _) =
        start_programmable_backend(|_| async { (503, "busy".to_string()) }).await;
    let catalog = StaticCatalog::from_config(&[instance("orders", "orders-1", backend)]);
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(catalog)).await;

    for _ in 0..8 {
        let res = client().get(gateway.url("/orders/1")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.text().await.unwrap(), "busy");
    }

    let breaker = gateway.breakers.get("orders").unwrap();
    assert_eq!(breaker.state().as_str(), "closed");
}

#[tokio::test]
async fn test_round_robin_spreads_across_instances() {
    let (a, captured_a) = start_mock_backend("a").await;
    let (b, captured_b) = start_mock_backend("b").await;
    let catalog = StaticCatalog::from_config(&[
        instance("orders", "orders-a", a),
        instance("orders", "orders-b", b),
    ]);

    let mut config = GatewayConfig::default();
    config.load_balancer.strategy = "round_robin".to_string();
    let gateway = start_gateway(config, Arc::new(catalog)).await;

    for _ in 0..4 {
        let res = client().get(gateway.url("/orders/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert_eq!(captured_a.lock().unwrap().len(), 2);
    assert_eq!(captured_b.lock().unwrap().len(), 2);
}
