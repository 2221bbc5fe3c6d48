//! Failure injection: dead instances, slow instances, tripping and recovery.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use service_gateway::config::{BreakerConfig, GatewayConfig};
use service_gateway::discovery::StaticCatalog;
use service_gateway::resilience::CircuitState;

mod common;
use common::{client, dead_addr, instance, start_gateway, start_programmable_backend, CountingDiscovery};

#[tokio::test]
async fn test_forward_failure_returns_execution_rejected() {
    let dead = dead_addr().await;
    let catalog = StaticCatalog::from_config(&[instance("orders", "orders-1", dead)]);
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(catalog)).await;

    let res = client().get(gateway.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "execution rejected");
}

#[tokio::test]
async fn test_service_without_instances_returns_execution_rejected() {
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(StaticCatalog::new())).await;

    let res = client().get(gateway.url("/ghost/anything")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "execution rejected");

    let breaker = gateway.breakers.get("ghost").unwrap();
    assert_eq!(breaker.snapshot().total_failures, 1);
}

#[tokio::test]
async fn test_breaker_short_circuits_after_threshold() {
    let dead = dead_addr().await;
    let discovery = Arc::new(CountingDiscovery::new(&[instance("orders", "orders-1", dead)]));
    let gateway = start_gateway(GatewayConfig::default(), discovery.clone()).await;

    for _ in 0..5 {
        let res = client().get(gateway.url("/orders/1")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(discovery.lookups(), 5);
    assert_eq!(
        gateway.breakers.get("orders").unwrap().state(),
        CircuitState::Open
    );

    let res = client().get(gateway.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "execution rejected");
    assert_eq!(discovery.lookups(), 5, "open breaker must not run the command");

    let snapshot = gateway.breakers.get("orders").unwrap().snapshot();
    assert_eq!(snapshot.total_short_circuits, 1);
}

#[tokio::test]
async fn test_breakers_are_isolated_per_service() {
    let dead = dead_addr().await;
    let (healthy, _) = start_programmable_backend(|_| async { (200, "ok".to_string()) }).await;
    let catalog = StaticCatalog::from_config(&[
        instance("orders", "orders-1", dead),
        instance("users", "users-1", healthy),
    ]);
    let gateway = start_gateway(GatewayConfig::default(), Arc::new(catalog)).await;

    for _ in 0..6 {
        client().get(gateway.url("/orders/1")).send().await.unwrap();
    }
    assert_eq!(gateway.breakers.get("orders").unwrap().state(), CircuitState::Open);

    let res = client().get(gateway.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(gateway.breakers.get("users").unwrap().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_slow_instance_times_out() {
    let (slow, _) = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "too late".to_string())
    })
    .await;
    let catalog = StaticCatalog::from_config(&[instance("reports", "reports-1", slow)]);

    let mut config = GatewayConfig::default();
    config.services.insert(
        "reports".to_string(),
        BreakerConfig {
            timeout_ms: 200,
            ..BreakerConfig::default()
        },
    );
    let gateway = start_gateway(config, Arc::new(catalog)).await;

    let started = std::time::Instant::now();
    let res = client().get(gateway.url("/reports/daily")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "execution rejected");
    assert!(started.elapsed() < Duration::from_secs(2));

    let snapshot = gateway.breakers.get("reports").unwrap().snapshot();
    assert_eq!(snapshot.total_timeouts, 1);
}

#[tokio::test]
async fn test_breaker_recovers_after_sleep_window() {
    let flaky = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let f = flaky.clone();
    let (backend, _) = start_programmable_backend(move |_| {
        let failing = f.load(std::sync::atomic::Ordering::SeqCst);
        async move {
            if failing {
                // Stall past the breaker timeout.
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            (200, "ok".to_string())
        }
    })
    .await;
    let catalog = StaticCatalog::from_config(&[instance("orders", "orders-1", backend)]);

    let mut config = GatewayConfig::default();
    config.breaker = BreakerConfig {
        timeout_ms: 100,
        sleep_window_ms: 300,
        ..BreakerConfig::default()
    };
    let gateway = start_gateway(config, Arc::new(catalog)).await;

    for _ in 0..5 {
        client().get(gateway.url("/orders/1")).send().await.unwrap();
    }
    assert_eq!(gateway.breakers.get("orders").unwrap().state(), CircuitState::Open);

    flaky.store(false, std::sync::atomic::Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let res = client().get(gateway.url("/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(gateway.breakers.get("orders").unwrap().state(), CircuitState::Closed);
}
