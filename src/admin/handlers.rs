use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::Serialize;

use crate::admin::AdminState;
use crate::discovery::ServiceInstance;
use crate::resilience::{BreakerSnapshot, CircuitState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: usize,
    pub open_breakers: usize,
}

#[derive(Serialize)]
pub struct ServiceInstances {
    pub service: String,
    pub instances: Vec<ServiceInstance>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshots = state.breakers.snapshots();
    let open_breakers = snapshots
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if open_breakers == 0 { "operational" } else { "degraded" },
        breakers: snapshots.len(),
        open_breakers,
    })
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

pub async fn get_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, StatusCode> {
    state
        .breakers
        .get(&name)
        .map(|b| Json(b.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_service_instances(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Json<ServiceInstances> {
    let instances = state.discovery.discover_services(&name).await;
    Json(ServiceInstances {
        service: name,
        instances,
    })
}

/// Server-sent events: one `breakers` event with every snapshot per interval.
pub async fn stream_breakers(
    State(state): State<AdminState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut ticker = tokio::time::interval(state.stream_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let events = stream::unfold((state, ticker), |(state, mut ticker)| async move {
        ticker.tick().await;
        let event = match serde_json::to_string(&state.breakers.snapshots()) {
            Ok(json) => Event::default().event("breakers").data(json),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Some((Ok(event), (state, ticker)))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
