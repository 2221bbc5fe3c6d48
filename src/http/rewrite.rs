//! Upstream request rewriting.
//!
//! A pure function from (selected instance, inbound request) to the request
//! sent upstream. No shared state, safe to call from any task.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri};

use crate::discovery::ServiceInstance;
use crate::http::request::ServiceRoute;

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe one connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Point `request` at `instance`: scheme `http`, authority `address:port`,
/// path stripped of the service segment, query string kept.
pub fn rewrite_request(
    instance: &ServiceInstance,
    route: &ServiceRoute,
    client_addr: Option<SocketAddr>,
    request: Request<Body>,
) -> Result<Request<Body>, axum::http::uri::InvalidUri> {
    let (mut parts, body) = request.into_parts();

    let query = parts
        .uri
        .query()
        .map(|q| format!("?{}", q))
        .unwrap_or_default();
    parts.uri = format!(
        "http://{}{}{}",
        instance.authority(),
        route.forward_path(),
        query
    )
    .parse::<Uri>()?;

    strip_hop_by_hop(&mut parts.headers);
    // Let the client derive Host from the new authority
    parts.headers.remove(header::HOST);

    if let Some(addr) = client_addr {
        append_forwarded_for(&mut parts.headers, addr);
    }

    Ok(Request::from_parts(parts, body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let client = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client),
        None => client,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
}
