//! Request context extraction.
//!
//! # Responsibilities
//! - Split the path into service name and remainder
//! - Read the request ID set by the request-id layer
//!
//! # Design Decisions
//! - The service name is exactly the first path segment; `//foo` has an
//!   empty name and is rejected, it is not skipped over
//! - The remainder keeps its inner slashes untouched

use axum::http::{HeaderName, Request};

/// Header carrying the per-request correlation ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Target service and the path to forward, derived from the inbound path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    pub service_name: String,
    /// Path after the service segment, without its leading slash.
    pub remainder: String,
}

impl ServiceRoute {
    /// Parse `/{service}/{rest...}`. Returns `None` when the service segment is empty.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (name, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if name.is_empty() {
            return None;
        }
        Some(Self {
            service_name: name.to_string(),
            remainder: rest.to_string(),
        })
    }

    /// Path to send upstream: the remainder with the service segment stripped.
    pub fn forward_path(&self) -> String {
        format!("/{}", self.remainder)
    }
}

/// The request ID header value, or "unknown".
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_and_remainder() {
        let route = ServiceRoute::parse("/orders/123").unwrap();
        assert_eq!(route.service_name, "orders");
        assert_eq!(route.forward_path(), "/123");

        let nested = ServiceRoute::parse("/orders/v1/items/9").unwrap();
        assert_eq!(nested.forward_path(), "/v1/items/9");
    }

    #[test]
    fn test_service_only() {
        assert_eq!(ServiceRoute::parse("/orders").unwrap().forward_path(), "/");
        assert_eq!(ServiceRoute::parse("/orders/").unwrap().forward_path(), "/");
    }

    #[test]
    fn test_empty_service_name() {
        assert_eq!(ServiceRoute::parse(""), None);
        assert_eq!(ServiceRoute::parse("/"), None);
        assert_eq!(ServiceRoute::parse("//foo"), None);
    }

    #[test]
    fn test_request_id() {
        let request = Request::builder()
            .header("x-request-id", "abc")
            .body(())
            .unwrap();
        assert_eq!(request_id(&request), "abc");
        assert_eq!(request_id(&Request::new(())), "unknown");
    }
}
