//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, deadline, tracing)
//!     → proxy.rs (breaker-gated forwarding)
//!         → request.rs (service name + remainder)
//!         → rewrite.rs (point the request at the chosen instance)
//!     → error.rs (404 / 500 mapping)
//!     → Send to client
//! ```

pub mod error;
pub mod proxy;
pub mod request;
pub mod rewrite;
pub mod server;

pub use error::{GatewayError, ProxyError};
pub use request::{ServiceRoute, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
