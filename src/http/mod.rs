//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit, timeout, trace)
//!     → request.rs (request ID assigned or reused)
//!     → server.rs dispatch (route table lookup)
//!     → handler (business operation)
//!     → response or JSON error document
//! ```

pub mod request;
pub mod server;

pub use request::{request_id_middleware, RequestId, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer, ROUTE_MISS_HEADER};
