//! Versioned HTTP routing for a container image API.
//!
//! Every image operation is reachable under two namespaces, the Docker
//! compatible one (`/v{version}/images/...`) and the native one
//! (`/v{version}/libpod/images/...`), from a single frozen route table.

pub mod config;
pub mod handlers;
pub mod http;
pub mod images;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ServerConfig;
pub use handlers::ImageHandlers;
pub use http::HttpServer;
pub use images::{ImageBackend, MemoryImageBackend};
pub use lifecycle::{build_route_table, Shutdown};
pub use routing::RouteTable;
