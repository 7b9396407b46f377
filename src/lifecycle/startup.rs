//! Startup orchestration.
//!
//! # Responsibilities
//! - Derive the path versioner from configuration
//! - Register every resource aggregator and freeze the route table
//!
//! # Design Decisions
//! - Fail fast: any registration error is fatal
//! - The table is immutable once built and shared read-only

use crate::config::ServerConfig;
use crate::handlers::ImageHandlers;
use crate::routing::{register_image_routes, PathVersioner, RouteError, RouteTable, RouteTableBuilder};

/// Build the frozen route table for the configured API.
pub fn build_route_table(
    config: &ServerConfig,
    images: &ImageHandlers,
) -> Result<RouteTable, RouteError> {
    let versioner = PathVersioner::from_config(&config.api);
    tracing::debug!(?versioner, "Building route table");

    let mut builder = RouteTableBuilder::new(versioner);
    register_image_routes(&mut builder, images)?;

    let table = builder.build();
    tracing::info!(routes = table.len(), "Route table ready");
    Ok(table)
}
