//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup, single-threaded):
//!     images.rs (declare every image operation once, in order)
//!     → compat.rs (one descriptor, up to two namespaces)
//!     → version.rs (prefix /v{version} + namespace prefix)
//!     → table.rs (conflict check, append)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (method, path, query)
//!     → table.rs (path pattern match, binds {params})
//!     → matcher.rs (method filter, query-presence predicates)
//!     → Return: matched Route or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Query predicates test presence, never value
//! - First registered match wins; unreachable routes are rejected at registration

pub mod compat;
pub mod error;
pub mod images;
pub mod matcher;
pub mod pattern;
pub mod query;
pub mod table;
pub mod version;

pub use compat::{register_operation, Namespace, Operation};
pub use error::RouteError;
pub use images::register_image_routes;
pub use matcher::{Matcher, MethodFilter, QueryPredicates, RouteRequest};
pub use pattern::{PathParams, PathPattern};
pub use query::QueryParams;
pub use table::{Route, RouteLookup, RouteMatch, RouteSpec, RouteTable, RouteTableBuilder};
pub use version::PathVersioner;
