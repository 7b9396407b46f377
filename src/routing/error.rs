//! Registration-time routing errors.
//!
//! Request-time misses are not errors: they are reported as
//! [`RouteLookup::NoMatch`](crate::routing::RouteLookup::NoMatch).

use thiserror::Error;

use crate::routing::compat::Namespace;

/// Errors raised while building the route table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A path pattern could not be parsed.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// A route could never be selected because an earlier route in the same
    /// namespace already claims every request it would match.
    #[error(
        "route {operation} ({namespace} {route}) is shadowed by {existing_operation} ({existing_route})"
    )]
    Conflict {
        namespace: Namespace,
        operation: &'static str,
        route: String,
        existing_operation: &'static str,
        existing_route: String,
    },

    /// An operation was declared with neither a compat nor a native route.
    #[error("operation {0} is not exposed on any namespace")]
    EmptyOperation(&'static str),

    /// Compat and native routes of one operation disagree on their contract.
    #[error("operation {operation}: compat and native routes differ in {field}")]
    NamespaceMismatch {
        operation: &'static str,
        field: &'static str,
    },

    /// A resource's routes were declared twice on the same builder.
    #[error("routes for resource {0:?} are already registered")]
    AlreadyRegistered(&'static str),
}
