//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Store registered routes in registration order
//! - Reject routes that could never be selected
//! - Look up the matching route for a request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Built by [`RouteTableBuilder`], frozen into an immutable [`RouteTable`]
//!   (thread-safe without locks)
//! - O(n) scan in registration order; first full match wins
//! - Explicit NoMatch rather than silent default

use std::fmt;

use crate::handlers::HandlerRef;
use crate::routing::compat::Namespace;
use crate::routing::error::RouteError;
use crate::routing::matcher::{Matcher, MethodFilter, QueryPredicates, RouteRequest};
use crate::routing::pattern::{PathParams, PathPattern};
use crate::routing::version::PathVersioner;
use axum::http::Method;

/// One namespace's view of an operation: where it lives and who serves it.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    path: String,
    method: MethodFilter,
    query: QueryPredicates,
    handler: HandlerRef,
}

impl RouteSpec {
    /// A route for `path` (unversioned, without namespace prefix).
    pub fn new(method: MethodFilter, path: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            path: path.into(),
            method,
            query: QueryPredicates::none(),
            handler,
        }
    }

    pub fn any(path: impl Into<String>, handler: HandlerRef) -> Self {
        Self::new(MethodFilter::any(), path, handler)
    }

    pub fn get(path: impl Into<String>, handler: HandlerRef) -> Self {
        Self::new(MethodFilter::only(Method::GET), path, handler)
    }

    pub fn post(path: impl Into<String>, handler: HandlerRef) -> Self {
        Self::new(MethodFilter::only(Method::POST), path, handler)
    }

    pub fn delete(path: impl Into<String>, handler: HandlerRef) -> Self {
        Self::new(MethodFilter::only(Method::DELETE), path, handler)
    }

    /// Require `key` to be present in the query string.
    pub fn with_query(mut self, key: impl Into<String>) -> Self {
        self.query = self.query.require(key);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    pub fn query(&self) -> &QueryPredicates {
        &self.query
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    namespace: Namespace,
    operation: &'static str,
    resource_path: String,
    pattern: PathPattern,
    method: MethodFilter,
    query: QueryPredicates,
    handler: HandlerRef,
}

impl Route {
    /// Bind a spec to its final (versioned, prefixed) pattern.
    pub fn new(
        namespace: Namespace,
        operation: &'static str,
        pattern: PathPattern,
        spec: RouteSpec,
    ) -> Self {
        Self {
            namespace,
            operation,
            resource_path: spec.path,
            pattern,
            method: spec.method,
            query: spec.query,
            handler: spec.handler,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The logical path, without version or namespace prefix.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    pub fn query(&self) -> &QueryPredicates {
        &self.query
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    fn matches(&self, req: &RouteRequest<'_>) -> Option<PathParams> {
        let params = self.pattern.matches(req.path)?;
        (self.method.matches(req) && self.query.matches(req)).then_some(params)
    }

    /// True when this route, registered first, would win every request
    /// `later` could match.
    fn shadows(&self, later: &Route) -> bool {
        self.namespace == later.namespace
            && self.pattern.covers(&later.pattern)
            && self.method.covers(&later.method)
            && self.query.covers(&later.query)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} {:<6} {}{} -> {}",
            self.namespace,
            self.method,
            self.pattern,
            self.query,
            self.handler.name()
        )
    }
}

/// A route selected for a request, with its bound path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

/// Result of looking up a request.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Matched(RouteMatch<'a>),
    NoMatch,
}

impl<'a> RouteLookup<'a> {
    pub fn matched(self) -> Option<RouteMatch<'a>> {
        match self {
            Self::Matched(m) => Some(m),
            Self::NoMatch => None,
        }
    }
}

/// Accumulates routes during initialization.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    versioner: PathVersioner,
    routes: Vec<Route>,
    resources: Vec<&'static str>,
}

impl RouteTableBuilder {
    pub fn new(versioner: PathVersioner) -> Self {
        Self {
            versioner,
            routes: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn versioner(&self) -> &PathVersioner {
        &self.versioner
    }

    /// Record that `resource`'s routes are being declared. Fails if they
    /// already were.
    pub fn claim_resource(&mut self, resource: &'static str) -> Result<(), RouteError> {
        if self.resources.contains(&resource) {
            return Err(RouteError::AlreadyRegistered(resource));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Append a route. Fails if an earlier route already covers it.
    pub fn register(&mut self, route: Route) -> Result<(), RouteError> {
        if let Some(existing) = self.routes.iter().find(|r| r.shadows(&route)) {
            return Err(RouteError::Conflict {
                namespace: route.namespace,
                operation: route.operation,
                route: format!("{} {}{}", route.method, route.pattern, route.query),
                existing_operation: existing.operation,
                existing_route: format!("{} {}{}", existing.method, existing.pattern, existing.query),
            });
        }

        tracing::debug!(
            namespace = %route.namespace,
            operation = route.operation,
            method = %route.method,
            pattern = %route.pattern,
            query = %route.query,
            handler = route.handler.name(),
            "Route registered"
        );
        self.routes.push(route);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Freeze the table for serving.
    pub fn build(self) -> RouteTable {
        RouteTable {
            versioner: self.versioner,
            routes: self.routes,
        }
    }
}

/// The immutable, shareable route table of one server instance.
#[derive(Debug)]
pub struct RouteTable {
    versioner: PathVersioner,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Find the route serving `req`.
    pub fn match_request(&self, req: &RouteRequest<'_>) -> RouteLookup<'_> {
        self.routes
            .iter()
            .find_map(|route| {
                route
                    .matches(req)
                    .map(|params| RouteMatch { route, params })
            })
            .map_or(RouteLookup::NoMatch, RouteLookup::Matched)
    }

    pub fn versioner(&self) -> &PathVersioner {
        &self.versioner
    }

    /// All routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes of one namespace, in registration order.
    pub fn namespace(&self, namespace: Namespace) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |r| r.namespace == namespace)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            writeln!(f, "{route}")?;
        }
        Ok(())
    }
}
