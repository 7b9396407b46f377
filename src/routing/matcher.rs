//! Route matching conditions.
//!
//! # Responsibilities
//! - Match the HTTP method (or any method)
//! - Match query-parameter presence (value is never inspected)
//! - Decide at registration time whether one condition covers another
//!
//! # Design Decisions
//! - Empty condition = always matches (wildcard)
//! - Query parameters not named by a predicate never exclude a route
//! - Conditions are plain data so the table can reason about overlap

use std::collections::BTreeSet;
use std::fmt;

use axum::http::Method;

use crate::routing::query::QueryParams;

/// The routing-relevant view of an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: &'a QueryParams,
}

impl<'a> RouteRequest<'a> {
    pub fn new(method: &'a Method, path: &'a str, query: &'a QueryParams) -> Self {
        Self {
            method,
            path,
            query,
        }
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RouteRequest<'_>) -> bool;
}

/// Matches the HTTP method. `None` accepts every method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodFilter(Option<Method>);

impl MethodFilter {
    pub fn any() -> Self {
        Self(None)
    }

    pub fn only(method: Method) -> Self {
        Self(Some(method))
    }

    pub fn method(&self) -> Option<&Method> {
        self.0.as_ref()
    }

    /// True when every request accepted by `other` is also accepted here.
    pub fn covers(&self, other: &MethodFilter) -> bool {
        match (&self.0, &other.0) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a == b,
        }
    }
}

impl Matcher for MethodFilter {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        match &self.0 {
            Some(m) => m == req.method,
            None => true,
        }
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(m) => f.pad(m.as_str()),
            None => f.pad("*"),
        }
    }
}

/// Query parameters that must be present (AND semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPredicates(BTreeSet<String>);

impl QueryPredicates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True when every request accepted by `other` is also accepted here,
    /// i.e. these requirements are a subset of `other`'s.
    pub fn covers(&self, other: &QueryPredicates) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl Matcher for QueryPredicates {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        self.0.iter().all(|key| req.query.contains(key))
    }
}

impl fmt::Display for QueryPredicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            f.write_str(key)?;
        }
        Ok(())
    }
}
