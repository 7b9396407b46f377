//! Compat/native namespace multiplexing.
//!
//! One [`Operation`] carries an optional route per namespace. Both are
//! versioned and registered from the same descriptor, so an operation served
//! on both surfaces cannot drift: the two routes must agree on resource path,
//! method and query predicates, and may differ only in the handler variant
//! that encodes the response for that surface.

use std::fmt;

use crate::routing::error::RouteError;
use crate::routing::pattern::PathPattern;
use crate::routing::table::{Route, RouteSpec, RouteTableBuilder};

/// Client-facing API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Docker Engine API shaped endpoints.
    Compat,
    /// This service's own endpoints, under `/libpod`.
    Native,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Compat, Namespace::Native];

    /// Path prefix inserted between the version segment and the resource path.
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Compat => "",
            Namespace::Native => "/libpod",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Compat => "compat",
            Namespace::Native => "native",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A logical operation and its route on each namespace that exposes it.
#[derive(Debug, Clone)]
pub struct Operation {
    name: &'static str,
    compat: Option<RouteSpec>,
    native: Option<RouteSpec>,
}

impl Operation {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compat: None,
            native: None,
        }
    }

    pub fn compat(mut self, spec: RouteSpec) -> Self {
        self.compat = Some(spec);
        self
    }

    pub fn native(mut self, spec: RouteSpec) -> Self {
        self.native = Some(spec);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn check_surfaces(&self) -> Result<(), RouteError> {
        let mismatch = |field| RouteError::NamespaceMismatch {
            operation: self.name,
            field,
        };
        match (&self.compat, &self.native) {
            (None, None) => Err(RouteError::EmptyOperation(self.name)),
            (Some(compat), Some(native)) => {
                if compat.path() != native.path() {
                    Err(mismatch("path"))
                } else if compat.method() != native.method() {
                    Err(mismatch("method"))
                } else if compat.query() != native.query() {
                    Err(mismatch("query predicates"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// Version and register every route of `operation`, compat first.
pub fn register_operation(
    builder: &mut RouteTableBuilder,
    operation: Operation,
) -> Result<(), RouteError> {
    operation.check_surfaces()?;

    let Operation {
        name,
        compat,
        native,
    } = operation;
    for (namespace, spec) in [(Namespace::Compat, compat), (Namespace::Native, native)] {
        let Some(spec) = spec else { continue };
        let versioned = builder.versioner().versioned_path(namespace, spec.path());
        let pattern = PathPattern::parse(&versioned)?;
        builder.register(Route::new(namespace, name, pattern, spec))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerRef, HandlerResponse, HandlerResult, RequestContext};
    use crate::routing::version::PathVersioner;
    use axum::body::Body;
    use axum::http::Request;

    fn stub(name: &'static str) -> HandlerRef {
        HandlerRef::new(name, |_ctx: RequestContext, _req: Request<Body>| async {
            HandlerResult::Ok(HandlerResponse::no_content())
        })
    }

    #[test]
    fn test_both_namespaces_registered() {
        let mut builder = RouteTableBuilder::new(PathVersioner::fixed("1.40"));
        register_operation(
            &mut builder,
            Operation::new("list")
                .compat(RouteSpec::get("/images/json", stub("compat.list")))
                .native(RouteSpec::get("/images/json", stub("native.list"))),
        )
        .unwrap();

        let table = builder.build();
        let compat: Vec<_> = table.namespace(Namespace::Compat).collect();
        let native: Vec<_> = table.namespace(Namespace::Native).collect();
        assert_eq!(compat[0].pattern().as_str(), "/v1.40/images/json");
        assert_eq!(native[0].pattern().as_str(), "/v1.40/libpod/images/json");
        assert_eq!(compat[0].resource_path(), native[0].resource_path());
    }

    #[test]
    fn test_single_namespace() {
        let mut builder = RouteTableBuilder::default();
        register_operation(
            &mut builder,
            Operation::new("tree").native(RouteSpec::any("/images/{name}/tree", stub("tree"))),
        )
        .unwrap();
        let table = builder.build();
        assert_eq!(table.namespace(Namespace::Compat).count(), 0);
        assert_eq!(table.namespace(Namespace::Native).count(), 1);
    }

    #[test]
    fn test_empty_operation_rejected() {
        let mut builder = RouteTableBuilder::default();
        assert_eq!(
            register_operation(&mut builder, Operation::new("nothing")),
            Err(RouteError::EmptyOperation("nothing"))
        );
    }

    #[test]
    fn test_diverging_surfaces_rejected() {
        let mut builder = RouteTableBuilder::default();
        let err = register_operation(
            &mut builder,
            Operation::new("inspect")
                .compat(RouteSpec::get("/images/{name}/json", stub("a")))
                .native(RouteSpec::any("/images/{name}/json", stub("b"))),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RouteError::NamespaceMismatch {
                operation: "inspect",
                field: "method"
            }
        );
        assert!(builder.is_empty());
    }
}
