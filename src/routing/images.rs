//! Image resource routes.
//!
//! Declares every image operation once, in a fixed order. Query-qualified
//! routes come before any route sharing their path and method.

use crate::handlers::ImageHandlers;
use crate::routing::compat::{register_operation, Operation};
use crate::routing::error::RouteError;
use crate::routing::table::{RouteSpec, RouteTableBuilder};

/// Resource name claimed on the builder.
pub const RESOURCE: &str = "images";

/// Register all image routes on `builder`.
///
/// Fails with [`RouteError::AlreadyRegistered`] if called twice on the same
/// builder, leaving the table untouched.
pub fn register_image_routes(
    builder: &mut RouteTableBuilder,
    handlers: &ImageHandlers,
) -> Result<(), RouteError> {
    builder.claim_resource(RESOURCE)?;

    let before = builder.len();
    for operation in image_operations(handlers) {
        register_operation(builder, operation)?;
    }

    tracing::info!(
        resource = RESOURCE,
        routes = builder.len() - before,
        "Routes registered"
    );
    Ok(())
}

fn image_operations(h: &ImageHandlers) -> Vec<Operation> {
    vec![
        Operation::new("create-from-image").compat(
            RouteSpec::post("/images/create", h.create_from_image.clone()).with_query("fromImage"),
        ),
        Operation::new("create-from-src").compat(
            RouteSpec::post("/images/create", h.create_from_src.clone()).with_query("fromSrc"),
        ),
        Operation::new("list")
            .compat(RouteSpec::get("/images/json", h.compat_list.clone()))
            .native(RouteSpec::get("/images/json", h.native_list.clone())),
        Operation::new("load")
            .compat(RouteSpec::post("/images/load", h.load.clone()))
            .native(RouteSpec::post("/images/load", h.load.clone())),
        Operation::new("prune")
            .compat(RouteSpec::post("/images/prune", h.compat_prune.clone()))
            .native(RouteSpec::post("/images/prune", h.native_prune.clone())),
        Operation::new("search")
            .compat(RouteSpec::get("/images/search", h.search.clone()))
            .native(RouteSpec::get("/images/search", h.search.clone())),
        Operation::new("remove")
            .compat(RouteSpec::delete("/images/{name}", h.remove.clone()))
            .native(RouteSpec::delete("/images/{name}", h.remove.clone())),
        Operation::new("export")
            .compat(RouteSpec::get("/images/{name}/get", h.compat_export.clone()))
            .native(RouteSpec::get("/images/{name}/get", h.native_export.clone())),
        Operation::new("history")
            .compat(RouteSpec::get("/images/{name}/history", h.history.clone()))
            .native(RouteSpec::get("/images/{name}/history", h.history.clone())),
        Operation::new("inspect")
            .compat(RouteSpec::get("/images/{name}/json", h.compat_inspect.clone()))
            .native(RouteSpec::get("/images/{name}/json", h.native_inspect.clone())),
        Operation::new("tag")
            .compat(RouteSpec::post("/images/{name}/tag", h.tag.clone()))
            .native(RouteSpec::post("/images/{name}/tag", h.tag.clone())),
        Operation::new("commit").compat(RouteSpec::post("/commit", h.commit.clone())),
        Operation::new("build").compat(RouteSpec::post("/build", h.build.clone())),
        Operation::new("exists").native(RouteSpec::any("/images/{name}/exists", h.exists.clone())),
        Operation::new("tree").native(RouteSpec::any("/images/{name}/tree", h.tree.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::MemoryImageBackend;
    use crate::routing::compat::Namespace;
    use crate::routing::version::PathVersioner;
    use std::sync::Arc;

    fn handlers() -> ImageHandlers {
        ImageHandlers::new(Arc::new(MemoryImageBackend::new()))
    }

    #[test]
    fn test_route_counts() {
        let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
        register_image_routes(&mut builder, &handlers()).unwrap();
        let table = builder.build();

        assert_eq!(table.namespace(Namespace::Compat).count(), 13);
        assert_eq!(table.namespace(Namespace::Native).count(), 11);
    }

    #[test]
    fn test_second_registration_rejected() {
        let handlers = handlers();
        let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
        register_image_routes(&mut builder, &handlers).unwrap();
        let count = builder.len();

        assert_eq!(
            register_image_routes(&mut builder, &handlers),
            Err(RouteError::AlreadyRegistered(RESOURCE))
        );
        assert_eq!(builder.len(), count);
    }

    #[test]
    fn test_shared_handlers_in_both_namespaces() {
        let handlers = handlers();
        let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
        register_image_routes(&mut builder, &handlers).unwrap();
        let table = builder.build();

        let load: Vec<_> = table
            .routes()
            .iter()
            .filter(|r| r.operation() == "load")
            .collect();
        assert_eq!(load.len(), 2);
        assert!(load[0].handler().same_as(load[1].handler()));
        assert!(load[0].handler().same_as(&handlers.load));
    }
}
