//! Route table properties over the public API.

mod common;

use axum::http::Method;

use image_router::routing::{
    register_image_routes, register_operation, Namespace, Operation, PathVersioner, QueryParams,
    Route, RouteError, RouteLookup, RouteRequest, RouteSpec, RouteTable, RouteTableBuilder,
};
use image_router::ServerConfig;

use common::{image_table, named};

fn lookup<'a>(table: &'a RouteTable, method: Method, uri: &str) -> Option<&'a Route> {
    let (path, query) = match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    };
    let query = QueryParams::parse(query);
    table
        .match_request(&RouteRequest::new(&method, path, &query))
        .matched()
        .map(|m| m.route)
}

/// A concrete request that the route should accept.
fn sample_uri(route: &Route) -> String {
    let path = route.resource_path().replace("{name}", "alpine");
    let query: Vec<String> = route.query().keys().map(|k| format!("{k}=x")).collect();
    let mut uri = format!("/v1.40{}{}", route.namespace().prefix(), path);
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }
    uri
}

#[test]
fn test_shared_operations_differ_only_by_prefix() {
    let table = image_table(&ServerConfig::default());

    let mut shared = 0;
    for native in table.namespace(Namespace::Native) {
        let Some(compat) = table
            .namespace(Namespace::Compat)
            .find(|r| r.operation() == native.operation())
        else {
            continue;
        };
        shared += 1;
        assert_eq!(compat.resource_path(), native.resource_path());
        assert_eq!(compat.method(), native.method());
        assert_eq!(
            compat.pattern().as_str().replacen("/images", "/libpod/images", 1),
            native.pattern().as_str()
        );
    }
    assert_eq!(shared, 9);
}

#[test]
fn test_every_route_round_trips() {
    let table = image_table(&ServerConfig::default());

    for route in table.routes() {
        let method = route.method().method().cloned().unwrap_or(Method::GET);
        let uri = sample_uri(route);
        let found = lookup(&table, method, &uri)
            .unwrap_or_else(|| panic!("{uri} matched nothing, expected {route}"));

        assert_eq!(found.namespace(), route.namespace(), "{uri}");
        assert_eq!(found.operation(), route.operation(), "{uri}");
        assert!(found.handler().same_as(route.handler()), "{uri}");
    }
}

#[test]
fn test_pull_and_import_disambiguated_by_query() {
    let table = image_table(&ServerConfig::default());

    let pull = lookup(&table, Method::POST, "/v1.40/images/create?fromImage=alpine").unwrap();
    assert_eq!(pull.operation(), "create-from-image");

    let import = lookup(&table, Method::POST, "/v1.40/images/create?fromSrc=-&repo=x").unwrap();
    assert_eq!(import.operation(), "create-from-src");

    assert!(lookup(&table, Method::POST, "/v1.40/images/create").is_none());
    assert!(lookup(&table, Method::POST, "/v1.40/images/create?tag=latest").is_none());
}

#[test]
fn test_query_predicates_with_fallback() {
    let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
    register_operation(
        &mut builder,
        Operation::new("a").compat(RouteSpec::post("/things", named("a")).with_query("alpha")),
    )
    .unwrap();
    register_operation(
        &mut builder,
        Operation::new("b").compat(RouteSpec::post("/things", named("b")).with_query("beta")),
    )
    .unwrap();
    register_operation(
        &mut builder,
        Operation::new("fallback").compat(RouteSpec::post("/things", named("fallback"))),
    )
    .unwrap();
    let table = builder.build();

    let op = |uri: &str| lookup(&table, Method::POST, uri).map(Route::operation);
    assert_eq!(op("/v1.0/things?alpha"), Some("a"));
    assert_eq!(op("/v1.0/things?beta=1&other=2"), Some("b"));
    assert_eq!(op("/v1.0/things?alpha=1&beta=1"), Some("a"));
    assert_eq!(op("/v1.0/things"), Some("fallback"));
    assert_eq!(op("/v1.0/things?other"), Some("fallback"));
    assert_eq!(lookup(&table, Method::GET, "/v1.0/things").map(Route::operation), None);
}

#[test]
fn test_fallback_before_predicate_is_a_conflict() {
    let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
    register_operation(
        &mut builder,
        Operation::new("fallback").compat(RouteSpec::post("/things", named("fallback"))),
    )
    .unwrap();

    let err = register_operation(
        &mut builder,
        Operation::new("a").compat(RouteSpec::post("/things", named("a")).with_query("alpha")),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RouteError::Conflict {
            operation: "a",
            existing_operation: "fallback",
            ..
        }
    ));
    assert_eq!(builder.len(), 1);
}

#[test]
fn test_unknown_image_still_routes_to_inspect() {
    let table = image_table(&ServerConfig::default());

    let route = lookup(&table, Method::GET, "/v1.40/libpod/images/unknownname/json").unwrap();
    assert_eq!(route.namespace(), Namespace::Native);
    assert_eq!(route.operation(), "inspect");
    assert_eq!(route.handler().name(), "native.inspect_image");
}

#[test]
fn test_inspect_is_get_only_but_exists_takes_any_method() {
    let table = image_table(&ServerConfig::default());

    assert!(lookup(&table, Method::POST, "/v1.40/images/alpine/json").is_none());
    for method in [Method::GET, Method::HEAD, Method::POST, Method::DELETE] {
        let route = lookup(&table, method, "/v1.40/libpod/images/alpine/exists").unwrap();
        assert_eq!(route.operation(), "exists");
    }
}

#[test]
fn test_compat_only_and_native_only_operations() {
    let table = image_table(&ServerConfig::default());

    assert!(lookup(&table, Method::POST, "/v1.40/build").is_some());
    assert!(lookup(&table, Method::POST, "/v1.40/libpod/build").is_none());
    assert!(lookup(&table, Method::GET, "/v1.40/images/alpine/tree").is_none());
    assert!(lookup(&table, Method::GET, "/v1.40/libpod/images/alpine/tree").is_some());
}

#[test]
fn test_aggregator_twice_is_rejected() {
    let table_len = image_table(&ServerConfig::default()).len();
    let handlers = image_router::ImageHandlers::new(std::sync::Arc::new(
        image_router::MemoryImageBackend::new(),
    ));

    let mut builder = RouteTableBuilder::new(PathVersioner::Negotiated);
    register_image_routes(&mut builder, &handlers).unwrap();
    let err = register_image_routes(&mut builder, &handlers).unwrap_err();

    assert_eq!(err, RouteError::AlreadyRegistered("images"));
    assert_eq!(builder.len(), table_len);
}

#[test]
fn test_versioned_path_is_deterministic() {
    for versioner in [PathVersioner::Negotiated, PathVersioner::fixed("1.40")] {
        for namespace in Namespace::ALL {
            let first = versioner.versioned_path(namespace, "/images/json");
            let second = versioner.versioned_path(namespace, "/images/json");
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_pinned_version_rejects_other_versions() {
    let mut config = ServerConfig::default();
    config.api.version = Some("1.40".into());
    let table = image_table(&config);

    assert!(lookup(&table, Method::GET, "/v1.40/images/json").is_some());
    assert!(lookup(&table, Method::GET, "/v1.41/images/json").is_none());
}

#[test]
fn test_negotiated_version_binds_parameter() {
    let table = image_table(&ServerConfig::default());
    let query = QueryParams::default();
    let lookup = table.match_request(&RouteRequest::new(
        &Method::GET,
        "/v1.41/images/busybox/history",
        &query,
    ));

    let RouteLookup::Matched(m) = lookup else {
        panic!("history route did not match");
    };
    assert_eq!(m.params.get("version"), Some("1.41"));
    assert_eq!(m.params.get("name"), Some("busybox"));
    assert!(lookup_is_miss(&table, "/vlatest/images/json"));
}

fn lookup_is_miss(table: &RouteTable, path: &str) -> bool {
    lookup(table, Method::GET, path).is_none()
}
