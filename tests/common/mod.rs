//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use image_router::handlers::{HandlerRef, HandlerResponse, RequestContext};
use image_router::http::build_router;
use image_router::{build_route_table, ImageHandlers, MemoryImageBackend, RouteTable, ServerConfig};

/// Response pieces captured from a oneshot call.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Route table over a fresh in-memory store.
pub fn image_table(config: &ServerConfig) -> Arc<RouteTable> {
    let handlers = ImageHandlers::new(Arc::new(MemoryImageBackend::new()));
    Arc::new(build_route_table(config, &handlers).unwrap())
}

/// Full application router over a fresh in-memory store.
pub fn app() -> Router {
    app_with(&ServerConfig::default())
}

pub fn app_with(config: &ServerConfig) -> Router {
    build_router(config, image_table(config))
}

/// Send one request through `app` and collect the response.
pub async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn post(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::POST, uri, Body::empty()).await
}

/// Handler that answers with its own name, for routing-only tests.
pub fn named(name: &'static str) -> HandlerRef {
    HandlerRef::new(name, move |_ctx: RequestContext, _req: Request<Body>| async move {
        HandlerResponse::ok(&serde_json::json!({ "handler": name }))
    })
}
