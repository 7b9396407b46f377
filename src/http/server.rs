//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all dispatcher
//! - Wire up middleware (trace, request ID, timeout, body limit)
//! - Look requests up in the frozen route table and invoke the handler
//! - Turn routing misses into a plain 404
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::handlers::RequestContext;
use crate::http::request::{request_id_middleware, RequestId};
use crate::observability::metrics;
use crate::routing::pattern::VERSION_PARAM;
use crate::routing::{QueryParams, RouteMatch, RouteRequest, RouteTable};

/// Header set on responses produced because no route matched.
pub const ROUTE_MISS_HEADER: &str = "x-route-miss";

const ROUTE_MISS_BODY: &str = "No matching route found";

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
}

/// HTTP server for the image API.
pub struct HttpServer {
    router: Router,
    routes: Arc<RouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server serving the given route table.
    pub fn new(config: &ServerConfig, routes: Arc<RouteTable>) -> Self {
        let router = build_router(config, routes.clone());
        Self { router, routes }
    }

    /// The table this server dispatches against.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ServerConfig, routes: Arc<RouteTable>) -> Router {
    let mut router = Router::new()
        .route("/{*path}", any(dispatch))
        .route("/", any(dispatch))
        .with_state(AppState { routes })
        .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
        .layer(DefaultBodyLimit::disable());

    if let Some(secs) = config.timeouts.request_secs {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
    }

    router
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Route a request through the table and invoke the selected handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = QueryParams::parse(request.uri().query());

    let lookup = state
        .routes
        .match_request(&RouteRequest::new(&method, &path, &query));
    let Some(RouteMatch { route, params }) = lookup.matched() else {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            "No route matched"
        );
        metrics::record_route_miss(method.as_str());
        return route_miss();
    };

    let api_version = params
        .get(VERSION_PARAM)
        .or_else(|| state.routes.versioner().pinned_version())
        .map(String::from);
    let namespace = route.namespace();
    let operation = route.operation();
    let handler = route.handler().clone();

    tracing::debug!(
        request_id = %request_id,
        namespace = %namespace,
        operation,
        handler = handler.name(),
        "Dispatching request"
    );

    let ctx = RequestContext {
        request_id: request_id.clone(),
        namespace,
        operation,
        api_version,
        params,
        query,
    };

    let response = match handler.invoke(ctx, request).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(request_id = %request_id, operation, error = %err, "Handler failed");
            } else {
                tracing::debug!(request_id = %request_id, operation, error = %err, "Handler rejected request");
            }
            err.into_response()
        }
    };

    metrics::record_request(operation, namespace, response.status().as_u16(), start);
    response
}

fn route_miss() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(ROUTE_MISS_HEADER, "1")],
        ROUTE_MISS_BODY,
    )
        .into_response()
}
