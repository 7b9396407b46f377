//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per request
//! - Reuse a caller-provided `X-Request-Id`
//! - Expose the ID to the dispatcher and echo it on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Axum middleware that assigns a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Request received"
    );

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use tower::ServiceExt;

    async fn echo_request_id(Extension(id): Extension<RequestId>) -> String {
        id.0
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo_request_id))
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn header_and_body(req: HttpRequest<Body>) -> (String, String) {
        let resp = app().oneshot(req).await.unwrap();
        let header = resp
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_reuses_incoming_id() {
        let req = HttpRequest::builder()
            .uri("/")
            .header(X_REQUEST_ID, "from-client")
            .body(Body::empty())
            .unwrap();

        let (header, body) = header_and_body(req).await;
        assert_eq!(header, "from-client");
        assert_eq!(body, "from-client");
    }

    #[tokio::test]
    async fn test_generates_missing_id() {
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();

        let (header, body) = header_and_body(req).await;
        assert_eq!(header.len(), 36);
        assert_eq!(header, body);
    }
}
