//! Uniform handler invocation.
//!
//! Every business handler, whichever module implements it, is called as
//! `(RequestContext, Request) -> Result<HandlerResponse, HandlerError>`. The
//! router stores [`HandlerRef`]s only and passes results through untouched.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::images::ImageError;
use crate::routing::{Namespace, PathParams, QueryParams};

pub type HandlerResult = Result<HandlerResponse, HandlerError>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// A business operation reachable from the route table.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext, req: Request<Body>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext, req: Request<Body>) -> HandlerFuture {
        Box::pin(self(ctx, req))
    }
}

/// Shared, named reference to a handler.
#[derive(Clone)]
pub struct HandlerRef {
    name: &'static str,
    inner: Arc<dyn Handler>,
}

impl HandlerRef {
    pub fn new<H: Handler>(name: &'static str, handler: H) -> Self {
        Self {
            name,
            inner: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, ctx: RequestContext, req: Request<Body>) -> HandlerFuture {
        self.inner.call(ctx, req)
    }

    /// True when both refer to the same handler instance.
    pub fn same_as(&self, other: &HandlerRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRef").field(&self.name).finish()
    }
}

/// What the router learned about a request before dispatching it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub namespace: Namespace,
    pub operation: &'static str,
    /// Version from the request path, or the pinned version.
    pub api_version: Option<String>,
    pub params: PathParams,
    pub query: QueryParams,
}

impl RequestContext {
    /// A required path parameter.
    pub fn param(&self, name: &str) -> Result<&str, HandlerError> {
        self.params
            .get(name)
            .ok_or_else(|| HandlerError::BadParameter(format!("missing path parameter {name}")))
    }

    /// A required, non-empty query parameter.
    pub fn required_query(&self, key: &str) -> Result<&str, HandlerError> {
        match self.query.get(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(HandlerError::BadParameter(format!("{key} is required"))),
        }
    }

    /// An optional, non-empty query parameter.
    pub fn optional_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).filter(|v| !v.is_empty())
    }

    /// A boolean query flag; absent means false.
    pub fn query_flag(&self, key: &str) -> Result<bool, HandlerError> {
        match self.query.get(key) {
            None => Ok(false),
            Some("" | "1" | "true" | "True") => Ok(true),
            Some("0" | "false" | "False") => Ok(false),
            Some(other) => Err(HandlerError::BadParameter(format!(
                "invalid boolean {other:?} for {key}"
            ))),
        }
    }
}

/// Body of a successful handler response.
#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Json(serde_json::Value),
    Stream {
        content_type: &'static str,
        body: Body,
    },
}

/// Status and body produced by a handler.
#[derive(Debug)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> HandlerResult {
        let value = serde_json::to_value(value)
            .map_err(|e| HandlerError::Internal(format!("failed to encode response: {e}")))?;
        Ok(Self {
            status,
            body: ResponseBody::Json(value),
        })
    }

    pub fn ok<T: Serialize>(value: &T) -> HandlerResult {
        Self::json(StatusCode::OK, value)
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn stream(content_type: &'static str, body: impl Into<Body>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Stream {
                content_type,
                body: body.into(),
            },
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Empty => self.status.into_response(),
            ResponseBody::Json(value) => (self.status, Json(value)).into_response(),
            ResponseBody::Stream { content_type, body } => {
                (self.status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}

/// Classified handler failure, passed through the router verbatim.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadParameter(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadParameter(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn cause(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "no such image",
            Self::Conflict(_) => "conflict",
            Self::BadParameter(_) => "bad parameter",
            Self::PayloadTooLarge(_) => "payload too large",
            Self::NotImplemented(_) => "not implemented",
            Self::Internal(_) => "internal error",
        }
    }
}

/// Error document returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub cause: &'static str,
    pub message: String,
    pub response: u16,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            cause: self.cause(),
            message: self.to_string(),
            response: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ImageError> for HandlerError {
    fn from(err: ImageError) -> Self {
        let message = err.to_string();
        match err {
            ImageError::NotFound(_) => Self::NotFound(message),
            ImageError::Conflict(_) => Self::Conflict(message),
            ImageError::InvalidReference(_) | ImageError::InvalidArchive(_) => {
                Self::BadParameter(message)
            }
            ImageError::Unsupported(_) => Self::NotImplemented(message),
            ImageError::Storage(_) => Self::Internal(message),
        }
    }
}
