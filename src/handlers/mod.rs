//! Image handlers.
//!
//! # Layout
//! ```text
//! adapter.rs  uniform (RequestContext, Request) -> HandlerResult contract
//! shared.rs   handlers served unchanged on both namespaces
//! compat.rs   Docker Engine API shaped variants
//! native.rs   native (/libpod) variants and native-only operations
//! ```

pub mod adapter;
pub mod compat;
pub mod native;
pub mod shared;

use std::future::Future;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::FromRequest;
use axum::http::{Request, StatusCode};

pub use adapter::{
    ErrorResponse, Handler, HandlerError, HandlerFuture, HandlerRef, HandlerResponse,
    HandlerResult, RequestContext, ResponseBody,
};

use crate::images::ImageBackend;

/// Every image handler the route table can point at.
#[derive(Debug, Clone)]
pub struct ImageHandlers {
    pub create_from_image: HandlerRef,
    pub create_from_src: HandlerRef,
    pub compat_list: HandlerRef,
    pub native_list: HandlerRef,
    pub load: HandlerRef,
    pub compat_prune: HandlerRef,
    pub native_prune: HandlerRef,
    pub search: HandlerRef,
    pub remove: HandlerRef,
    pub compat_export: HandlerRef,
    pub native_export: HandlerRef,
    pub history: HandlerRef,
    pub compat_inspect: HandlerRef,
    pub native_inspect: HandlerRef,
    pub tag: HandlerRef,
    pub commit: HandlerRef,
    pub build: HandlerRef,
    pub exists: HandlerRef,
    pub tree: HandlerRef,
}

impl ImageHandlers {
    /// Bind every handler to `backend`.
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        let b = &backend;
        Self {
            create_from_image: bind("compat.create_from_image", b, compat::create_image_from_image),
            create_from_src: bind("compat.create_from_src", b, compat::create_image_from_src),
            compat_list: bind("compat.list_images", b, compat::list_images),
            native_list: bind("native.list_images", b, native::list_images),
            load: bind("load_image", b, shared::load_image),
            compat_prune: bind("compat.prune_images", b, compat::prune_images),
            native_prune: bind("native.prune_images", b, native::prune_images),
            search: bind("search_images", b, shared::search_images),
            remove: bind("remove_image", b, shared::remove_image),
            compat_export: bind("compat.export_image", b, compat::export_image),
            native_export: bind("native.export_image", b, native::export_image),
            history: bind("history_image", b, shared::history_image),
            compat_inspect: bind("compat.inspect_image", b, compat::inspect_image),
            native_inspect: bind("native.inspect_image", b, native::inspect_image),
            tag: bind("tag_image", b, shared::tag_image),
            commit: bind("compat.commit_container", b, compat::commit_container),
            build: bind("build_image", b, shared::build_image),
            exists: bind("native.image_exists", b, native::image_exists),
            tree: bind("native.image_tree", b, native::image_tree),
        }
    }
}

/// Wrap a backend-taking handler fn as a [`HandlerRef`].
fn bind<F, Fut>(name: &'static str, backend: &Arc<dyn ImageBackend>, f: F) -> HandlerRef
where
    F: Fn(Arc<dyn ImageBackend>, RequestContext, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let backend = Arc::clone(backend);
    HandlerRef::new(name, move |ctx: RequestContext, req: Request<Body>| {
        f(Arc::clone(&backend), ctx, req)
    })
}

/// Read the whole request body, within the server's body limit.
async fn read_body(req: Request<Body>) -> Result<Bytes, HandlerError> {
    Bytes::from_request(req, &()).await.map_err(|rejection| {
        let message = format!("failed to read request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HandlerError::PayloadTooLarge(message)
        } else {
            HandlerError::BadParameter(message)
        }
    })
}

/// Encode one JSON message per line, the Docker progress-stream format.
fn json_lines(messages: &[serde_json::Value]) -> String {
    messages.iter().map(|m| format!("{m}\n")).collect()
}
