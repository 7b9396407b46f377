//! Native (`/libpod`) handlers.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use serde::Serialize;

use super::shared::HistoryItem;
use super::{HandlerError, HandlerResponse, HandlerResult, RequestContext};
use crate::images::{abbreviate, ImageBackend, ImageRecord};

/// Native image summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NativeImageSummary {
    pub id: String,
    pub parent_id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub names: Vec<String>,
    pub created: i64,
    pub size: u64,
    pub labels: BTreeMap<String, String>,
    pub dangling: bool,
}

impl From<ImageRecord> for NativeImageSummary {
    fn from(img: ImageRecord) -> Self {
        Self {
            dangling: img.is_dangling(),
            names: img.repo_tags.clone(),
            id: img.id,
            parent_id: img.parent_id.unwrap_or_default(),
            repo_tags: img.repo_tags,
            repo_digests: img.repo_digests,
            created: img.created,
            size: img.size,
            labels: img.labels,
        }
    }
}

/// Native inspect response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NativeImageInspect {
    pub id: String,
    pub digest: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub parent: String,
    pub created: i64,
    pub size: u64,
    pub labels: BTreeMap<String, String>,
    pub architecture: &'static str,
    pub os: &'static str,
    pub layers: Vec<String>,
    pub history: Vec<HistoryItem>,
}

/// A pruned image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PruneItem {
    pub id: String,
    pub size: u64,
}

/// Archive formats accepted by export.
const EXPORT_FORMATS: [&str; 2] = ["docker-archive", "oci-archive"];

/// GET /libpod/images/json
pub async fn list_images(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let all = ctx.query_flag("all")?;
    let images: Vec<NativeImageSummary> = backend
        .list(all)
        .await?
        .into_iter()
        .map(NativeImageSummary::from)
        .collect();
    HandlerResponse::ok(&images)
}

/// POST /libpod/images/prune?all=
pub async fn prune_images(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let all = ctx.query_flag("all")?;
    let pruned: Vec<PruneItem> = backend
        .prune(all)
        .await?
        .into_iter()
        .map(|p| PruneItem {
            id: p.id,
            size: p.size,
        })
        .collect();
    HandlerResponse::ok(&pruned)
}

/// GET /libpod/images/{name}/get?format=
pub async fn export_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let format = ctx.optional_query("format").unwrap_or(EXPORT_FORMATS[0]);
    if !EXPORT_FORMATS.contains(&format) {
        return Err(HandlerError::BadParameter(format!(
            "unknown format {format:?}, expected one of {EXPORT_FORMATS:?}"
        )));
    }

    let archive = backend.export(ctx.param("name")?).await?;
    Ok(HandlerResponse::stream("application/x-tar", archive))
}

/// GET /libpod/images/{name}/json
pub async fn inspect_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let img = backend.inspect(ctx.param("name")?).await?;
    let digest = img
        .repo_digests
        .first()
        .and_then(|d| d.split_once('@'))
        .map(|(_, digest)| digest.to_string())
        .unwrap_or_default();

    HandlerResponse::ok(&NativeImageInspect {
        digest,
        parent: img.parent_id.unwrap_or_default(),
        created: img.created,
        size: img.size,
        architecture: std::env::consts::ARCH,
        os: "linux",
        layers: img.layers.into_iter().map(|l| l.digest).collect(),
        history: img
            .history
            .into_iter()
            .map(|h| HistoryItem {
                id: h.id,
                created: h.created,
                created_by: h.created_by,
                tags: h.tags,
                size: h.size,
                comment: h.comment,
            })
            .collect(),
        id: img.id,
        repo_tags: img.repo_tags,
        repo_digests: img.repo_digests,
        labels: img.labels,
    })
}

/// ANY /libpod/images/{name}/exists
pub async fn image_exists(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let name = ctx.param("name")?;
    if backend.exists(name).await? {
        Ok(HandlerResponse::no_content())
    } else {
        Err(HandlerError::NotFound(format!("no such image: {name}")))
    }
}

/// ANY /libpod/images/{name}/tree
pub async fn image_tree(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let img = backend.inspect(ctx.param("name")?).await?;
    HandlerResponse::ok(&serde_json::json!({ "Tree": render_tree(&img) }))
}

fn render_tree(img: &ImageRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Image ID: {}", img.short_id());
    let _ = writeln!(out, "Tags:     {:?}", img.repo_tags);
    let _ = writeln!(out, "Size:     {}", img.size);
    let _ = writeln!(out, "Image Layers");
    for (i, layer) in img.layers.iter().enumerate() {
        let branch = if i + 1 == img.layers.len() { "└──" } else { "├──" };
        let digest = layer.digest.strip_prefix("sha256:").unwrap_or(&layer.digest);
        let _ = writeln!(
            out,
            "{branch} ID: {} Size: {}",
            abbreviate(digest),
            layer.size
        );
    }
    out
}
