//! Docker Engine API shaped handlers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::Serialize;

use super::{json_lines, read_body, HandlerError, HandlerResponse, HandlerResult, RequestContext};
use crate::images::{join_reference, ImageBackend, ImageRecord};

/// Image summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    pub id: String,
    pub parent_id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub created: i64,
    pub size: u64,
    pub virtual_size: u64,
    pub shared_size: i64,
    pub labels: BTreeMap<String, String>,
    pub containers: i64,
}

impl From<ImageRecord> for ImageSummary {
    fn from(img: ImageRecord) -> Self {
        let repo_tags = if img.repo_tags.is_empty() {
            vec!["<none>:<none>".to_string()]
        } else {
            img.repo_tags
        };
        Self {
            id: format!("sha256:{}", img.id),
            parent_id: img.parent_id.map(|p| format!("sha256:{p}")).unwrap_or_default(),
            repo_tags,
            repo_digests: img.repo_digests,
            created: img.created,
            size: img.size,
            virtual_size: img.size,
            shared_size: -1,
            labels: img.labels,
            containers: -1,
        }
    }
}

/// Root filesystem description.
#[derive(Debug, Serialize)]
pub struct RootFs {
    #[serde(rename = "Type")]
    pub root_type: &'static str,
    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

/// Image inspect response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspect {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub parent: String,
    pub comment: String,
    pub created: i64,
    pub architecture: &'static str,
    pub os: &'static str,
    pub size: u64,
    pub virtual_size: u64,
    pub labels: BTreeMap<String, String>,
    #[serde(rename = "RootFS")]
    pub root_fs: RootFs,
}

/// A deleted image in a prune report.
#[derive(Debug, Serialize)]
pub struct PruneDeleted {
    #[serde(rename = "Deleted")]
    pub deleted: String,
}

/// Prune report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PruneReport {
    pub images_deleted: Vec<PruneDeleted>,
    pub space_reclaimed: u64,
}

/// POST /images/create?fromImage=&tag=
pub async fn create_image_from_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let reference = join_reference(ctx.required_query("fromImage")?, ctx.optional_query("tag"))?;
    let image = backend.pull(&reference).await?;

    tracing::info!(
        request_id = %ctx.request_id,
        reference = %reference,
        id = image.short_id(),
        "Image pulled"
    );

    let messages = [
        serde_json::json!({ "status": format!("Pulling from {reference}") }),
        serde_json::json!({ "status": "Pull complete", "id": image.short_id() }),
        serde_json::json!({ "status": format!("Digest: sha256:{}", image.id) }),
        serde_json::json!({ "status": format!("Status: Downloaded newer image for {reference}") }),
    ];
    Ok(HandlerResponse::stream("application/json", json_lines(&messages)))
}

/// POST /images/create?fromSrc=&repo=&tag=
pub async fn create_image_from_src(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    req: Request<Body>,
) -> HandlerResult {
    let source = ctx.required_query("fromSrc")?.to_string();
    let reference = ctx
        .optional_query("repo")
        .map(|repo| join_reference(repo, ctx.optional_query("tag")))
        .transpose()?;
    let archive = read_body(req).await?;

    let image = backend.import(&source, reference.as_deref(), archive).await?;
    HandlerResponse::ok(&serde_json::json!({ "status": format!("sha256:{}", image.id) }))
}

/// GET /images/json
pub async fn list_images(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let all = ctx.query_flag("all")?;
    let summaries: Vec<ImageSummary> = backend
        .list(all)
        .await?
        .into_iter()
        .map(ImageSummary::from)
        .collect();
    HandlerResponse::ok(&summaries)
}

/// POST /images/prune?filters=
///
/// Only dangling images are removed unless `filters` carries
/// `{"dangling": ["false"]}`.
pub async fn prune_images(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let all = match ctx.optional_query("filters") {
        None => false,
        Some(raw) => {
            let filters: HashMap<String, Vec<String>> = serde_json::from_str(raw)
                .map_err(|e| HandlerError::BadParameter(format!("invalid filters: {e}")))?;
            filters
                .get("dangling")
                .is_some_and(|v| v.iter().any(|d| d == "false" || d == "0"))
        }
    };

    let pruned = backend.prune(all).await?;
    let report = PruneReport {
        space_reclaimed: pruned.iter().map(|p| p.size).sum(),
        images_deleted: pruned
            .into_iter()
            .map(|p| PruneDeleted {
                deleted: format!("sha256:{}", p.id),
            })
            .collect(),
    };
    HandlerResponse::ok(&report)
}

/// GET /images/{name}/get
pub async fn export_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let archive = backend.export(ctx.param("name")?).await?;
    Ok(HandlerResponse::stream("application/x-tar", archive))
}

/// GET /images/{name}/json
pub async fn inspect_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let img = backend.inspect(ctx.param("name")?).await?;
    let comment = img
        .history
        .first()
        .map(|h| h.comment.clone())
        .unwrap_or_default();

    HandlerResponse::ok(&ImageInspect {
        id: format!("sha256:{}", img.id),
        repo_tags: img.repo_tags,
        repo_digests: img.repo_digests,
        parent: img.parent_id.map(|p| format!("sha256:{p}")).unwrap_or_default(),
        comment,
        created: img.created,
        architecture: std::env::consts::ARCH,
        os: "linux",
        size: img.size,
        virtual_size: img.size,
        labels: img.labels,
        root_fs: RootFs {
            root_type: "layers",
            layers: img.layers.into_iter().map(|l| l.digest).collect(),
        },
    })
}

/// POST /commit?container=&repo=&tag=
pub async fn commit_container(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let container = ctx.required_query("container")?;
    let reference = ctx
        .optional_query("repo")
        .map(|repo| join_reference(repo, ctx.optional_query("tag")))
        .transpose()?;

    let image = backend.commit(container, reference.as_deref()).await?;
    HandlerResponse::json(
        StatusCode::CREATED,
        &serde_json::json!({ "Id": format!("sha256:{}", image.id) }),
    )
}
