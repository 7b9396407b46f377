//! Handlers served unchanged on both namespaces.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::Serialize;

use super::{json_lines, read_body, HandlerError, HandlerResponse, HandlerResult, RequestContext};
use crate::images::{join_reference, ImageBackend};

/// Registry search hit.
#[derive(Debug, Serialize)]
pub struct SearchEntry {
    pub name: String,
    pub description: String,
    pub star_count: u32,
    pub is_official: bool,
    pub is_automated: bool,
}

/// One line of a removal report.
#[derive(Debug, Serialize)]
pub enum DeleteEntry {
    Untagged(String),
    Deleted(String),
}

/// One history step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryItem {
    pub id: String,
    pub created: i64,
    pub created_by: String,
    pub tags: Vec<String>,
    pub size: u64,
    pub comment: String,
}

/// POST /images/load
pub async fn load_image(
    backend: Arc<dyn ImageBackend>,
    _ctx: RequestContext,
    req: Request<Body>,
) -> HandlerResult {
    let archive = read_body(req).await?;
    let loaded = backend.load(archive).await?;

    let stream: String = loaded
        .iter()
        .map(|name| format!("Loaded image: {name}\n"))
        .collect();
    HandlerResponse::ok(&serde_json::json!({ "stream": stream }))
}

/// GET /images/search?term=
pub async fn search_images(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let term = ctx.required_query("term")?;
    let limit = ctx
        .optional_query("limit")
        .map(|l| {
            l.parse::<usize>()
                .map_err(|_| HandlerError::BadParameter(format!("invalid limit {l:?}")))
        })
        .transpose()?;

    let results: Vec<SearchEntry> = backend
        .search(term, limit)
        .await?
        .into_iter()
        .map(|r| SearchEntry {
            name: r.name,
            description: r.description,
            star_count: r.stars,
            is_official: r.official,
            is_automated: r.automated,
        })
        .collect();
    HandlerResponse::ok(&results)
}

/// DELETE /images/{name}
pub async fn remove_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let name = ctx.param("name")?;
    let force = ctx.query_flag("force")?;
    let report = backend.remove(name, force).await?;

    tracing::info!(
        request_id = %ctx.request_id,
        image = name,
        untagged = report.untagged.len(),
        deleted = report.deleted.len(),
        "Image removed"
    );

    let entries: Vec<DeleteEntry> = report
        .untagged
        .into_iter()
        .map(DeleteEntry::Untagged)
        .chain(
            report
                .deleted
                .into_iter()
                .map(|id| DeleteEntry::Deleted(format!("sha256:{id}"))),
        )
        .collect();
    HandlerResponse::ok(&entries)
}

/// GET /images/{name}/history
pub async fn history_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let history: Vec<HistoryItem> = backend
        .history(ctx.param("name")?)
        .await?
        .into_iter()
        .map(|h| HistoryItem {
            id: format!("sha256:{}", h.id),
            created: h.created,
            created_by: h.created_by,
            tags: h.tags,
            size: h.size,
            comment: h.comment,
        })
        .collect();
    HandlerResponse::ok(&history)
}

/// POST /images/{name}/tag?repo=&tag=
pub async fn tag_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    _req: Request<Body>,
) -> HandlerResult {
    let name = ctx.param("name")?;
    let reference = join_reference(ctx.required_query("repo")?, ctx.optional_query("tag"))?;
    backend.tag(name, &reference).await?;
    Ok(HandlerResponse::empty(StatusCode::CREATED))
}

/// POST /build?t=
pub async fn build_image(
    backend: Arc<dyn ImageBackend>,
    ctx: RequestContext,
    req: Request<Body>,
) -> HandlerResult {
    let tags = ctx
        .query
        .get_all("t")
        .filter(|t| !t.is_empty())
        .map(|t| join_reference(t, None))
        .collect::<Result<Vec<_>, _>>()?;
    let context = read_body(req).await?;
    if context.is_empty() {
        return Err(HandlerError::BadParameter("build context is empty".into()));
    }

    let image = backend.build(context, tags).await?;
    let mut messages = vec![serde_json::json!({
        "stream": format!("Successfully built {}\n", image.short_id())
    })];
    messages.extend(
        image
            .repo_tags
            .iter()
            .map(|t| serde_json::json!({ "stream": format!("Successfully tagged {t}\n") })),
    );
    Ok(HandlerResponse::stream("application/json", json_lines(&messages)))
}
