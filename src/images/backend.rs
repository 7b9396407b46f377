//! Image store collaborator interface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ImageResult<T> = Result<T, ImageError>;

/// Errors reported by an image backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("no such image: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid reference format: {0}")]
    InvalidReference(String),

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("{0} is not supported by this image store")]
    Unsupported(&'static str),

    #[error("storage error: {0}")]
    Storage(String),
}

/// One layer of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub digest: String,
    pub size: u64,
}

/// One step of an image's build history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created: i64,
    pub created_by: String,
    pub size: u64,
    pub comment: String,
    pub tags: Vec<String>,
}

/// Stored image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Hex digest without algorithm prefix.
    pub id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub parent_id: Option<String>,
    /// Unix seconds.
    pub created: i64,
    pub size: u64,
    pub labels: BTreeMap<String, String>,
    pub layers: Vec<Layer>,
    pub history: Vec<HistoryEntry>,
}

impl ImageRecord {
    pub fn is_dangling(&self) -> bool {
        self.repo_tags.is_empty()
    }

    pub fn short_id(&self) -> &str {
        abbreviate(&self.id)
    }
}

/// First 12 characters of an ID or digest.
pub fn abbreviate(id: &str) -> &str {
    id.char_indices().nth(12).map_or(id, |(i, _)| &id[..i])
}

/// A registry search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub description: String,
    pub stars: u32,
    pub official: bool,
    pub automated: bool,
}

/// An image removed by prune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedImage {
    pub id: String,
    pub size: u64,
}

/// Outcome of removing an image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReport {
    pub untagged: Vec<String>,
    pub deleted: Vec<String>,
}

/// Storage and registry operations behind the image handlers.
///
/// `name` arguments accept a full ID, a unique ID prefix, or a repository
/// reference (`alpine`, `alpine:3.19`).
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Pull `reference` from a registry.
    async fn pull(&self, reference: &str) -> ImageResult<ImageRecord>;

    /// Create an image from a root filesystem archive fetched from `source`
    /// (`-` means `archive` holds the content).
    async fn import(
        &self,
        source: &str,
        reference: Option<&str>,
        archive: Bytes,
    ) -> ImageResult<ImageRecord>;

    async fn list(&self, all: bool) -> ImageResult<Vec<ImageRecord>>;

    /// Load images from an archive; returns the loaded references.
    async fn load(&self, archive: Bytes) -> ImageResult<Vec<String>>;

    /// Remove dangling images, or every untagged-or-unused image with `all`.
    async fn prune(&self, all: bool) -> ImageResult<Vec<PrunedImage>>;

    async fn search(&self, term: &str, limit: Option<usize>) -> ImageResult<Vec<SearchResult>>;

    async fn remove(&self, name: &str, force: bool) -> ImageResult<RemoveReport>;

    /// Serialize an image to an archive.
    async fn export(&self, name: &str) -> ImageResult<Bytes>;

    async fn history(&self, name: &str) -> ImageResult<Vec<HistoryEntry>>;

    async fn inspect(&self, name: &str) -> ImageResult<ImageRecord>;

    /// Add `reference` as a tag of `name`.
    async fn tag(&self, name: &str, reference: &str) -> ImageResult<()>;

    async fn exists(&self, name: &str) -> ImageResult<bool>;

    /// Build from a context archive, tagging the result with `tags`.
    async fn build(&self, context: Bytes, tags: Vec<String>) -> ImageResult<ImageRecord>;

    /// Create an image from a container's filesystem.
    async fn commit(&self, container: &str, reference: Option<&str>) -> ImageResult<ImageRecord>;
}

/// Normalize a repository reference, defaulting the tag to `latest`.
pub fn normalize_reference(reference: &str) -> ImageResult<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.chars().any(|c| c.is_whitespace() || c.is_ascii_uppercase()) {
        return Err(ImageError::InvalidReference(reference.to_string()));
    }
    if reference.contains('@') {
        return Ok(reference.to_string());
    }

    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    let name = &reference[name_start..];
    if name.is_empty() || name.starts_with(':') {
        return Err(ImageError::InvalidReference(reference.to_string()));
    }
    if name.contains(':') {
        Ok(reference.to_string())
    } else {
        Ok(format!("{reference}:latest"))
    }
}

/// Join a repository and an optional tag into one reference.
pub fn join_reference(repo: &str, tag: Option<&str>) -> ImageResult<String> {
    match tag {
        Some(tag) if !tag.is_empty() => normalize_reference(&format!("{repo}:{tag}")),
        _ => normalize_reference(repo),
    }
}
