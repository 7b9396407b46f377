//! In-memory image store.
//!
//! Keeps image metadata only. Pulls synthesize a single-layer image, and
//! archives are JSON manifests, so `export` output can be fed back to `load`.
//! There is no registry and no container runtime: search covers local
//! repositories, and build/commit are unsupported.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::images::backend::{
    normalize_reference, HistoryEntry, ImageBackend, ImageError, ImageRecord, ImageResult, Layer,
    PrunedImage, RemoveReport, SearchResult,
};

/// How a name argument resolved to an image.
enum Resolved {
    Id(usize),
    Tag(usize, String),
}

impl Resolved {
    fn index(&self) -> usize {
        match self {
            Resolved::Id(i) | Resolved::Tag(i, _) => *i,
        }
    }
}

/// Image metadata held in process memory.
#[derive(Debug, Default)]
pub struct MemoryImageBackend {
    images: RwLock<Vec<ImageRecord>>,
}

impl MemoryImageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_images(images: Vec<ImageRecord>) -> Self {
        Self {
            images: RwLock::new(images),
        }
    }
}

fn new_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Repository part of a normalized reference.
fn repository(reference: &str) -> &str {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => &reference[..name_start + i],
        None => reference,
    }
}

fn resolve(images: &[ImageRecord], name: &str) -> ImageResult<Resolved> {
    let id = name.strip_prefix("sha256:").unwrap_or(name);
    if let Some(i) = images.iter().position(|img| img.id == id) {
        return Ok(Resolved::Id(i));
    }

    if let Ok(reference) = normalize_reference(name) {
        if let Some(i) = images.iter().position(|img| img.repo_tags.contains(&reference)) {
            return Ok(Resolved::Tag(i, reference));
        }
    }

    if id.len() >= 3 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut candidates = images
            .iter()
            .enumerate()
            .filter(|(_, img)| img.id.starts_with(id))
            .map(|(i, _)| i);
        if let Some(first) = candidates.next() {
            if candidates.next().is_some() {
                return Err(ImageError::Conflict(format!("ambiguous image ID prefix {id}")));
            }
            return Ok(Resolved::Id(first));
        }
    }

    Err(ImageError::NotFound(name.to_string()))
}

fn untag_everywhere(images: &mut [ImageRecord], reference: &str) {
    for image in images.iter_mut() {
        image.repo_tags.retain(|t| t != reference);
    }
}

#[async_trait]
impl ImageBackend for MemoryImageBackend {
    async fn pull(&self, reference: &str) -> ImageResult<ImageRecord> {
        let reference = normalize_reference(reference)?;
        let mut images = self.images.write().await;
        if let Some(existing) = images.iter().find(|img| img.repo_tags.contains(&reference)) {
            return Ok(existing.clone());
        }

        let id = new_id();
        let created = now();
        let layer = Layer {
            digest: format!("sha256:{}", new_id()),
            size: reference.len() as u64 * 1024 * 1024,
        };
        let record = ImageRecord {
            repo_digests: vec![format!("{}@sha256:{}", repository(&reference), new_id())],
            repo_tags: vec![reference.clone()],
            parent_id: None,
            created,
            size: layer.size,
            labels: Default::default(),
            history: vec![HistoryEntry {
                id: id.clone(),
                created,
                created_by: format!("pull {reference}"),
                size: layer.size,
                comment: String::new(),
                tags: vec![reference.clone()],
            }],
            layers: vec![layer],
            id,
        };

        tracing::debug!(reference = %reference, id = record.short_id(), "Image pulled");
        images.push(record.clone());
        Ok(record)
    }

    async fn import(
        &self,
        source: &str,
        reference: Option<&str>,
        archive: Bytes,
    ) -> ImageResult<ImageRecord> {
        if source != "-" {
            return Err(ImageError::Unsupported("importing from a remote source"));
        }
        if archive.is_empty() {
            return Err(ImageError::InvalidArchive("empty archive".into()));
        }
        let reference = reference.map(normalize_reference).transpose()?;

        let id = new_id();
        let created = now();
        let size = archive.len() as u64;
        let tags: Vec<String> = reference.into_iter().collect();
        let record = ImageRecord {
            repo_digests: Vec::new(),
            parent_id: None,
            created,
            size,
            labels: Default::default(),
            layers: vec![Layer {
                digest: format!("sha256:{}", new_id()),
                size,
            }],
            history: vec![HistoryEntry {
                id: id.clone(),
                created,
                created_by: "import -".into(),
                size,
                comment: "Imported from -".into(),
                tags: tags.clone(),
            }],
            repo_tags: tags,
            id,
        };

        let mut images = self.images.write().await;
        for tag in &record.repo_tags {
            untag_everywhere(&mut images, tag);
        }
        images.push(record.clone());
        Ok(record)
    }

    async fn list(&self, all: bool) -> ImageResult<Vec<ImageRecord>> {
        let images = self.images.read().await;
        let parents: BTreeSet<&str> = images
            .iter()
            .filter_map(|img| img.parent_id.as_deref())
            .collect();
        Ok(images
            .iter()
            .rev()
            .filter(|img| all || !(img.is_dangling() && parents.contains(img.id.as_str())))
            .cloned()
            .collect())
    }

    async fn load(&self, archive: Bytes) -> ImageResult<Vec<String>> {
        let loaded: Vec<ImageRecord> = serde_json::from_slice(&archive)
            .map_err(|e| ImageError::InvalidArchive(e.to_string()))?;

        let mut images = self.images.write().await;
        let mut names = Vec::new();
        for record in loaded {
            for tag in &record.repo_tags {
                untag_everywhere(&mut images, tag);
            }
            images.retain(|img| img.id != record.id);
            if record.repo_tags.is_empty() {
                names.push(format!("sha256:{}", record.id));
            } else {
                names.extend(record.repo_tags.iter().cloned());
            }
            images.push(record);
        }
        Ok(names)
    }

    async fn prune(&self, all: bool) -> ImageResult<Vec<PrunedImage>> {
        let mut images = self.images.write().await;
        let mut pruned = Vec::new();
        images.retain(|img| {
            let remove = all || img.is_dangling();
            if remove {
                pruned.push(PrunedImage {
                    id: img.id.clone(),
                    size: img.size,
                });
            }
            !remove
        });
        tracing::debug!(count = pruned.len(), "Images pruned");
        Ok(pruned)
    }

    async fn search(&self, term: &str, limit: Option<usize>) -> ImageResult<Vec<SearchResult>> {
        let images = self.images.read().await;
        let repositories: BTreeSet<&str> = images
            .iter()
            .flat_map(|img| img.repo_tags.iter())
            .map(|tag| repository(tag))
            .filter(|repo| repo.contains(term))
            .collect();

        Ok(repositories
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|repo| SearchResult {
                name: repo.to_string(),
                description: String::new(),
                stars: 0,
                official: !repo.contains('/'),
                automated: false,
            })
            .collect())
    }

    async fn remove(&self, name: &str, force: bool) -> ImageResult<RemoveReport> {
        let mut images = self.images.write().await;
        let resolved = resolve(&images, name)?;
        let index = resolved.index();

        if let Resolved::Tag(_, reference) = &resolved {
            if images[index].repo_tags.len() > 1 {
                images[index].repo_tags.retain(|t| t != reference);
                return Ok(RemoveReport {
                    untagged: vec![reference.clone()],
                    deleted: Vec::new(),
                });
            }
        }

        let image = &images[index];
        if !force && image.repo_tags.len() > 1 {
            return Err(ImageError::Conflict(format!(
                "unable to delete {} (must be forced) - image is referenced in multiple repositories",
                image.short_id()
            )));
        }
        if !force && images.iter().any(|img| img.parent_id.as_deref() == Some(image.id.as_str())) {
            return Err(ImageError::Conflict(format!(
                "unable to delete {} - image has dependent child images",
                image.short_id()
            )));
        }

        let removed = images.remove(index);
        Ok(RemoveReport {
            untagged: removed.repo_tags,
            deleted: vec![removed.id],
        })
    }

    async fn export(&self, name: &str) -> ImageResult<Bytes> {
        let images = self.images.read().await;
        let record = &images[resolve(&images, name)?.index()];
        serde_json::to_vec(&[record])
            .map(Bytes::from)
            .map_err(|e| ImageError::Storage(e.to_string()))
    }

    async fn history(&self, name: &str) -> ImageResult<Vec<HistoryEntry>> {
        let images = self.images.read().await;
        Ok(images[resolve(&images, name)?.index()].history.clone())
    }

    async fn inspect(&self, name: &str) -> ImageResult<ImageRecord> {
        let images = self.images.read().await;
        Ok(images[resolve(&images, name)?.index()].clone())
    }

    async fn tag(&self, name: &str, reference: &str) -> ImageResult<()> {
        let reference = normalize_reference(reference)?;
        let mut images = self.images.write().await;
        let index = resolve(&images, name)?.index();
        if images[index].repo_tags.contains(&reference) {
            return Ok(());
        }
        untag_everywhere(&mut images, &reference);
        images[index].repo_tags.push(reference);
        Ok(())
    }

    async fn exists(&self, name: &str) -> ImageResult<bool> {
        let images = self.images.read().await;
        match resolve(&images, name) {
            Ok(_) => Ok(true),
            Err(ImageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn build(&self, _context: Bytes, _tags: Vec<String>) -> ImageResult<ImageRecord> {
        Err(ImageError::Unsupported("build"))
    }

    async fn commit(&self, _container: &str, _reference: Option<&str>) -> ImageResult<ImageRecord> {
        Err(ImageError::Unsupported("commit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pull_is_idempotent_per_reference() {
        let store = MemoryImageBackend::new();
        let first = store.pull("alpine").await.unwrap();
        let second = store.pull("alpine:latest").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.repo_tags, vec!["alpine:latest".to_string()]);
        assert_eq!(store.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_by_prefix_and_tag() {
        let store = MemoryImageBackend::new();
        let image = store.pull("busybox:1.36").await.unwrap();

        assert!(store.exists(&image.id[..12]).await.unwrap());
        assert!(store.exists(&format!("sha256:{}", image.id)).await.unwrap());
        assert!(store.exists("busybox:1.36").await.unwrap());
        assert!(!store.exists("busybox").await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_then_remove_untags_first() {
        let store = MemoryImageBackend::new();
        let image = store.pull("alpine").await.unwrap();
        store.tag("alpine", "mirror/alpine:stable").await.unwrap();

        let err = store.remove(&image.id, false).await.unwrap_err();
        assert!(matches!(err, ImageError::Conflict(_)));

        let report = store.remove("mirror/alpine:stable", false).await.unwrap();
        assert_eq!(report.untagged, vec!["mirror/alpine:stable".to_string()]);
        assert!(report.deleted.is_empty());

        let report = store.remove("alpine", false).await.unwrap();
        assert_eq!(report.deleted, vec![image.id]);
        assert!(!store.exists("alpine").await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_dangling_only() {
        let store = MemoryImageBackend::new();
        store.pull("alpine").await.unwrap();
        let dangling = store
            .import("-", None, Bytes::from_static(b"rootfs"))
            .await
            .unwrap();

        let pruned = store.prune(false).await.unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id, dangling.id);
        assert_eq!(store.list(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_export_load_roundtrip() {
        let source = MemoryImageBackend::new();
        let image = source.pull("redis:7").await.unwrap();
        let archive = source.export("redis:7").await.unwrap();

        let target = MemoryImageBackend::new();
        let loaded = target.load(archive).await.unwrap();
        assert_eq!(loaded, vec!["redis:7".to_string()]);
        assert_eq!(target.inspect("redis:7").await.unwrap(), image);
    }

    #[tokio::test]
    async fn test_search_local_repositories() {
        let store = MemoryImageBackend::new();
        store.pull("alpine").await.unwrap();
        store.pull("library/alpine:edge").await.unwrap();
        store.pull("redis").await.unwrap();

        let hits = store.search("alpine", None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(store.search("alpine", Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_build_and_commit_unsupported() {
        let store = MemoryImageBackend::new();
        assert_eq!(
            store.build(Bytes::new(), Vec::new()).await.unwrap_err(),
            ImageError::Unsupported("build")
        );
        assert_eq!(
            store.commit("abc", None).await.unwrap_err(),
            ImageError::Unsupported("commit")
        );
    }
}
