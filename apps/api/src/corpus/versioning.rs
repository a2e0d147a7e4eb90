//! Versioned artifact sets: the annotated corpus plus the two models fitted
//! from it, always persisted and loaded together.
//!
//! `FsArtifactStore` layout inside the artifact directory:
//! - `v{version}.json`: immutable archive of every committed set
//! - `current.json`: the live set, replaced by an atomic rename

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use crate::corpus::builder::{build_artifacts, BuildOptions};
use crate::errors::AppError;
use crate::matching::cluster_model::ClusterModel;
use crate::matching::feature_model::FeatureModel;
use crate::matching::index::MatchIndex;
use crate::models::posting::{Posting, RawPosting};

const CURRENT_FILE: &str = "current.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Provenance tag shared by both models of this set.
    pub fingerprint: Uuid,
    pub built_at: DateTime<Utc>,
    pub posting_count: usize,
    pub cluster_count: usize,
    pub vocabulary_size: usize,
    /// Sum of squared distances to assigned centroids for the kept run.
    pub inertia: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub manifest: ArtifactManifest,
    pub corpus: Vec<Posting>,
    pub feature_model: FeatureModel,
    pub cluster_model: ClusterModel,
}

/// Persistence backend for artifact sets.
///
/// `commit` must be all-or-nothing: a concurrent `load_current` observes
/// either the previous set or the new one.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn load_current(&self) -> Result<Option<ArtifactSet>>;

    async fn commit(&self, set: &ArtifactSet) -> Result<()>;

    /// Manifests of every committed version, oldest first.
    async fn history(&self) -> Result<Vec<ArtifactManifest>>;

    async fn current_version(&self) -> Result<Option<u32>> {
        Ok(self.load_current().await?.map(|set| set.manifest.version))
    }
}

pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    fn archive_path(&self, version: u32) -> PathBuf {
        self.dir.join(format!("v{version}.json"))
    }
}

/// Writes `bytes` to a temp file in `dir`, syncs it, then renames it over `target`.
fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    Ok(())
}

#[derive(Deserialize)]
struct ManifestOnly {
    manifest: ArtifactManifest,
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn load_current(&self) -> Result<Option<ArtifactSet>> {
        let path = self.current_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let set: ArtifactSet = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt artifact set at {}", path.display()))?;
        Ok(Some(set))
    }

    async fn commit(&self, set: &ArtifactSet) -> Result<()> {
        let version = set.manifest.version;
        if let Some(current) = self.current_version().await? {
            ensure!(
                version > current,
                "Refusing to commit version {version} over current version {current}"
            );
        }

        let bytes = serde_json::to_vec(set).context("Failed to serialize artifact set")?;
        let dir = self.dir.clone();
        let archive = self.archive_path(version);
        let current = self.current_path();

        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            write_atomic(&dir, &archive, &bytes)?;
            write_atomic(&dir, &current, &bytes)
        })
        .await
        .context("Artifact write task panicked")??;

        info!(
            "Committed artifact set v{version} to {}",
            self.dir.display()
        );
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ArtifactManifest>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut manifests = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_archive = name
                .strip_prefix('v')
                .and_then(|rest| rest.strip_suffix(".json"))
                .map_or(false, |n| n.parse::<u32>().is_ok());
            if !is_archive {
                continue;
            }
            let bytes = tokio::fs::read(entry.path()).await?;
            let parsed: ManifestOnly = serde_json::from_slice(&bytes)
                .with_context(|| format!("Corrupt archive {name}"))?;
            manifests.push(parsed.manifest);
        }
        manifests.sort_by_key(|m| m.version);
        Ok(manifests)
    }
}

/// In-memory store used by handler and snapshot tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryArtifactStore {
    sets: tokio::sync::Mutex<Vec<ArtifactSet>>,
}

#[cfg(test)]
#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn load_current(&self) -> Result<Option<ArtifactSet>> {
        Ok(self.sets.lock().await.last().cloned())
    }

    async fn commit(&self, set: &ArtifactSet) -> Result<()> {
        self.sets.lock().await.push(set.clone());
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ArtifactManifest>> {
        Ok(self
            .sets
            .lock()
            .await
            .iter()
            .map(|s| s.manifest.clone())
            .collect())
    }
}

/// Builds a new artifact set, commits it, and returns the loaded index.
///
/// Nothing is written unless the build succeeds; the caller swaps the
/// returned index in only after the commit has landed.
pub async fn commit_rebuild(
    store: &dyn ArtifactStore,
    raw_postings: Vec<RawPosting>,
    options: BuildOptions,
) -> Result<Arc<MatchIndex>, AppError> {
    let version = store.current_version().await?.map_or(1, |v| v + 1);

    let set = tokio::task::spawn_blocking(move || build_artifacts(raw_postings, &options, version))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Build task failed: {e}")))??;

    store.commit(&set).await?;
    let index = MatchIndex::from_artifacts(set)?;
    Ok(Arc::new(index))
}
