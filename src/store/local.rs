//! Local-directory artifact store

use crate::store::{ArtifactStore, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Artifact store backed by a local directory tree
///
/// Layout: `<root>/<artifact_name>/<wheel file>`. Each build-variant job
/// owns exactly one artifact entry, so parallel jobs never contend.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, artifact_name: &str, files: &[PathBuf]) -> Result<Vec<String>, StoreError> {
        if files.is_empty() {
            return Err(StoreError::NoFiles(artifact_name.to_string()));
        }

        let entry_dir = self.root.join(artifact_name);
        fs::create_dir_all(&entry_dir).await?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file
                .file_name()
                .ok_or_else(|| StoreError::NoFiles(artifact_name.to_string()))?;
            let dest = entry_dir.join(file_name);
            fs::copy(file, &dest).await?;
            debug!("Stored {} -> {}", file.display(), dest.display());
            stored.push(format!(
                "{}/{}",
                artifact_name,
                file_name.to_string_lossy()
            ));
        }

        stored.sort();
        Ok(stored)
    }

    async fn collect_wheels(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut wheels = Vec::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // An empty store is a valid (if useless) collection result
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(wheels),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("artifact-") {
                continue;
            }

            let mut files = fs::read_dir(&path).await?;
            while let Some(file) = files.next_entry().await? {
                let file_path = file.path();
                if file_path.extension().is_some_and(|ext| ext == "whl") {
                    wheels.push(file_path);
                }
            }
        }

        wheels.sort();
        Ok(wheels)
    }

    async fn artifact_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.path().is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with("artifact-") {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
