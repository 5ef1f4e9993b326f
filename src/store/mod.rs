//! Shared artifact store for built wheels

pub mod local;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use local::LocalArtifactStore;

/// Error types for artifact store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No files to store under '{0}'")]
    NoFiles(String),
}

/// Trait for the shared artifact store populated by the build stage and
/// drained by the publish stage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the given files under an artifact entry name
    ///
    /// Storing the same files under the same name again overwrites them in
    /// place: artifact addressing is idempotent across re-runs.
    /// Returns the stored file names relative to the store root.
    async fn store(&self, artifact_name: &str, files: &[PathBuf]) -> Result<Vec<String>, StoreError>;

    /// Collect every stored wheel file across all artifact entries
    async fn collect_wheels(&self) -> Result<Vec<PathBuf>, StoreError>;

    /// List the artifact entry names currently in the store
    async fn artifact_names(&self) -> Result<Vec<String>, StoreError>;
}
