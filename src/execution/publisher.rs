//! Publish stage - collect stored wheels and upload them to the feed

use crate::{
    core::config::{PublishConfig, ToolsConfig},
    runner::{tools, CommandRunner},
    store::ArtifactStore,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// The steps of the publish stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Collect,
    Authenticate,
    Upload,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::Collect => "collect artifacts",
            PublishStep::Authenticate => "authenticate",
            PublishStep::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// A failed publish step; there is no partial-success publish
#[derive(Debug, Clone)]
pub struct PublishFailure {
    pub step: PublishStep,
    pub message: String,
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Uploads every stored wheel to the configured feed in one invocation
pub struct Publisher<R> {
    runner: Arc<R>,
    store: Arc<dyn ArtifactStore>,
    feed: String,
    credential_helper: Option<Vec<String>>,
    twine: String,
    timeout_secs: u64,
}

impl<R: CommandRunner> Publisher<R> {
    pub fn new(
        runner: Arc<R>,
        store: Arc<dyn ArtifactStore>,
        publish: &PublishConfig,
        tools: &ToolsConfig,
        timeout_secs: u64,
    ) -> Self {
        Self {
            runner,
            store,
            feed: publish.feed.clone(),
            credential_helper: publish.credential_helper.clone(),
            twine: tools.twine.clone(),
            timeout_secs,
        }
    }

    pub fn feed(&self) -> &str {
        &self.feed
    }

    /// Collect, authenticate, upload. Credential resolution happens before
    /// any upload attempt; an authentication failure therefore means zero
    /// uploads occurred.
    pub async fn publish(&self) -> Result<usize, PublishFailure> {
        let wheels = self
            .store
            .collect_wheels()
            .await
            .map_err(|e| PublishFailure {
                step: PublishStep::Collect,
                message: e.to_string(),
            })?;

        if wheels.is_empty() {
            return Err(PublishFailure {
                step: PublishStep::Collect,
                message: "Artifact store contains no wheels".to_string(),
            });
        }
        info!("Collected {} wheel(s) for publish", wheels.len());

        let pypirc = self.resolve_credentials().await?;

        let inv = tools::upload_wheels(&self.twine, &self.feed, &pypirc, &wheels);
        info!("[{}] {}", PublishStep::Upload, inv.display_line());
        self.runner
            .run(&inv, self.timeout_secs)
            .await
            .map_err(|e| PublishFailure {
                step: PublishStep::Upload,
                message: e.to_string(),
            })?;

        Ok(wheels.len())
    }

    /// Resolve the credentials file path, scoped to this run
    async fn resolve_credentials(&self) -> Result<PathBuf, PublishFailure> {
        if let Some(helper) = &self.credential_helper {
            let inv = tools::resolve_credentials(helper);
            info!("[{}] {}", PublishStep::Authenticate, inv.display_line());
            let output = self
                .runner
                .run(&inv, self.timeout_secs)
                .await
                .map_err(|e| PublishFailure {
                    step: PublishStep::Authenticate,
                    message: e.to_string(),
                })?;

            let path = output.stdout.trim();
            if path.is_empty() {
                return Err(PublishFailure {
                    step: PublishStep::Authenticate,
                    message: "Credential helper printed no credentials path".to_string(),
                });
            }
            return Ok(PathBuf::from(path));
        }

        std::env::var("PYPIRC_PATH")
            .map(PathBuf::from)
            .map_err(|_| PublishFailure {
                step: PublishStep::Authenticate,
                message: "PYPIRC_PATH is not set and no credential helper is configured"
                    .to_string(),
            })
    }
}
