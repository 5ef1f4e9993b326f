//! Variant builder - runs one matrix job's step sequence

use crate::{
    core::{config::PipelineConfig, variant::BuildVariant},
    runner::{tools, CommandRunner, ToolInvocation, ToolOutput},
    store::ArtifactStore,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// The steps of a variant build, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    CreateEnvironment,
    InstallPackage,
    Verify,
    BuildWheel,
    StoreArtifact,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStep::CreateEnvironment => "create environment",
            BuildStep::InstallPackage => "install package",
            BuildStep::Verify => "verify",
            BuildStep::BuildWheel => "build wheel",
            BuildStep::StoreArtifact => "store artifact",
        };
        f.write_str(name)
    }
}

/// A failed build step; the failure is terminal for the containing job
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: BuildStep,
    pub message: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Result of one variant build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub job_name: String,
    pub artifact_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Stored artifact names on success, first failed step otherwise
    pub result: Result<Vec<String>, StepFailure>,
}

/// Configuration slice the builder needs, extracted once per run
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub package_name: String,
    pub package_source: PathBuf,
    pub env_packages: Vec<String>,
    pub platform_tag: String,
    pub workspace: PathBuf,
    pub verify: Option<Vec<String>>,
    pub conda: String,
    pub timeout_secs: u64,
}

impl BuildSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            package_name: config.package.name.clone(),
            package_source: config.package.source.clone(),
            env_packages: config.environment.packages.clone(),
            platform_tag: config.platform_tag(),
            workspace: config.workspace.clone(),
            verify: config.verify.clone(),
            conda: config.tools.conda.clone(),
            timeout_secs: config.step_timeout_secs(),
        }
    }
}

/// Executes the build-stage step sequence for a single variant
pub struct VariantBuilder<R> {
    runner: Arc<R>,
    store: Arc<dyn ArtifactStore>,
    settings: BuildSettings,
}

impl<R: CommandRunner> VariantBuilder<R> {
    pub fn new(runner: Arc<R>, store: Arc<dyn ArtifactStore>, settings: BuildSettings) -> Self {
        Self {
            runner,
            store,
            settings,
        }
    }

    /// Build one variant: environment, install, optional verify, wheel,
    /// artifact storage. Never panics on tool failure; the outcome carries
    /// the failed step instead.
    pub async fn build(
        &self,
        variant: &BuildVariant,
        artifact_name: &str,
        cancelled: &AtomicBool,
    ) -> BuildOutcome {
        let started_at = Utc::now();
        let result = self.run_steps(variant, artifact_name, cancelled).await;
        BuildOutcome {
            job_name: variant.job_name(),
            artifact_name: artifact_name.to_string(),
            started_at,
            completed_at: Utc::now(),
            result,
        }
    }

    async fn run_steps(
        &self,
        variant: &BuildVariant,
        artifact_name: &str,
        cancelled: &AtomicBool,
    ) -> Result<Vec<String>, StepFailure> {
        let env_name = variant.env_name(&self.settings.package_name);
        let workdir = self.settings.workspace.join(variant.job_name());
        let dist_dir = workdir.join("dist");

        check_cancelled(cancelled, BuildStep::CreateEnvironment)?;
        let inv = tools::create_environment(
            &self.settings.conda,
            &env_name,
            &variant.python,
            &self.settings.env_packages,
        );
        self.run_step(BuildStep::CreateEnvironment, &inv).await?;

        check_cancelled(cancelled, BuildStep::InstallPackage)?;
        let inv =
            tools::install_package(&self.settings.conda, &env_name, &self.settings.package_source);
        self.run_step(BuildStep::InstallPackage, &inv).await?;

        if let Some(verify) = &self.settings.verify {
            check_cancelled(cancelled, BuildStep::Verify)?;
            let inv = tools::verify_command(
                &self.settings.conda,
                &env_name,
                verify,
                &self.settings.package_source,
            );
            self.run_step(BuildStep::Verify, &inv).await?;
        }

        check_cancelled(cancelled, BuildStep::BuildWheel)?;
        tokio::fs::create_dir_all(&dist_dir)
            .await
            .map_err(|e| StepFailure {
                step: BuildStep::BuildWheel,
                message: format!("Failed to create dist dir: {}", e),
            })?;
        let inv = tools::build_wheel(
            &self.settings.conda,
            &env_name,
            &self.settings.package_source,
            &self.settings.platform_tag,
            &dist_dir,
        );
        self.run_step(BuildStep::BuildWheel, &inv).await?;

        let wheels = find_wheels(&dist_dir).await.map_err(|e| StepFailure {
            step: BuildStep::BuildWheel,
            message: format!("Failed to read dist dir: {}", e),
        })?;
        if wheels.is_empty() {
            return Err(StepFailure {
                step: BuildStep::BuildWheel,
                message: "Packaging produced no wheel files".to_string(),
            });
        }
        debug!("{} produced {} wheel(s)", variant.job_name(), wheels.len());

        check_cancelled(cancelled, BuildStep::StoreArtifact)?;
        let stored = self
            .store
            .store(artifact_name, &wheels)
            .await
            .map_err(|e| StepFailure {
                step: BuildStep::StoreArtifact,
                message: e.to_string(),
            })?;

        Ok(stored)
    }

    async fn run_step(
        &self,
        step: BuildStep,
        invocation: &ToolInvocation,
    ) -> Result<ToolOutput, StepFailure> {
        info!("[{}] {}", step, invocation.display_line());
        self.runner
            .run(invocation, self.settings.timeout_secs)
            .await
            .map_err(|e| StepFailure {
                step,
                message: e.to_string(),
            })
    }
}

fn check_cancelled(cancelled: &AtomicBool, step: BuildStep) -> Result<(), StepFailure> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(StepFailure {
            step,
            message: "Run cancelled".to_string(),
        });
    }
    Ok(())
}

/// Wheel files in the variant's dist directory, sorted for determinism
async fn find_wheels(dist_dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
    let mut wheels = Vec::new();
    let mut entries = tokio::fs::read_dir(dist_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "whl") {
            wheels.push(path);
        }
    }
    wheels.sort();
    Ok(wheels)
}
