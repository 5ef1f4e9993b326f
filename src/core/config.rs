//! Pipeline configuration from YAML

use crate::core::trigger::{RefPattern, TriggerRules};
use crate::core::variant::{self, BuildVariant};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// The package under build
    pub package: PackageConfig,

    /// Build matrix: one job per runtime-version variant
    pub matrix: Vec<BuildVariant>,

    /// Dependency packages installed into each variant's environment
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Branch/tag gating rules
    pub trigger: TriggerConfig,

    /// Explicit wheel platform tag; derived from the host OS when absent
    #[serde(default)]
    pub platform_tag: Option<String>,

    /// Optional verification command run inside each environment before
    /// packaging (e.g. a test runner invocation)
    #[serde(default)]
    pub verify: Option<Vec<String>>,

    /// Publish-stage settings; publishing is disabled when absent
    #[serde(default)]
    pub publish: Option<PublishConfig>,

    /// Artifact store location
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Scratch directory for per-variant build workspaces
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Paths of the external tools driven by the pipeline
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Timeout for each subprocess step (in seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// The target package: name plus source tree containing its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Distribution name, e.g. "utoolbox"
    pub name: String,

    /// Source tree root (defaults to the current directory)
    #[serde(default = "default_source")]
    pub source: PathBuf,
}

/// Environment-manager settings for the isolated build environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Named packages created alongside the runtime (e.g. numpy, scipy)
    #[serde(default)]
    pub packages: Vec<String>,
}

/// Trigger section: which refs build, which tags publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Branch-name inclusion list (wildcards allowed)
    #[serde(default)]
    pub branches: Vec<String>,

    /// Release-tag pattern gating the publish stage, e.g. "v*"
    #[serde(default)]
    pub release_tags: Option<String>,
}

impl TriggerConfig {
    /// Compile the configured patterns into gating rules
    pub fn to_rules(&self) -> Result<TriggerRules> {
        let branches = self
            .branches
            .iter()
            .map(|p| RefPattern::new(p))
            .collect::<Result<Vec<_>>>()?;

        let release_tags = self
            .release_tags
            .as_deref()
            .map(RefPattern::new)
            .transpose()?;

        Ok(TriggerRules::new(branches, release_tags))
    }
}

/// Publish-stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Target feed name passed to the upload tool
    pub feed: String,

    /// Command invoked to resolve feed credentials; it must print the
    /// path of a credentials file on stdout. When absent, the path is
    /// taken from the PYPIRC_PATH environment variable.
    #[serde(default)]
    pub credential_helper: Option<Vec<String>>,
}

/// Artifact store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Root directory of the artifact store
    #[serde(default = "default_artifact_root")]
    pub root: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: default_artifact_root(),
        }
    }
}

/// Paths of the external tools (treated as black boxes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Environment-manager executable
    #[serde(default = "default_conda")]
    pub conda: String,

    /// Upload-client executable
    #[serde(default = "default_twine")]
    pub twine: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            conda: default_conda(),
            twine: default_twine(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".wheelwright/work")
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(".wheelwright/artifacts")
}

fn default_conda() -> String {
    std::env::var("WHEELWRIGHT_CONDA").unwrap_or_else(|_| "conda".to_string())
}

fn default_twine() -> String {
    "twine".to_string()
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.package.name.trim().is_empty() {
            anyhow::bail!("Package name must not be empty");
        }

        if self.matrix.is_empty() {
            anyhow::bail!("Build matrix must declare at least one variant");
        }

        // Variant job names double as artifact keys, so duplicates would
        // silently overwrite each other's wheels
        let mut seen = HashSet::new();
        for v in &self.matrix {
            if v.python.trim().is_empty() {
                anyhow::bail!("Matrix variant with empty python version");
            }
            if !seen.insert(&v.python) {
                anyhow::bail!("Duplicate matrix variant for python {}", v.python);
            }
        }

        if self.trigger.branches.is_empty() && self.trigger.release_tags.is_none() {
            anyhow::bail!("Trigger must list branches or a release-tag pattern");
        }

        // Compile patterns up front so a malformed pattern fails at load
        // time instead of at gate evaluation
        self.trigger.to_rules()?;

        if let Some(publish) = &self.publish {
            if publish.feed.trim().is_empty() {
                anyhow::bail!("Publish feed name must not be empty");
            }
            if let Some(helper) = &publish.credential_helper {
                if helper.is_empty() {
                    anyhow::bail!("Credential helper command must not be empty");
                }
            }
        }

        if let Some(verify) = &self.verify {
            if verify.is_empty() {
                anyhow::bail!("Verify command must not be empty");
            }
        }

        if let Some(timeout) = self.timeout_secs {
            if timeout == 0 {
                anyhow::bail!("timeout_secs must be greater than zero");
            }
        }

        Ok(())
    }

    /// The effective wheel platform tag for this host
    pub fn platform_tag(&self) -> String {
        self.platform_tag
            .clone()
            .unwrap_or_else(|| variant::default_platform_tag().to_string())
    }

    /// The effective per-step timeout
    pub fn step_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(1800)
    }
}
