//! Build variants - one matrix entry per runtime version

use serde::{Deserialize, Serialize};

/// A single entry in the build matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildVariant {
    /// Python runtime version, e.g. "3.6"
    pub python: String,
}

impl BuildVariant {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Deterministic job name for this variant, e.g. `build_py3.6`
    pub fn job_name(&self) -> String {
        format!("build_py{}", self.python)
    }

    /// Isolated environment name for this variant's build
    pub fn env_name(&self, package: &str) -> String {
        format!("ww-{}-py{}", package, self.python)
    }

    /// Artifact store entry name, keyed by agent OS and job identity
    ///
    /// Re-running a pipeline for the same ref yields the same name, so
    /// artifact addressing is idempotent across runs.
    pub fn artifact_name(&self, agent_os: &str) -> String {
        format!("artifact-{}_{}", agent_os, self.job_name())
    }
}

/// The operating system identity of the host agent
pub fn host_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}

/// Default wheel platform tag for the host, used when the configuration
/// does not pin one explicitly
pub fn default_platform_tag() -> &'static str {
    if cfg!(target_os = "windows") {
        "win_amd64"
    } else if cfg!(target_os = "macos") {
        "macosx_10_9_x86_64"
    } else {
        "manylinux1_x86_64"
    }
}
