//! Test utility functions for wheelwright

use wheelwright::core::config::PipelineConfig;
use wheelwright::core::{JobState, PipelineRun, PublishState, RunStatus, TriggerRef};
use wheelwright::execution::{PipelineEngine, SchedulingStrategy};
use wheelwright::runner::{CommandRunner, RunnerError, ToolInvocation, ToolOutput};
use wheelwright::store::LocalArtifactStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Runner double that records every invocation and fakes the external
/// tools: the wheel builder drops a file into the requested dist dir, the
/// credential helper prints a credentials path
#[derive(Clone)]
pub struct MockToolRunner {
    invocations: Arc<Mutex<Vec<ToolInvocation>>>,
    fail_matching: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            fail_matching: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail any invocation whose command line contains `marker`
    pub fn fail_when(self, marker: &str, stderr: &str) -> Self {
        self.fail_matching
            .lock()
            .unwrap()
            .push((marker.to_string(), stderr.to_string()));
        self
    }

    /// Command lines of every recorded invocation, in order
    pub fn lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.display_line())
            .collect()
    }

    /// How many recorded invocations contain `marker`
    pub fn count_matching(&self, marker: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(marker)).count()
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockToolRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        _timeout_secs: u64,
    ) -> Result<ToolOutput, RunnerError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let line = invocation.display_line();

        let failures = self.fail_matching.lock().unwrap().clone();
        for (marker, stderr) in failures {
            if line.contains(&marker) {
                return Err(RunnerError::NonZeroExit {
                    program: invocation.program.clone(),
                    code: 1,
                    stderr,
                });
            }
        }

        // Fake the packaging tool: a wheel appears in the dist dir
        if invocation.args.iter().any(|a| a == "bdist_wheel") {
            let dist = invocation
                .args
                .iter()
                .position(|a| a == "--dist-dir")
                .map(|i| PathBuf::from(&invocation.args[i + 1]))
                .expect("bdist_wheel invocation must carry --dist-dir");
            std::fs::create_dir_all(&dist).unwrap();
            std::fs::write(dist.join("pkg-0.1.0-py3-none-any.whl"), b"wheel").unwrap();
        }

        // Fake the credential helper: print a credentials file path
        if invocation.program == "feed-auth" {
            return Ok(ToolOutput {
                stdout: "/tmp/wheelwright-test-pypirc\n".to_string(),
                stderr: String::new(),
            });
        }

        Ok(ToolOutput {
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// A scratch directory unique to one test
pub fn test_scratch(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wheelwright-{}-{}", prefix, Uuid::new_v4()))
}

/// Standard two-variant pipeline config rooted in a scratch directory
pub fn test_config(scratch: &Path, publish: bool) -> PipelineConfig {
    let publish_section = if publish {
        r#"
publish:
  feed: utoolbox-nightly
  credential_helper: ["feed-auth"]
"#
    } else {
        ""
    };

    let yaml = format!(
        r#"
name: "utoolbox wheels"
package:
  name: pkg
matrix:
  - python: "3.6"
  - python: "3.7"
environment:
  packages: [numpy, scipy]
trigger:
  branches: [master]
  release_tags: "v*"
workspace: {}
artifacts:
  root: {}
{}"#,
        scratch.join("work").display(),
        scratch.join("artifacts").display(),
        publish_section
    );

    PipelineConfig::from_yaml(&yaml)
        .unwrap_or_else(|e| panic!("Failed to parse test pipeline YAML: {}", e))
}

/// Test result from running a pipeline
pub struct RunTestResult {
    pub run: PipelineRun,
    pub runner: MockToolRunner,
}

impl RunTestResult {
    pub fn is_success(&self) -> bool {
        matches!(self.run.state.status, RunStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.run.state.status, RunStatus::Failed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.run.state.status, RunStatus::Skipped)
    }

    /// Get the state of a specific job
    pub fn job_state(&self, job: &str) -> &JobState {
        &self
            .run
            .job(job)
            .unwrap_or_else(|| panic!("Job '{}' not found in run", job))
            .state
    }

    /// Stored artifact names of a succeeded job
    pub fn job_artifacts(&self, job: &str) -> Vec<String> {
        match self.job_state(job) {
            JobState::Succeeded { artifacts, .. } => artifacts.clone(),
            state => panic!("Job '{}' is not succeeded: {:?}", job, state),
        }
    }

    /// Wheel paths passed to the upload tool, empty if it never ran
    pub fn uploaded_wheels(&self) -> Vec<String> {
        self.runner
            .invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.program == "twine")
            .flat_map(|i| i.args.iter().cloned())
            .filter(|a| a.ends_with(".whl"))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{:?} - {}/{} jobs succeeded, publish: {:?}",
            self.run.state.status,
            self.run.state.succeeded_jobs,
            self.run.state.total_jobs,
            self.run.publish
        )
    }
}

/// Run a pipeline with the given runner and default (parallel) scheduling
pub async fn run_pipeline(
    config: &PipelineConfig,
    git_ref: &str,
    runner: MockToolRunner,
) -> RunTestResult {
    run_pipeline_with_strategy(config, git_ref, runner, SchedulingStrategy::Parallel).await
}

/// Run a pipeline with an explicit scheduling strategy
pub async fn run_pipeline_with_strategy(
    config: &PipelineConfig,
    git_ref: &str,
    runner: MockToolRunner,
    strategy: SchedulingStrategy,
) -> RunTestResult {
    let git_ref = TriggerRef::parse(git_ref)
        .unwrap_or_else(|e| panic!("Invalid test ref: {}", e));
    let mut run = PipelineRun::from_config(config, git_ref)
        .unwrap_or_else(|e| panic!("Failed to create run: {}", e));

    let store = Arc::new(LocalArtifactStore::new(config.artifacts.root.clone()));
    let engine = PipelineEngine::new(runner.clone(), store, config, strategy);
    engine
        .execute(&mut run)
        .await
        .unwrap_or_else(|e| panic!("Engine error: {}", e));

    RunTestResult { run, runner }
}

/// Assert a job succeeded
pub fn assert_job_succeeded(result: &RunTestResult, job: &str) {
    let state = result.job_state(job);
    assert!(
        state.is_succeeded(),
        "Job '{}' should be succeeded, but was in state: {:?}",
        job,
        state
    );
}

/// Assert a job failed with a specific message
pub fn assert_job_failed(result: &RunTestResult, job: &str, expected_error: &str) {
    match result.job_state(job) {
        JobState::Failed { error, .. } => {
            assert!(
                error.contains(expected_error),
                "Job '{}' error:\n{}\n\ndoes not contain:\n{}",
                job,
                error,
                expected_error
            );
        }
        state => panic!("Job '{}' should have failed, but was in state: {:?}", job, state),
    }
}

/// Assert the publish stage was skipped for a specific reason
pub fn assert_publish_skipped(result: &RunTestResult, expected_reason: &str) {
    match &result.run.publish {
        PublishState::Skipped { reason } => {
            assert!(
                reason.contains(expected_reason),
                "Publish skip reason:\n{}\n\ndoes not contain:\n{}",
                reason,
                expected_reason
            );
        }
        state => panic!("Publish should be skipped, but was: {:?}", state),
    }
}

/// Assert the publish stage uploaded the expected number of wheels
pub fn assert_published(result: &RunTestResult, expected_wheels: usize) {
    match &result.run.publish {
        PublishState::Published { wheels, .. } => {
            assert_eq!(
                *wheels, expected_wheels,
                "Expected {} published wheel(s), got {}",
                expected_wheels, wheels
            );
        }
        state => panic!("Publish should have completed, but was: {:?}", state),
    }
}

/// Assert the publish stage failed with a specific message
pub fn assert_publish_failed(result: &RunTestResult, expected_error: &str) {
    match &result.run.publish {
        PublishState::Failed { error, .. } => {
            assert!(
                error.contains(expected_error),
                "Publish error:\n{}\n\ndoes not contain:\n{}",
                error,
                expected_error
            );
        }
        state => panic!("Publish should have failed, but was: {:?}", state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_pipeline_helper_happy_path() {
        let scratch = test_scratch("helpers");
        let config = test_config(&scratch, false);

        let result = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;

        assert!(result.is_success(), "run should succeed: {}", result.summary());
        assert_job_succeeded(&result, "build_py3.6");
        assert_job_succeeded(&result, "build_py3.7");

        std::fs::remove_dir_all(&scratch).ok();
    }

    #[tokio::test]
    async fn test_mock_runner_records_and_fails() {
        let runner = MockToolRunner::new().fail_when("pip install", "no network");
        let inv = ToolInvocation::new("conda").args(["run", "-n", "env", "pip", "install", "."]);

        let result = runner.run(&inv, 10).await;
        assert!(matches!(result, Err(RunnerError::NonZeroExit { .. })));
        assert_eq!(runner.count_matching("pip install"), 1);
    }
}
