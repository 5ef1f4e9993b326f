//! Pipeline run domain model

use crate::core::{
    config::PipelineConfig,
    state::{JobState, PublishState, RunState},
    trigger::{TriggerRef, TriggerRules},
    variant::{self, BuildVariant},
};
use anyhow::Result;
use std::collections::HashMap;

/// A build-variant job within a run
#[derive(Debug, Clone)]
pub struct BuildJob {
    /// Job name derived from the variant (e.g. `build_py3.6`)
    pub name: String,

    /// The matrix entry this job builds
    pub variant: BuildVariant,

    /// Artifact store entry this job publishes into
    pub artifact_name: String,

    /// Runtime state
    pub state: JobState,
}

/// A single run of the two-stage pipeline
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Pipeline name
    pub name: String,

    /// The source-control ref that triggered this run
    pub git_ref: TriggerRef,

    /// Compiled gating rules
    pub trigger: TriggerRules,

    /// Build jobs keyed by job name
    pub jobs: HashMap<String, BuildJob>,

    /// Publish stage state
    pub publish: PublishState,

    /// Aggregate run state
    pub state: RunState,

    /// Job names in matrix order, for deterministic dispatch and display
    job_order: Vec<String>,
}

impl PipelineRun {
    /// Create a run from configuration and a triggering ref
    pub fn from_config(config: &PipelineConfig, git_ref: TriggerRef) -> Result<Self> {
        let trigger = config.trigger.to_rules()?;
        let agent_os = variant::host_os();

        let mut jobs = HashMap::new();
        let mut job_order = Vec::new();
        for v in &config.matrix {
            let job = BuildJob {
                name: v.job_name(),
                variant: v.clone(),
                artifact_name: v.artifact_name(agent_os),
                state: JobState::Pending,
            };
            job_order.push(job.name.clone());
            jobs.insert(job.name.clone(), job);
        }

        Ok(PipelineRun {
            name: config.name.clone(),
            git_ref,
            trigger,
            jobs,
            publish: PublishState::Pending,
            state: RunState::new(),
            job_order,
        })
    }

    /// Get a job by name
    pub fn job(&self, name: &str) -> Option<&BuildJob> {
        self.jobs.get(name)
    }

    /// Get a mutable job by name
    pub fn job_mut(&mut self, name: &str) -> Option<&mut BuildJob> {
        self.jobs.get_mut(name)
    }

    /// Job names in matrix order
    pub fn job_order(&self) -> &[String] {
        &self.job_order
    }

    /// The publish gate: every variant build succeeded
    pub fn all_builds_succeeded(&self) -> bool {
        !self.jobs.is_empty() && self.jobs.values().all(|j| j.state.is_succeeded())
    }

    /// Whether any build job failed
    pub fn any_build_failed(&self) -> bool {
        self.jobs
            .values()
            .any(|j| matches!(j.state, JobState::Failed { .. }))
    }

    /// Whether the build stage is finished (all jobs terminal)
    pub fn build_stage_complete(&self) -> bool {
        self.jobs.values().all(|j| j.state.is_terminal())
    }

    /// Stored artifact file names across all succeeded jobs
    pub fn stored_artifacts(&self) -> Vec<String> {
        let mut all = Vec::new();
        for name in &self.job_order {
            if let Some(job) = self.jobs.get(name) {
                if let JobState::Succeeded { artifacts, .. } = &job.state {
                    all.extend(artifacts.iter().cloned());
                }
            }
        }
        all
    }

    /// Mark every job and the publish stage as skipped with one reason
    pub fn skip_all(&mut self, reason: &str) {
        for job in self.jobs.values_mut() {
            job.state = JobState::Skipped {
                reason: reason.to_string(),
            };
        }
        self.publish = PublishState::Skipped {
            reason: reason.to_string(),
        };
    }

    /// Refresh aggregate counts from the job states
    pub fn refresh_counts(&mut self) {
        let total = self.jobs.len();
        let succeeded = self.jobs.values().filter(|j| j.state.is_succeeded()).count();
        let failed = self
            .jobs
            .values()
            .filter(|j| matches!(j.state, JobState::Failed { .. }))
            .count();
        self.state.update_counts(total, succeeded, failed);
    }
}
