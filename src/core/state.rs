//! Run and job state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is currently executing
    Running,
    /// All required stages finished successfully
    Completed,
    /// A build job or the publish stage failed
    Failed,
    /// Run was cancelled externally
    Cancelled,
    /// Trigger rules did not match; nothing executed
    Skipped,
}

/// State of a single build-variant job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobState {
    /// Job has not been dispatched yet
    Pending,
    /// Job is currently running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Job finished and stored its artifacts
    Succeeded {
        /// Paths of stored wheel files, relative to the artifact store
        artifacts: Vec<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Job failed; siblings keep running (matrix isolation)
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Job never ran (trigger mismatch or cancellation)
    Skipped {
        reason: String,
    },
}

impl JobState {
    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded { .. } | JobState::Failed { .. } | JobState::Skipped { .. }
        )
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, JobState::Succeeded { .. })
    }
}

/// State of the publish stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PublishState {
    /// Waiting on the build stage
    Pending,
    /// Gate evaluated false; stage skipped, not failed
    Skipped { reason: String },
    /// Upload in progress
    Running { started_at: DateTime<Utc> },
    /// All collected wheels uploaded in one invocation
    Published {
        wheels: usize,
        completed_at: DateTime<Utc>,
    },
    /// Collection, authentication, or upload failed
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl PublishState {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishState::Published { .. })
    }
}

/// Aggregate state of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of build jobs
    pub total_jobs: usize,

    /// Number of succeeded build jobs
    pub succeeded_jobs: usize,

    /// Number of failed build jobs
    pub failed_jobs: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            total_jobs: 0,
            succeeded_jobs: 0,
            failed_jobs: 0,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self, total_jobs: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_jobs = total_jobs;
    }

    /// Mark the run finished with the given status
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// Update job counts from the current job states
    pub fn update_counts(&mut self, total: usize, succeeded: usize, failed: usize) {
        self.total_jobs = total;
        self.succeeded_jobs = succeeded;
        self.failed_jobs = failed;
    }

    /// Build-stage progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_jobs == 0 {
            return 0.0;
        }
        (self.succeeded_jobs + self.failed_jobs) as f64 / self.total_jobs as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
