//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{
        config::PipelineConfig,
        run::PipelineRun,
        state::{JobState, PublishState, RunStatus},
    },
    execution::{
        builder::{BuildOutcome, BuildSettings, VariantBuilder},
        publisher::Publisher,
    },
    runner::CommandRunner,
    store::ArtifactStore,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        pipeline_name: String,
    },
    JobStarted {
        job: String,
    },
    JobSucceeded {
        job: String,
        artifacts: Vec<String>,
    },
    JobFailed {
        job: String,
        error: String,
    },
    BuildStageCompleted {
        succeeded: usize,
        failed: usize,
    },
    PublishStarted {
        feed: String,
    },
    PublishCompleted {
        wheels: usize,
    },
    PublishSkipped {
        reason: String,
    },
    PublishFailed {
        error: String,
    },
    RunCompleted {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Strategy for dispatching build-variant jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// One variant at a time, in matrix order
    Sequential,

    /// All variants concurrently (one agent per variant)
    Parallel,

    /// At most N variants concurrently
    LimitedParallel(usize),
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        SchedulingStrategy::Parallel
    }
}

/// Drives a run through the build stage, the publish gate, and the
/// publish stage
pub struct PipelineEngine<R> {
    builder: Arc<VariantBuilder<R>>,
    publisher: Option<Arc<Publisher<R>>>,
    strategy: SchedulingStrategy,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
    cancelled: Arc<AtomicBool>,
}

impl<R: CommandRunner + Send + Sync + 'static> PipelineEngine<R> {
    pub fn new(
        runner: R,
        store: Arc<dyn ArtifactStore>,
        config: &PipelineConfig,
        strategy: SchedulingStrategy,
    ) -> Self {
        let runner = Arc::new(runner);
        let builder = Arc::new(VariantBuilder::new(
            runner.clone(),
            store.clone(),
            BuildSettings::from_config(config),
        ));
        let publisher = config.publish.as_ref().map(|publish| {
            Arc::new(Publisher::new(
                runner.clone(),
                store,
                publish,
                &config.tools,
                config.step_timeout_secs(),
            ))
        });

        Self {
            builder,
            publisher,
            strategy,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Flag aborting the run; shared with e.g. a signal handler
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    async fn emit(&self, event: PipelineEvent) {
        emit_to(&self.event_handlers, event).await;
    }

    /// Execute the entire run
    pub async fn execute(&self, run: &mut PipelineRun) -> Result<()> {
        let run_id = run.state.run_id;
        info!("Starting pipeline run: {} ({})", run.name, run_id);
        self.emit(PipelineEvent::RunStarted {
            run_id,
            pipeline_name: run.name.clone(),
        })
        .await;

        // Trigger filter: a non-matching ref skips the whole run
        if !run.trigger.allows_build(&run.git_ref) {
            let reason = format!("Ref {} does not match trigger rules", run.git_ref);
            info!("{} - skipping run", reason);
            run.skip_all(&reason);
            run.state.finish(RunStatus::Skipped);
            self.emit(PipelineEvent::PublishSkipped {
                reason: reason.clone(),
            })
            .await;
            self.emit(PipelineEvent::RunCompleted {
                run_id,
                status: RunStatus::Skipped,
            })
            .await;
            return Ok(());
        }

        run.state.start(run.jobs.len());

        // Build stage
        let outcomes = match self.strategy {
            SchedulingStrategy::Sequential => self.run_builds(run, 1).await?,
            SchedulingStrategy::Parallel => self.run_builds(run, run.jobs.len().max(1)).await?,
            SchedulingStrategy::LimitedParallel(max) => self.run_builds(run, max.max(1)).await?,
        };
        for outcome in outcomes {
            apply_outcome(run, outcome);
        }
        // Jobs never dispatched (cancellation) stay pending; mark them
        for job in run.jobs.values_mut() {
            if matches!(job.state, JobState::Pending) {
                job.state = JobState::Skipped {
                    reason: "Run cancelled".to_string(),
                };
            }
        }
        run.refresh_counts();
        self.emit(PipelineEvent::BuildStageCompleted {
            succeeded: run.state.succeeded_jobs,
            failed: run.state.failed_jobs,
        })
        .await;

        if self.cancelled.load(Ordering::SeqCst) {
            warn!("Run cancelled during build stage");
            run.publish = PublishState::Skipped {
                reason: "Run cancelled".to_string(),
            };
            self.emit(PipelineEvent::PublishSkipped {
                reason: "Run cancelled".to_string(),
            })
            .await;
            run.state.finish(RunStatus::Cancelled);
            self.emit(PipelineEvent::RunCompleted {
                run_id,
                status: RunStatus::Cancelled,
            })
            .await;
            return Ok(());
        }

        // Publish gate: all builds green AND ref is a release tag
        let status = self.run_publish_stage(run).await;

        run.state.finish(status);
        info!("Pipeline run finished: {} - {:?}", run.name, status);
        self.emit(PipelineEvent::RunCompleted { run_id, status }).await;

        Ok(())
    }

    /// Dispatch build jobs with at most `max` in flight
    async fn run_builds(&self, run: &PipelineRun, max: usize) -> Result<Vec<BuildOutcome>> {
        let mut outcomes = Vec::with_capacity(run.jobs.len());
        let mut set: JoinSet<BuildOutcome> = JoinSet::new();

        for name in run.job_order() {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            let job = match run.job(name) {
                Some(job) => job,
                None => continue,
            };

            if set.len() >= max {
                if let Some(joined) = set.join_next().await {
                    outcomes.push(joined.context("Build task panicked")?);
                }
            }

            let builder = self.builder.clone();
            let handlers = self.event_handlers.clone();
            let cancelled = self.cancelled.clone();
            let variant = job.variant.clone();
            let artifact_name = job.artifact_name.clone();
            let job_name = job.name.clone();

            set.spawn(async move {
                emit_to(
                    &handlers,
                    PipelineEvent::JobStarted {
                        job: job_name.clone(),
                    },
                )
                .await;

                let outcome = builder.build(&variant, &artifact_name, &cancelled).await;

                let event = match &outcome.result {
                    Ok(artifacts) => PipelineEvent::JobSucceeded {
                        job: job_name,
                        artifacts: artifacts.clone(),
                    },
                    Err(failure) => PipelineEvent::JobFailed {
                        job: job_name,
                        error: failure.to_string(),
                    },
                };
                emit_to(&handlers, event).await;

                outcome
            });
        }

        while let Some(joined) = set.join_next().await {
            outcomes.push(joined.context("Build task panicked")?);
        }

        Ok(outcomes)
    }

    /// Evaluate the publish gate and run the stage when it is open.
    /// Returns the final run status.
    async fn run_publish_stage(&self, run: &mut PipelineRun) -> RunStatus {
        if !run.all_builds_succeeded() {
            let reason = "Build stage did not succeed for every variant".to_string();
            run.publish = PublishState::Skipped {
                reason: reason.clone(),
            };
            self.emit(PipelineEvent::PublishSkipped { reason }).await;
            // A failed build fails the run even though publish is skipped
            return RunStatus::Failed;
        }

        if !run.trigger.is_release_tag(&run.git_ref) {
            let reason = format!("Ref {} is not a release tag", run.git_ref);
            run.publish = PublishState::Skipped {
                reason: reason.clone(),
            };
            self.emit(PipelineEvent::PublishSkipped { reason }).await;
            return RunStatus::Completed;
        }

        let publisher = match &self.publisher {
            Some(publisher) => publisher,
            None => {
                let reason = "No publish feed configured".to_string();
                run.publish = PublishState::Skipped {
                    reason: reason.clone(),
                };
                self.emit(PipelineEvent::PublishSkipped { reason }).await;
                return RunStatus::Completed;
            }
        };

        self.emit(PipelineEvent::PublishStarted {
            feed: publisher.feed().to_string(),
        })
        .await;
        run.publish = PublishState::Running {
            started_at: Utc::now(),
        };

        match publisher.publish().await {
            Ok(wheels) => {
                run.publish = PublishState::Published {
                    wheels,
                    completed_at: Utc::now(),
                };
                self.emit(PipelineEvent::PublishCompleted { wheels }).await;
                RunStatus::Completed
            }
            Err(failure) => {
                let error = failure.to_string();
                run.publish = PublishState::Failed {
                    error: error.clone(),
                    failed_at: Utc::now(),
                };
                self.emit(PipelineEvent::PublishFailed { error }).await;
                RunStatus::Failed
            }
        }
    }
}

async fn emit_to(handlers: &Mutex<Vec<EventHandler>>, event: PipelineEvent) {
    let handlers = handlers.lock().await;
    for handler in handlers.iter() {
        handler(event.clone());
    }
}

fn apply_outcome(run: &mut PipelineRun, outcome: BuildOutcome) {
    if let Some(job) = run.job_mut(&outcome.job_name) {
        job.state = match outcome.result {
            Ok(artifacts) => JobState::Succeeded {
                artifacts,
                started_at: outcome.started_at,
                completed_at: outcome.completed_at,
            },
            Err(failure) => JobState::Failed {
                error: failure.to_string(),
                started_at: outcome.started_at,
                failed_at: outcome.completed_at,
            },
        };
    }
}
