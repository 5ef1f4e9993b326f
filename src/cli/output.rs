//! CLI output formatting

use crate::{
    core::{JobState, RunStatus},
    execution::PipelineEvent,
    history::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "# ");

/// Create a progress bar over the build matrix
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a job state for display
pub fn format_job_state(state: &JobState) -> String {
    match state {
        JobState::Pending => style("PENDING").dim().to_string(),
        JobState::Running { .. } => style("RUNNING").yellow().to_string(),
        JobState::Succeeded { .. } => style("SUCCEEDED").green().to_string(),
        JobState::Failed { .. } => style("FAILED").red().to_string(),
        JobState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Cancelled => style("CANCELLED").yellow().to_string(),
        RunStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Completed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
        _ => INFO,
    };

    let published = match summary.published_wheels {
        Some(wheels) => format!("{} wheel(s) published", wheels),
        None => "not published".to_string(),
    };

    format!(
        "{} {} - {} - {} - {} ({}/{} jobs, {})",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.pipeline_name).bold(),
        style(&summary.git_ref).cyan(),
        format_status(summary.status),
        summary.succeeded_jobs,
        summary.total_jobs,
        style(published).dim()
    )
}

/// Format a pipeline event for display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::RunStarted {
            run_id,
            pipeline_name,
        } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        PipelineEvent::JobStarted { job } => {
            format!("{} {}", SPINNER, style(job).cyan())
        }
        PipelineEvent::JobSucceeded { job, artifacts } => format!(
            "{} {} ({} wheel(s) stored)",
            CHECK,
            style(job).green(),
            artifacts.len()
        ),
        PipelineEvent::JobFailed { job, error } => {
            format!("{} {}: {}", CROSS, style(job).red(), style(error).dim())
        }
        PipelineEvent::BuildStageCompleted { succeeded, failed } => format!(
            "{} Build stage finished: {} succeeded, {} failed",
            INFO,
            style(succeeded).green(),
            style(failed).red()
        ),
        PipelineEvent::PublishStarted { feed } => {
            format!("{} Publishing to {}", PACKAGE, style(feed).bold())
        }
        PipelineEvent::PublishCompleted { wheels } => format!(
            "{} Published {} wheel(s)",
            CHECK,
            style(wheels).green()
        ),
        PipelineEvent::PublishSkipped { reason } => {
            format!("{} Publish skipped: {}", INFO, style(reason).dim())
        }
        PipelineEvent::PublishFailed { error } => {
            format!("{} Publish failed: {}", CROSS, style(error).red())
        }
        PipelineEvent::RunCompleted { run_id, status } => {
            let status_str = match status {
                RunStatus::Completed => format!("completed {}", style("successfully").green()),
                RunStatus::Failed => style("failed").red().to_string(),
                RunStatus::Cancelled => style("cancelled").yellow().to_string(),
                RunStatus::Skipped => style("skipped").dim().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
