use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use wheelwright::cli::commands::{HistoryCommand, RunCommand, ValidateCommand};
use wheelwright::cli::output::*;
use wheelwright::cli::{Cli, Command};
use wheelwright::core::config::PipelineConfig;
use wheelwright::core::{PipelineRun, RunStatus, TriggerRef};
use wheelwright::execution::{PipelineEngine, PipelineEvent, SchedulingStrategy};
use wheelwright::runner::ShellRunner;
use wheelwright::store::LocalArtifactStore;

#[cfg(feature = "sqlite")]
use wheelwright::history::{create_summary, HistoryBackend, RunSummary, SqliteRunStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    // Load pipeline config
    let config = PipelineConfig::from_file(&cmd.file)
        .context("Failed to load pipeline config")?;

    println!(
        "{} Loaded pipeline: {} ({} variant(s))",
        INFO,
        style(&config.name).bold(),
        style(config.matrix.len()).cyan()
    );

    let git_ref = TriggerRef::parse(&cmd.git_ref).context("Invalid --git-ref")?;
    println!("{} Triggered by {}", INFO, style(&git_ref).cyan());

    let mut run = PipelineRun::from_config(&config, git_ref)?;

    // Set up the artifact store and engine
    let store = Arc::new(LocalArtifactStore::new(config.artifacts.root.clone()));
    let strategy: SchedulingStrategy = cmd.strategy.into();
    let engine = PipelineEngine::new(ShellRunner::new(), store, &config, strategy);

    // Ctrl-C aborts the run between steps; running subprocesses are
    // killed on drop
    let cancel = engine.cancellation_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    // Console reporting: event lines plus a matrix progress bar
    let progress = create_progress_bar(run.jobs.len());
    let bar = progress.clone();
    engine
        .add_event_handler(move |event| {
            bar.println(format_pipeline_event(&event));
            match event {
                PipelineEvent::JobSucceeded { .. } | PipelineEvent::JobFailed { .. } => {
                    bar.inc(1);
                }
                PipelineEvent::BuildStageCompleted { .. } => bar.finish_and_clear(),
                _ => {}
            }
        })
        .await;

    println!();
    let result = engine.execute(&mut run).await;
    progress.finish_and_clear();

    // Save to history
    #[cfg(feature = "sqlite")]
    {
        if !cmd.no_history {
            let summary = create_summary(&run);
            match save_to_history(&summary).await {
                Ok(()) => println!(
                    "\n{} Run saved to history (ID: {})",
                    INFO,
                    style(&summary.run_id.to_string()[..8]).dim()
                ),
                Err(e) => error!("Failed to save run history: {}", e),
            }
        }
    }

    // Engine-level errors (not job failures) are fatal
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }

    // Print final status; the exit code follows the gating logic
    match run.state.status {
        RunStatus::Completed => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&run.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        RunStatus::Skipped => {
            println!(
                "\n{} {} {} (trigger did not match)",
                INFO,
                style(&run.name).bold(),
                style("skipped").dim()
            );
            Ok(())
        }
        status => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&run.name).bold(),
                format_status(status)
            );
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "sqlite")]
async fn save_to_history(summary: &RunSummary) -> Result<()> {
    let store = SqliteRunStore::with_default_path().await?;
    store.save_run(summary).await
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Package: {}", style(&config.package.name).bold());
            println!("  Variants: {}", style(config.matrix.len()).cyan());
            match &config.publish {
                Some(publish) => println!("  Feed: {}", style(&publish.feed).cyan()),
                None => println!("  Feed: {}", style("none (publish disabled)").dim()),
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = SqliteRunStore::with_default_path().await?;

    // If a specific run ID is requested
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        let summary = store.load_run(run_id).await?;

        match summary {
            Some(summary) => {
                print_run_details(&summary, cmd.verbose)?;
            }
            None => {
                println!("{} Run not found", WARN);
            }
        }
        return Ok(());
    }

    // List runs for one pipeline or all
    let runs = if let Some(pipeline_name) = &cmd.pipeline {
        store.list_runs(pipeline_name).await?
    } else {
        let pipelines = store.list_pipelines().await?;
        let mut all_runs = Vec::new();
        for pipeline in &pipelines {
            all_runs.extend(store.list_runs(pipeline).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs.into_iter().take(cmd.limit).collect()
    };

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in runs.iter().take(cmd.limit) {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &HistoryCommand) -> Result<()> {
    anyhow::bail!("Run history requires the sqlite feature")
}

#[cfg(feature = "sqlite")]
fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Ref: {}", style(&summary.git_ref).cyan());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Jobs: {}/{} succeeded",
        summary.succeeded_jobs, summary.total_jobs
    );
    match summary.published_wheels {
        Some(wheels) => println!("  Published: {} wheel(s)", style(wheels).green()),
        None => println!("  Published: {}", style("no").dim()),
    }

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
