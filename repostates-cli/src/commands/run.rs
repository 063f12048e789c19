use crate::output;
use crate::report;
use crate::Cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;

use repostates_service::{
    discover, git_available, progress_channel, CancelToken, CommandRunner, ExecutionEvent,
    PipelineOptions, RepoScheduler, SchedulerConfig, Settings,
};

/// Settings after applying command-line overrides to the configuration file
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };

    if let Some(jobs) = cli.jobs {
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        settings.jobs = jobs;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = Some(timeout);
    }
    if let Some(remote) = &cli.remote {
        settings.remote = remote.clone();
    }
    if let Some(fetch) = cli.fetch {
        settings.fetch = fetch;
    }
    Ok(settings)
}

fn resolve_dir(cli: &Cli) -> Result<PathBuf> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    std::fs::canonicalize(&dir).wrap_err_with(|| format!("Cannot open directory {}", dir.display()))
}

/// Run the selected command. Returns false when any repository recorded
/// an error or the run was cancelled.
pub async fn execute(cli: Cli) -> Result<bool> {
    if !git_available() {
        bail!("git executable not found on PATH");
    }

    let settings = resolve_settings(&cli)?;
    let dir = resolve_dir(&cli)?;
    let command = cli.command.clone().unwrap_or_default().pipeline_command();

    let repositories = discover(&dir, cli.reg.as_deref())?;
    if repositories.is_empty() {
        output::warning("No repos found!");
        return Ok(true);
    }

    let pipeline = Arc::new(command.build(&PipelineOptions::from(&settings)));
    tracing::debug!("Pipeline steps: {:?}", pipeline.step_names());

    let mut runner = CommandRunner::new();
    if let Some(timeout) = settings.timeout() {
        runner = runner.with_timeout(timeout);
    }

    let cancel = CancelToken::new();
    let (tx, mut rx) = progress_channel();
    let scheduler = RepoScheduler::new(Arc::new(runner))
        .with_config(SchedulerConfig {
            max_parallel: settings.jobs,
        })
        .with_progress(tx)
        .with_cancellation(cancel.clone());

    // First Ctrl-C stops scheduling new steps
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::warning("Cancelling, waiting for running git processes...");
                cancel.cancel();
            }
        })
    };

    // Spawn execution in background
    let exec_handle = tokio::spawn(async move { scheduler.run(pipeline, repositories).await });

    // Process events in the foreground
    let quiet = cli.json;
    let verbose = cli.verbose > 0;
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        match &event {
            ExecutionEvent::PipelineStarted {
                pipeline_name,
                total_repositories,
                ..
            } => {
                output::header(&format!(
                    "{} ({} repositories)",
                    pipeline_name, total_repositories
                ));
            }

            ExecutionEvent::StepStarted {
                repo_name, message, ..
            } if verbose => {
                output::step(&format!("{}: {}", repo_name, message));
            }

            ExecutionEvent::StepSkipped {
                repo_name,
                step_name,
                ..
            } if verbose => {
                output::dim(&format!("{}: skipped {}", repo_name, step_name));
            }

            ExecutionEvent::RepositoryCompleted {
                repo_name,
                duration,
                ..
            } => {
                output::status("Done", &format!("{} ({:.2}s)", repo_name, secs(duration)));
            }

            ExecutionEvent::PipelineCompleted {
                success,
                cancelled,
                duration,
                ..
            } => {
                if *cancelled {
                    output::warning(&format!("Cancelled after {:.2}s", secs(duration)));
                } else if *success {
                    output::success(&format!("Finished in {:.2}s", secs(duration)));
                } else {
                    output::failure(&format!(
                        "Finished with errors in {:.2}s",
                        secs(duration)
                    ));
                }
            }

            _ => {}
        }
    }

    let reports = exec_handle.await??;
    interrupt.abort();

    if cli.json {
        report::print_json(&reports)?;
    } else {
        report::present(&command, &reports);
    }

    let clean = reports
        .iter()
        .all(|r| !r.state.has_errors() && !r.state.is_cancelled());
    Ok(clean)
}

fn secs(duration: &Duration) -> f64 {
    duration.as_secs_f64()
}
