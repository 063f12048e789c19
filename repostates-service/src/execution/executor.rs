// Repository Scheduler
// Runs one pipeline over many repositories with a bounded number of concurrent units

use crate::config::DEFAULT_JOBS;
use crate::error::{ServiceError, ServiceResult};
use crate::execution::aggregator::ResultAggregator;
use crate::execution::cancel::CancelToken;
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::pipeline::Pipeline;
use crate::repo::{RepoReport, RepoState, Repository, RunOutcome};
use crate::runners::ProcessRunner;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Configuration for a scheduler run
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum repositories processed at the same time (0 is treated as 1)
    pub max_parallel: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_JOBS,
        }
    }
}

/// Runs a pipeline over a list of repositories.
///
/// Steps of one repository run strictly in order; repositories run
/// concurrently, at most `max_parallel` at a time. Because a unit holds
/// its permit while its process runs, the same bound applies to spawned
/// processes.
pub struct RepoScheduler {
    runner: Arc<dyn ProcessRunner>,
    config: SchedulerConfig,
    event_tx: Option<ProgressSender>,
    cancel: CancelToken,
}

impl RepoScheduler {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            config: SchedulerConfig::default(),
            event_tx: None,
            cancel: CancelToken::new(),
        }
    }

    /// Set scheduler configuration
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Use an externally controlled cancellation token
    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the pipeline over every repository.
    ///
    /// Returns one report per input repository, in input order. Step
    /// failures stay inside each repository's state; only a panicking
    /// repository task fails the whole run.
    pub async fn run(
        &self,
        pipeline: Arc<Pipeline>,
        repositories: Vec<Repository>,
    ) -> ServiceResult<Vec<RepoReport>> {
        let start = Instant::now();
        let total = repositories.len();
        let max_parallel = self.config.max_parallel.max(1);

        tracing::info!(
            "Running '{}' ({} steps) over {} repositories, {} at a time",
            pipeline.name,
            pipeline.len(),
            total,
            max_parallel
        );
        self.event_tx.send_event(ExecutionEvent::pipeline_started(
            &pipeline.name,
            total,
            pipeline.len(),
        ));

        let semaphore = Arc::new(Semaphore::new(max_parallel));
        let mut tasks = JoinSet::new();

        for (index, repository) in repositories.into_iter().enumerate() {
            let unit = RepoUnit {
                index,
                repository,
                pipeline: Arc::clone(&pipeline),
                runner: Arc::clone(&self.runner),
                event_tx: self.event_tx.clone(),
                cancel: self.cancel.clone(),
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                unit.execute().await
            });
        }

        let mut aggregator = ResultAggregator::new(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => aggregator.insert(index, report),
                Err(e) => {
                    tasks.abort_all();
                    tracing::error!("Repository task failed: {}", e);
                    return Err(ServiceError::TaskFailed(e.to_string()));
                }
            }
        }

        let reports = aggregator.finish()?;
        let duration = start.elapsed();
        let success = reports.iter().all(|r| !r.state.has_errors());
        let cancelled = reports.iter().any(|r| r.state.is_cancelled());

        tracing::info!(
            "Finished '{}' in {:?} (success: {}, cancelled: {})",
            pipeline.name,
            duration,
            success,
            cancelled
        );
        self.event_tx.send_event(ExecutionEvent::pipeline_completed(
            &pipeline.name,
            success,
            cancelled,
            duration,
        ));

        Ok(reports)
    }
}

/// Everything one repository task owns
struct RepoUnit {
    index: usize,
    repository: Repository,
    pipeline: Arc<Pipeline>,
    runner: Arc<dyn ProcessRunner>,
    event_tx: Option<ProgressSender>,
    cancel: CancelToken,
}

impl RepoUnit {
    async fn execute(self) -> (usize, RepoReport) {
        let start = Instant::now();
        let name = self.repository.name.clone();
        let mut state = RepoState::new();

        self.event_tx
            .send_event(ExecutionEvent::repository_started(self.index, &name));

        for (step_index, step) in self.pipeline.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::debug!("{}: cancelled before step {}", name, step.name());
                state.outcome = RunOutcome::Cancelled {
                    completed_steps: step_index,
                };
                break;
            }

            if !step.is_relevant(&state) {
                tracing::debug!("{}: skipping {}", name, step.name());
                self.event_tx.send_event(ExecutionEvent::step_skipped(
                    self.index,
                    &name,
                    step_index,
                    step.name(),
                ));
                continue;
            }

            self.event_tx.send_event(ExecutionEvent::step_started(
                self.index,
                &name,
                step_index,
                step.name(),
                step.message(),
            ));

            let spec = step.build(&self.repository, &state);
            tracing::debug!("{}: running {}", name, spec.command_line());

            let step_start = Instant::now();
            let result = self.runner.run(&spec).await;

            if result.success() {
                tracing::debug!("{}: {} output: {}", name, step.name(), result.stdout);
            } else {
                tracing::warn!(
                    "{}: {} {}; stderr: {}",
                    name,
                    step.name(),
                    result.describe_failure(),
                    result.stderr
                );
            }

            step.fold(&mut state, &result);

            self.event_tx.send_event(ExecutionEvent::step_completed(
                self.index,
                &name,
                step_index,
                step.name(),
                result.exit_code,
                step_start.elapsed(),
            ));
        }

        if state.outcome == RunOutcome::Pending {
            state.outcome = RunOutcome::Completed;
        }

        self.event_tx.send_event(ExecutionEvent::repository_completed(
            self.index,
            &name,
            state.status(),
            state.outcome,
            start.elapsed(),
        ));

        (
            self.index,
            RepoReport {
                repository: self.repository,
                state,
            },
        )
    }
}
