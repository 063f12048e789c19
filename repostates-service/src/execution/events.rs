// Execution Events
// Progress reporting and event types for a run across repositories

use crate::repo::{RepoStatus, RunOutcome};

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted while a pipeline runs.
///
/// Events of one repository arrive in step order; events of different
/// repositories interleave freely.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Run started
    PipelineStarted {
        pipeline_name: String,
        total_repositories: usize,
        total_steps: usize,
    },

    /// A repository acquired a worker slot
    RepositoryStarted { repo_index: usize, repo_name: String },

    /// Step process is about to be spawned
    StepStarted {
        repo_index: usize,
        repo_name: String,
        step_index: usize,
        step_name: String,
        message: String,
    },

    /// Step was not relevant for the repository's state
    StepSkipped {
        repo_index: usize,
        repo_name: String,
        step_index: usize,
        step_name: String,
    },

    /// Step process finished and its output was folded
    StepCompleted {
        repo_index: usize,
        repo_name: String,
        step_index: usize,
        step_name: String,
        exit_code: Option<i32>,
        duration: Duration,
    },

    /// Repository finished all steps or was cancelled
    RepositoryCompleted {
        repo_index: usize,
        repo_name: String,
        status: RepoStatus,
        outcome: RunOutcome,
        duration: Duration,
    },

    /// Run finished
    PipelineCompleted {
        pipeline_name: String,
        success: bool,
        cancelled: bool,
        duration: Duration,
    },
}

impl ExecutionEvent {
    /// Create a pipeline started event
    pub fn pipeline_started(
        name: impl Into<String>,
        total_repositories: usize,
        total_steps: usize,
    ) -> Self {
        Self::PipelineStarted {
            pipeline_name: name.into(),
            total_repositories,
            total_steps,
        }
    }

    /// Create a pipeline completed event
    pub fn pipeline_completed(
        name: impl Into<String>,
        success: bool,
        cancelled: bool,
        duration: Duration,
    ) -> Self {
        Self::PipelineCompleted {
            pipeline_name: name.into(),
            success,
            cancelled,
            duration,
        }
    }

    pub fn repository_started(repo_index: usize, repo_name: impl Into<String>) -> Self {
        Self::RepositoryStarted {
            repo_index,
            repo_name: repo_name.into(),
        }
    }

    pub fn repository_completed(
        repo_index: usize,
        repo_name: impl Into<String>,
        status: RepoStatus,
        outcome: RunOutcome,
        duration: Duration,
    ) -> Self {
        Self::RepositoryCompleted {
            repo_index,
            repo_name: repo_name.into(),
            status,
            outcome,
            duration,
        }
    }

    /// Create a step started event
    pub fn step_started(
        repo_index: usize,
        repo_name: impl Into<String>,
        step_index: usize,
        step_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StepStarted {
            repo_index,
            repo_name: repo_name.into(),
            step_index,
            step_name: step_name.into(),
            message: message.into(),
        }
    }

    pub fn step_skipped(
        repo_index: usize,
        repo_name: impl Into<String>,
        step_index: usize,
        step_name: impl Into<String>,
    ) -> Self {
        Self::StepSkipped {
            repo_index,
            repo_name: repo_name.into(),
            step_index,
            step_name: step_name.into(),
        }
    }

    /// Create a step completed event
    pub fn step_completed(
        repo_index: usize,
        repo_name: impl Into<String>,
        step_index: usize,
        step_name: impl Into<String>,
        exit_code: Option<i32>,
        duration: Duration,
    ) -> Self {
        Self::StepCompleted {
            repo_index,
            repo_name: repo_name.into(),
            step_index,
            step_name: step_name.into(),
            exit_code,
            duration,
        }
    }

    /// Repository the event belongs to, if any
    pub fn repo_index(&self) -> Option<usize> {
        match self {
            Self::RepositoryStarted { repo_index, .. }
            | Self::StepStarted { repo_index, .. }
            | Self::StepSkipped { repo_index, .. }
            | Self::StepCompleted { repo_index, .. }
            | Self::RepositoryCompleted { repo_index, .. } => Some(*repo_index),
            Self::PipelineStarted { .. } | Self::PipelineCompleted { .. } => None,
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ExecutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ExecutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ExecutionEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = progress_channel();

        tx.send_event(ExecutionEvent::pipeline_started("status", 2, 7));
        tx.send_event(ExecutionEvent::repository_started(0, "alpha"));

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, ExecutionEvent::PipelineStarted { .. }));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(event2, ExecutionEvent::RepositoryStarted { .. }));
    }

    #[test]
    fn test_event_construction() {
        let event = ExecutionEvent::step_completed(
            3,
            "alpha",
            1,
            "fetch-prune",
            Some(0),
            Duration::from_millis(250),
        );

        assert_eq!(event.repo_index(), Some(3));
        if let ExecutionEvent::StepCompleted {
            repo_name,
            step_index,
            step_name,
            exit_code,
            duration,
            ..
        } = event
        {
            assert_eq!(repo_name, "alpha");
            assert_eq!(step_index, 1);
            assert_eq!(step_name, "fetch-prune");
            assert_eq!(exit_code, Some(0));
            assert_eq!(duration, Duration::from_millis(250));
        } else {
            panic!("wrong event type");
        }
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = progress_channel();
        drop(rx);
        // Should not panic
        tx.send_event(ExecutionEvent::step_skipped(0, "alpha", 2, "pull"));
    }

    #[test]
    fn test_optional_sender() {
        let sender: Option<ProgressSender> = None;
        // Should not panic
        sender.send_event(ExecutionEvent::pipeline_started("status", 0, 0));
    }
}
