// Repostates Service Library
// Engine for running ordered git step pipelines across many repositories

pub mod config;
pub mod error;
pub mod execution;
pub mod pipeline;
pub mod repo;
pub mod runners;
pub mod steps;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};

// Re-export configuration
pub use config::{FetchScope, Settings};

// Re-export repository model and discovery
pub use repo::{
    discover, CapturedOutput, Divergence, HeadRef, NoteSeverity, RepoReport, RepoState,
    RepoStatus, Repository, RunOutcome, StepNote, TagInfo,
};

// Re-export execution types
pub use execution::{
    progress_channel, CancelToken, EventSender, ExecutionEvent, ProgressReceiver, ProgressSender,
    RepoScheduler, ResultAggregator, SchedulerConfig,
};

// Re-export pipeline types
pub use pipeline::{Pipeline, PipelineCommand, PipelineOptions};

// Re-export runner types
pub use runners::{
    git_available, CommandRunner, ProcessFailure, ProcessResult, ProcessRunner, ProcessSpec,
};

// Re-export the step capability trait
pub use steps::Step;
