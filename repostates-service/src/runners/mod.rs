// Runners Module
// External process invocation behind a swappable trait

pub mod process;

// Re-export key types
pub use process::{git_available, CommandRunner, ProcessFailure, ProcessResult, ProcessSpec};

/// Trait for process runners.
///
/// The scheduler only ever talks to this trait, so tests can substitute a
/// runner that never touches the real filesystem.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the process to completion and return what it produced.
    ///
    /// Failing to start is reported through `ProcessResult::failure`,
    /// never by panicking.
    async fn run(&self, spec: &ProcessSpec) -> ProcessResult;
}
