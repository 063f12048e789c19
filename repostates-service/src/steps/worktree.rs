// Worktree Steps
// Inspect and change the checked out working tree

use crate::repo::{RepoState, Repository};
use crate::runners::{ProcessResult, ProcessSpec};
use crate::steps::{record_failure, Step};

/// Detect uncommitted changes, untracked files included.
///
/// Sets `is_clean`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncommittedChanges;

impl Step for UncommittedChanges {
    fn name(&self) -> &'static str {
        "uncommitted-changes"
    }

    fn message(&self) -> String {
        "Getting git status...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["status", "--porcelain"])
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        state.is_clean = Some(result.stdout.trim().is_empty());
    }
}

/// Switch to a branch.
///
/// Requires `is_clean`; sets `checked_out`. Dirty trees are left alone.
#[derive(Debug, Clone)]
pub struct Checkout {
    target: String,
}

impl Checkout {
    /// Create a checkout step. Only the first word of `target` before any
    /// `;` is used, so a pasted command line cannot smuggle extra arguments.
    pub fn new(target: &str) -> Self {
        let sanitized = sanitize_target(target);
        if sanitized != target {
            tracing::warn!(
                "Incorrect target branch was given: '{}', using '{}'",
                target,
                sanitized
            );
        }
        Self { target: sanitized }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

fn sanitize_target(target: &str) -> String {
    target
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .to_string()
}

impl Step for Checkout {
    fn name(&self) -> &'static str {
        "checkout"
    }

    fn message(&self) -> String {
        format!("Running git checkout {}...", self.target)
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["checkout", self.target.as_str()])
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.is_clean == Some(true)
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        state.checked_out = Some(self.target.clone());
    }
}
