// Divergence Steps
// Count commits between the current branch and its upstream or the default branch

use crate::repo::{RepoState, Repository};
use crate::runners::{ProcessResult, ProcessSpec};
use crate::steps::{parse_left_right, record_failure, Step};

/// Compare the current branch with its upstream.
///
/// Requires `head` and `upstream`; sets `divergence`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AheadBehind;

impl Step for AheadBehind {
    fn name(&self) -> &'static str {
        "ahead-behind"
    }

    fn message(&self) -> String {
        "Getting commits state...".to_string()
    }

    fn build(&self, repo: &Repository, state: &RepoState) -> ProcessSpec {
        let branch = state.branch().unwrap_or("HEAD");
        let upstream = state.upstream.as_deref().unwrap_or("@{upstream}");
        ProcessSpec::git(
            &repo.path,
            [
                "rev-list".to_string(),
                "--left-right".to_string(),
                "--count".to_string(),
                format!("{}...{}", branch, upstream),
            ],
        )
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.on_branch() && state.upstream.is_some()
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        match parse_left_right(&result.stdout) {
            Some(divergence) => state.divergence = Some(divergence),
            None => state.record_error(
                self.name(),
                format!("unexpected rev-list output: '{}'", result.stdout),
            ),
        }
    }
}

/// Compare HEAD with the remote default branch to see whether a merge is due.
///
/// Requires `remotes`, `head` and `default_branch`; sets `merge`. Skipped
/// when the default branch itself is checked out.
#[derive(Debug, Clone)]
pub struct MergeNeed {
    remote: String,
}

impl MergeNeed {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl Step for MergeNeed {
    fn name(&self) -> &'static str {
        "merge-need"
    }

    fn message(&self) -> String {
        "Comparing with default branch...".to_string()
    }

    fn build(&self, repo: &Repository, state: &RepoState) -> ProcessSpec {
        let default = state.default_branch.as_deref().unwrap_or("HEAD");
        ProcessSpec::git(
            &repo.path,
            [
                "rev-list".to_string(),
                "--left-right".to_string(),
                "--count".to_string(),
                format!("HEAD...{}/{}", self.remote, default),
            ],
        )
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        match (state.branch(), state.default_branch.as_deref()) {
            (Some(branch), Some(default)) => branch != default && state.has_remote(&self.remote),
            _ => false,
        }
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        match parse_left_right(&result.stdout) {
            Some(divergence) => state.merge = Some(divergence),
            None => state.record_error(
                self.name(),
                format!("unexpected rev-list output: '{}'", result.stdout),
            ),
        }
    }
}
