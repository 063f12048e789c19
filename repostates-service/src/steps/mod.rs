// Steps Module
// A step builds one external command, decides whether it applies, and folds
// the command's output into the repository state

pub mod divergence;
pub mod reference;
pub mod remote;
pub mod shell;
pub mod worktree;

// Re-export concrete steps
pub use divergence::{AheadBehind, MergeNeed};
pub use reference::{CurrentReference, DefaultBranch, LatestTag, StatusBranch, UpstreamReference};
pub use remote::{FetchCurrent, FetchPrune, GoneBranches, ListRemotes, Pull};
pub use shell::ShellCommand;
pub use worktree::{Checkout, UncommittedChanges};

use crate::repo::{Divergence, RepoState, Repository};
use crate::runners::{ProcessResult, ProcessSpec};

use std::fmt;

/// One unit of work in a pipeline.
///
/// Steps are stateless and shared by every repository task, so all three
/// operations take the repository state as input instead of holding it.
/// A step may only read state fields that earlier steps of its pipeline set.
pub trait Step: Send + Sync + fmt::Debug {
    /// Short identifier used in notes and logs
    fn name(&self) -> &'static str;

    /// Progress label shown when the step starts
    fn message(&self) -> String;

    /// Build the command to run for this repository
    fn build(&self, repo: &Repository, state: &RepoState) -> ProcessSpec;

    /// Whether the step applies. When false the command is never spawned
    /// and `fold` is never called.
    fn is_relevant(&self, _state: &RepoState) -> bool {
        true
    }

    /// Fold the command's result into the state. Must not panic: spawn
    /// failures, non-zero exits and unexpected output become notes.
    fn fold(&self, state: &mut RepoState, result: &ProcessResult);
}

/// Record an unsuccessful invocation as an error note
pub(crate) fn record_failure(state: &mut RepoState, step: &str, result: &ProcessResult) {
    state.record_error(step, result.describe_failure());
}

/// Parse the two-number output of `git rev-list --left-right --count`.
///
/// The left count is commits only in the left revision, so with
/// `local...other` it is "ahead" and the right count is "behind".
pub(crate) fn parse_left_right(output: &str) -> Option<Divergence> {
    let mut counts = output.split_whitespace().map(str::parse::<u32>);
    let ahead = counts.next()?.ok()?;
    let behind = counts.next()?.ok()?;
    if counts.next().is_some() {
        return None;
    }
    Some(Divergence::new(ahead, behind))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_left_right_tab_separated() {
        assert_eq!(parse_left_right("3\t5"), Some(Divergence::new(3, 5)));
    }

    #[test]
    fn test_parse_left_right_space_separated() {
        assert_eq!(parse_left_right("0 12\n"), Some(Divergence::new(0, 12)));
    }

    #[test]
    fn test_parse_left_right_rejects_malformed() {
        assert_eq!(parse_left_right(""), None);
        assert_eq!(parse_left_right("3"), None);
        assert_eq!(parse_left_right("a\tb"), None);
        assert_eq!(parse_left_right("1 2 3"), None);
        assert_eq!(parse_left_right("-1 2"), None);
    }

    #[test]
    fn test_record_failure_uses_description() {
        let mut state = RepoState::new();
        record_failure(
            &mut state,
            "fetch",
            &ProcessResult::exited(128, "", "fatal: unable to access"),
        );
        assert_eq!(state.notes.len(), 1);
        assert_eq!(
            state.notes[0].message,
            "exited with code 128: fatal: unable to access"
        );
        assert!(state.has_errors());
    }
}
