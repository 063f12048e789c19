// Remote Steps
// List remotes, fetch, pull, and find local branches whose upstream is gone

use crate::repo::{RepoState, Repository};
use crate::runners::{ProcessResult, ProcessSpec};
use crate::steps::{record_failure, Step};

/// List configured remotes.
///
/// Sets `remotes`. Later steps use it to tell "no remote" apart from
/// "fetch failed", instead of guessing from error text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRemotes;

impl Step for ListRemotes {
    fn name(&self) -> &'static str {
        "list-remotes"
    }

    fn message(&self) -> String {
        "Listing remotes...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["remote"])
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        state.remotes = Some(
            result
                .stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        );
    }
}

/// Fetch every branch of a remote and prune deleted ones.
///
/// Requires `remotes`; sets `fetched`.
#[derive(Debug, Clone)]
pub struct FetchPrune {
    remote: String,
}

impl FetchPrune {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl Step for FetchPrune {
    fn name(&self) -> &'static str {
        "fetch-prune"
    }

    fn message(&self) -> String {
        format!("Fetching {} with prune...", self.remote)
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["fetch", self.remote.as_str(), "--prune"])
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.has_remote(&self.remote)
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        state.fetched = Some(result.success());
        if !result.success() {
            record_failure(state, self.name(), result);
        }
    }
}

/// Fetch only the branch that is currently checked out.
///
/// Requires `remotes` and `head`; sets `fetched`. A branch that does not
/// exist on the remote is a warning, not an error.
#[derive(Debug, Clone)]
pub struct FetchCurrent {
    remote: String,
}

impl FetchCurrent {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl Step for FetchCurrent {
    fn name(&self) -> &'static str {
        "fetch-current"
    }

    fn message(&self) -> String {
        "Fetching current branches...".to_string()
    }

    fn build(&self, repo: &Repository, state: &RepoState) -> ProcessSpec {
        let branch = state.branch().unwrap_or("HEAD");
        ProcessSpec::git(&repo.path, ["fetch", self.remote.as_str(), branch])
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.on_branch() && state.has_remote(&self.remote)
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        state.fetched = Some(result.success());
        if result.success() {
            return;
        }
        if result.failure.is_none() && result.stderr.contains("couldn't find remote ref") {
            let branch = state.branch().unwrap_or("HEAD").to_string();
            state.record_warning(
                self.name(),
                format!("branch '{}' does not exist on {}", branch, self.remote),
            );
        } else {
            record_failure(state, self.name(), result);
        }
    }
}

/// Pull the current branch from its upstream.
///
/// Requires `is_clean` and `upstream`; sets `pulled`. Dirty trees are
/// skipped so local work is never mixed into a merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pull;

impl Step for Pull {
    fn name(&self) -> &'static str {
        "pull"
    }

    fn message(&self) -> String {
        "Running git pull...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["pull"])
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.is_clean == Some(true) && state.upstream.is_some()
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        state.pulled = Some(result.success());
        if !result.success() {
            record_failure(state, self.name(), result);
        }
    }
}

/// Find local branches whose remote-tracking branch no longer exists.
///
/// Requires `remotes`; sets `gone_branches`. The checked out branch is
/// never listed since it cannot be deleted in place. The branch name leads
/// each line because `%(HEAD)` is a bare space for other branches.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoneBranches;

impl Step for GoneBranches {
    fn name(&self) -> &'static str {
        "gone-branches"
    }

    fn message(&self) -> String {
        "Looking for gone branches...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(
            &repo.path,
            [
                "for-each-ref",
                "--format=%(refname:short)%09%(HEAD)%09%(upstream:track,nobracket)",
                "refs/heads",
            ],
        )
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.has_any_remote()
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        state.gone_branches = Some(parse_gone_branches(&result.stdout));
    }
}

fn parse_gone_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let branch = fields.next()?.trim();
            let head = fields.next().unwrap_or("");
            let track = fields.next().unwrap_or("");
            (!branch.is_empty() && head.trim() != "*" && track.trim() == "gone")
                .then(|| branch.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::NoteSeverity;
    use crate::runners::ProcessFailure;
    use crate::steps::testing::{args, failed, ok, on_branch, repo, with_origin};

    #[test]
    fn test_list_remotes() {
        let mut state = RepoState::new();
        ListRemotes.fold(&mut state, &ok("origin\nupstream"));
        assert_eq!(
            state.remotes,
            Some(vec!["origin".to_string(), "upstream".to_string()])
        );
    }

    #[test]
    fn test_list_remotes_none_configured() {
        let mut state = RepoState::new();
        ListRemotes.fold(&mut state, &ok(""));
        assert_eq!(state.remotes, Some(vec![]));
        assert!(!state.has_any_remote());
    }

    #[test]
    fn test_fetch_prune_skipped_without_remote() {
        let step = FetchPrune::new("origin");
        let mut state = RepoState::new();
        state.remotes = Some(vec![]);
        assert!(!step.is_relevant(&state));
        assert!(step.is_relevant(&with_origin(RepoState::new())));
    }

    #[test]
    fn test_fetch_prune_build() {
        let step = FetchPrune::new("origin");
        let spec = step.build(&repo(), &RepoState::new());
        assert_eq!(spec.program, "git");
        assert_eq!(args(&spec), vec!["fetch", "origin", "--prune"]);
        assert_eq!(spec.working_dir, repo().path);
    }

    #[test]
    fn test_fetch_prune_failure_recorded() {
        let step = FetchPrune::new("origin");
        let mut state = with_origin(RepoState::new());
        step.fold(&mut state, &failed(128, "fatal: Could not read from remote repository."));
        assert_eq!(state.fetched, Some(false));
        assert!(state.has_errors());
    }

    #[test]
    fn test_fetch_prune_spawn_failure_recorded() {
        let step = FetchPrune::new("origin");
        let mut state = with_origin(RepoState::new());
        step.fold(&mut state, &ProcessResult::spawn_failure("no git"));
        assert_eq!(state.fetched, Some(false));
        assert_eq!(state.notes[0].message, "no git");
    }

    #[test]
    fn test_fetch_current_missing_branch_warns() {
        let step = FetchCurrent::new("origin");
        let mut state = with_origin(on_branch("local-only"));
        assert_eq!(
            args(&step.build(&repo(), &state)),
            vec!["fetch", "origin", "local-only"]
        );

        step.fold(
            &mut state,
            &failed(128, "fatal: couldn't find remote ref local-only"),
        );
        assert_eq!(state.fetched, Some(false));
        assert_eq!(state.notes[0].severity, NoteSeverity::Warning);
    }

    #[test]
    fn test_fetch_current_requires_branch() {
        let step = FetchCurrent::new("origin");
        assert!(!step.is_relevant(&with_origin(RepoState::new())));
        assert!(step.is_relevant(&with_origin(on_branch("main"))));
    }

    #[test]
    fn test_pull_only_when_clean_and_tracking() {
        let mut state = on_branch("main");
        state.upstream = Some("origin/main".to_string());
        state.is_clean = Some(false);
        assert!(!Pull.is_relevant(&state));

        state.is_clean = Some(true);
        assert!(Pull.is_relevant(&state));

        state.upstream = None;
        assert!(!Pull.is_relevant(&state));
    }

    #[test]
    fn test_pull_timeout_recorded() {
        let mut state = on_branch("main");
        let result = ProcessResult {
            failure: Some(ProcessFailure::TimedOut(std::time::Duration::from_secs(5))),
            ..Default::default()
        };
        Pull.fold(&mut state, &result);
        assert_eq!(state.pulled, Some(false));
        assert_eq!(state.notes[0].message, "timed out after 5s");
    }

    #[test]
    fn test_gone_branches_parse() {
        let output = "main\t*\t\nfeature/done\t \tgone\nfeature/wip\t \tahead 2\nlocal\t \t";
        let mut state = with_origin(on_branch("main"));
        GoneBranches.fold(&mut state, &ok(output));
        assert_eq!(state.gone_branches, Some(vec!["feature/done".to_string()]));
    }

    #[test]
    fn test_gone_branches_excludes_current() {
        let output = "old-main\t*\tgone\nstale\t \tgone";
        assert_eq!(parse_gone_branches(output), vec!["stale".to_string()]);
    }

    #[test]
    fn test_gone_branches_first_line_not_current() {
        // Runner output arrives trimmed
        let raw = " aaa-old\t \tgone\nmain\t*\t\nzzz-old\t \tgone\n";
        let mut state = with_origin(on_branch("main"));
        GoneBranches.fold(&mut state, &ok(raw.trim()));
        assert_eq!(
            state.gone_branches,
            Some(vec!["aaa-old".to_string(), "zzz-old".to_string()])
        );
    }

    #[test]
    fn test_gone_branches_format_leads_with_name() {
        let spec = GoneBranches.build(&repo(), &RepoState::new());
        let format = args(&spec)
            .into_iter()
            .find(|a| a.starts_with("--format="))
            .unwrap();
        assert!(format.starts_with("--format=%(refname:short)"));
    }

    #[test]
    fn test_gone_branches_needs_remote() {
        let mut state = RepoState::new();
        state.remotes = Some(vec![]);
        assert!(!GoneBranches.is_relevant(&state));
        assert!(GoneBranches.is_relevant(&with_origin(state)));
    }
}
