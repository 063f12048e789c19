// Reference Steps
// Resolve what HEAD points at, its upstream, the latest tag and the default branch

use crate::repo::{Divergence, HeadRef, RepoState, Repository, TagInfo};
use crate::runners::{ProcessResult, ProcessSpec};
use crate::steps::{record_failure, Step};

/// Length of abbreviated commit ids shown for a detached HEAD
const SHORT_COMMIT: usize = 7;

/// Report the current branch; an empty answer means a detached HEAD.
///
/// Sets `head`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentReference;

impl Step for CurrentReference {
    fn name(&self) -> &'static str {
        "current-reference"
    }

    fn message(&self) -> String {
        "Getting current branches...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["branch", "--show-current"])
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }
        state.head = Some(if result.stdout.is_empty() {
            HeadRef::Detached(None)
        } else {
            HeadRef::Branch(result.stdout.clone())
        });
    }
}

/// Detailed status in one call: branch, upstream, divergence and dirtiness.
///
/// Sets `head`, `upstream`, `divergence` and `is_clean`. Run after a fetch
/// so a deleted upstream branch is noticed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusBranch;

impl Step for StatusBranch {
    fn name(&self) -> &'static str {
        "status-branch"
    }

    fn message(&self) -> String {
        "Detailed git status...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["status", "--porcelain=v2", "--branch"])
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if !result.success() {
            record_failure(state, self.name(), result);
            return;
        }

        let mut oid = None;
        let mut head = None;
        let mut upstream = None;
        let mut divergence = None;
        let mut changes = 0usize;

        for line in result.stdout.lines() {
            if let Some(value) = line.strip_prefix("# branch.oid ") {
                oid = Some(value.trim());
            } else if let Some(value) = line.strip_prefix("# branch.head ") {
                head = Some(value.trim());
            } else if let Some(value) = line.strip_prefix("# branch.upstream ") {
                upstream = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("# branch.ab ") {
                divergence = parse_ab(value);
                if divergence.is_none() {
                    state.record_error(
                        self.name(),
                        format!("unexpected ahead/behind line: '{}'", value),
                    );
                }
            } else if !line.starts_with('#') && !line.trim().is_empty() {
                changes += 1;
            }
        }

        let Some(head) = head else {
            state.record_error(self.name(), "status output has no branch header");
            return;
        };

        state.head = Some(if head == "(detached)" {
            let commit = oid
                .filter(|o| *o != "(initial)")
                .map(|o| o.chars().take(SHORT_COMMIT).collect());
            HeadRef::Detached(commit)
        } else {
            HeadRef::Branch(head.to_string())
        });

        if upstream.is_some() && divergence.is_none() {
            state.record_warning(self.name(), "upstream branch no longer exists on the remote");
        }
        state.upstream = upstream;
        state.divergence = divergence;
        state.is_clean = Some(changes == 0);
    }
}

/// Parse `+<ahead> -<behind>` from a porcelain v2 `branch.ab` header
fn parse_ab(value: &str) -> Option<Divergence> {
    let mut parts = value.split_whitespace();
    let ahead = parts.next()?.strip_prefix('+')?.parse().ok()?;
    let behind = parts.next()?.strip_prefix('-')?.parse().ok()?;
    Some(Divergence::new(ahead, behind))
}

/// Resolve the upstream of the current branch.
///
/// Requires `head`; sets `upstream`. A branch without upstream is not an
/// error, the field is simply cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamReference;

impl Step for UpstreamReference {
    fn name(&self) -> &'static str {
        "upstream-reference"
    }

    fn message(&self) -> String {
        "Getting upstream branches...".to_string()
    }

    fn build(&self, repo: &Repository, state: &RepoState) -> ProcessSpec {
        let branch = state.branch().unwrap_or("HEAD");
        ProcessSpec::git(
            &repo.path,
            [
                "rev-parse".to_string(),
                "--abbrev-ref".to_string(),
                format!("{}@{{upstream}}", branch),
            ],
        )
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.on_branch()
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if result.spawn_failed() {
            record_failure(state, self.name(), result);
            return;
        }
        state.upstream = if result.success() && !result.stdout.is_empty() {
            Some(result.stdout.clone())
        } else {
            tracing::trace!("No upstream configured: {}", result.stderr);
            None
        };
    }
}

/// Find the most recent tag reachable from HEAD and how far HEAD moved past it.
///
/// Sets `latest_tag`. No tags at all is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestTag;

impl Step for LatestTag {
    fn name(&self) -> &'static str {
        "latest-tag"
    }

    fn message(&self) -> String {
        "Resolving latest tags...".to_string()
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(&repo.path, ["describe", "--tags", "--long"])
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if result.success() {
            match parse_describe(&result.stdout) {
                Some(tag) => state.latest_tag = Some(tag),
                None => state.record_error(
                    self.name(),
                    format!("unexpected describe output: '{}'", result.stdout),
                ),
            }
            return;
        }

        state.latest_tag = None;
        if result.failure.is_some() {
            record_failure(state, self.name(), result);
        } else if !is_missing_tag_message(&result.stderr) {
            // Unknown wording, keep it visible rather than guessing
            state.record_warning(self.name(), result.describe_failure());
        }
    }
}

/// Parse `<tag>-<count>-g<hash>`. Tags may contain dashes themselves.
fn parse_describe(output: &str) -> Option<TagInfo> {
    let mut parts = output.trim().rsplitn(3, '-');
    let hash = parts.next()?;
    let count = parts.next()?.parse().ok()?;
    let name = parts.next()?;
    if !hash.starts_with('g') || name.is_empty() {
        return None;
    }
    Some(TagInfo {
        name: name.to_string(),
        commits_since: count,
    })
}

fn is_missing_tag_message(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no names found")
        || stderr.contains("cannot describe")
        || stderr.contains("no tags can describe")
        || stderr.contains("not a valid object name")
}

/// Resolve the remote's default branch from `refs/remotes/<remote>/HEAD`.
///
/// Requires `remotes`; sets `default_branch` without the remote prefix.
#[derive(Debug, Clone)]
pub struct DefaultBranch {
    remote: String,
}

impl DefaultBranch {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl Step for DefaultBranch {
    fn name(&self) -> &'static str {
        "default-branch"
    }

    fn message(&self) -> String {
        format!("Resolving default branch of {}...", self.remote)
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::git(
            &repo.path,
            [
                "symbolic-ref".to_string(),
                "--short".to_string(),
                format!("refs/remotes/{}/HEAD", self.remote),
            ],
        )
    }

    fn is_relevant(&self, state: &RepoState) -> bool {
        state.has_remote(&self.remote)
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        if result.failure.is_some() {
            record_failure(state, self.name(), result);
            return;
        }
        if !result.success() {
            state.record_warning(
                self.name(),
                format!(
                    "{0}/HEAD is not set (try `git remote set-head {0} --auto`)",
                    self.remote
                ),
            );
            return;
        }

        let prefix = format!("{}/", self.remote);
        match result.stdout.strip_prefix(&prefix) {
            Some(branch) if !branch.is_empty() => state.default_branch = Some(branch.to_string()),
            _ => state.record_error(
                self.name(),
                format!("unexpected symbolic-ref output: '{}'", result.stdout),
            ),
        }
    }
}
