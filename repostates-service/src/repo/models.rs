// Repository Models
// Repository identity and the per-repository state accumulated by a pipeline run

use serde::Serialize;
use std::path::PathBuf;

/// A discovered git working tree. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Repository {
    /// Display name (the directory name)
    pub name: String,
    /// Absolute path of the working tree
    pub path: PathBuf,
}

impl Repository {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What HEAD currently points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum HeadRef {
    /// A named local branch
    Branch(String),
    /// Detached HEAD, with the commit when known
    Detached(Option<String>),
}

impl HeadRef {
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name),
            Self::Detached(_) => None,
        }
    }
}

/// Commit counts between a local reference and a counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// Commits only on the local side
    pub ahead: u32,
    /// Commits only on the counterpart side
    pub behind: u32,
}

impl Divergence {
    pub fn new(ahead: u32, behind: u32) -> Self {
        Self { ahead, behind }
    }

    pub fn is_even(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }
}

/// Most recent tag reachable from HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub name: String,
    /// Commits made on top of the tag
    pub commits_since: u32,
}

impl TagInfo {
    pub fn head_is_tagged(&self) -> bool {
        self.commits_since == 0
    }
}

/// Raw result of a custom command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSeverity {
    Warning,
    Error,
}

/// A problem recorded by a step instead of aborting the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepNote {
    /// Name of the step that recorded the note
    pub step: String,
    pub severity: NoteSeverity,
    pub message: String,
}

/// How far the pipeline got for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunOutcome {
    /// Not finished yet
    #[default]
    Pending,
    /// Every step ran or was skipped
    Completed,
    /// Stopped by a cancellation request before the pipeline ended
    Cancelled { completed_steps: usize },
}

/// Summary classification of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoStatus {
    /// In sync with its upstream
    Ok,
    /// No upstream information, or only local commits
    Moderate,
    /// Upstream has commits the local branch lacks
    Critical,
    /// A step recorded an error
    Failed,
}

/// Observations about one repository, accumulated step by step.
///
/// Every field stays unset until a step writes it, so readers can tell
/// "not inspected" apart from "inspected and empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoState {
    pub remotes: Option<Vec<String>>,
    pub fetched: Option<bool>,
    pub head: Option<HeadRef>,
    pub upstream: Option<String>,
    pub divergence: Option<Divergence>,
    pub latest_tag: Option<TagInfo>,
    pub default_branch: Option<String>,
    pub is_clean: Option<bool>,
    /// HEAD compared with the remote default branch
    pub merge: Option<Divergence>,
    pub gone_branches: Option<Vec<String>>,
    pub checked_out: Option<String>,
    pub pulled: Option<bool>,
    pub output: Option<CapturedOutput>,
    pub notes: Vec<StepNote>,
    pub outcome: RunOutcome,
}

impl RepoState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current branch name, if HEAD is on a branch
    pub fn branch(&self) -> Option<&str> {
        self.head.as_ref().and_then(HeadRef::branch)
    }

    pub fn on_branch(&self) -> bool {
        self.branch().is_some()
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.remotes
            .as_ref()
            .is_some_and(|remotes| remotes.iter().any(|r| r == name))
    }

    pub fn has_any_remote(&self) -> bool {
        self.remotes.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn needs_merge(&self) -> Option<bool> {
        self.merge.map(|m| m.behind > 0)
    }

    pub fn record_warning(&mut self, step: &str, message: impl Into<String>) {
        self.notes.push(StepNote {
            step: step.to_string(),
            severity: NoteSeverity::Warning,
            message: message.into(),
        });
    }

    pub fn record_error(&mut self, step: &str, message: impl Into<String>) {
        self.notes.push(StepNote {
            step: step.to_string(),
            severity: NoteSeverity::Error,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &StepNote> {
        self.notes
            .iter()
            .filter(|n| n.severity == NoteSeverity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, RunOutcome::Cancelled { .. })
    }

    /// Label for the current reference
    pub fn head_label(&self) -> String {
        match &self.head {
            Some(HeadRef::Branch(name)) => name.clone(),
            Some(HeadRef::Detached(Some(commit))) => format!("({})", commit),
            Some(HeadRef::Detached(None)) => "-- No branch --".to_string(),
            None => "N/A".to_string(),
        }
    }

    pub fn status(&self) -> RepoStatus {
        if self.has_errors() {
            return RepoStatus::Failed;
        }
        match (self.on_branch(), self.upstream.as_ref(), self.divergence) {
            (true, Some(_), Some(d)) if d.is_even() => RepoStatus::Ok,
            (true, Some(_), Some(d)) if d.behind > 0 => RepoStatus::Critical,
            _ => RepoStatus::Moderate,
        }
    }
}

/// A finished repository paired with its final state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReport {
    pub repository: Repository,
    pub state: RepoState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(ahead: u32, behind: u32) -> RepoState {
        RepoState {
            head: Some(HeadRef::Branch("main".to_string())),
            upstream: Some("origin/main".to_string()),
            divergence: Some(Divergence::new(ahead, behind)),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_in_sync() {
        assert_eq!(tracked(0, 0).status(), RepoStatus::Ok);
    }

    #[test]
    fn test_status_behind_is_critical() {
        assert_eq!(tracked(0, 2).status(), RepoStatus::Critical);
        assert_eq!(tracked(3, 2).status(), RepoStatus::Critical);
    }

    #[test]
    fn test_status_ahead_only_is_moderate() {
        assert_eq!(tracked(1, 0).status(), RepoStatus::Moderate);
    }

    #[test]
    fn test_status_without_upstream_is_moderate() {
        let state = RepoState {
            head: Some(HeadRef::Branch("feature".to_string())),
            ..Default::default()
        };
        assert_eq!(state.status(), RepoStatus::Moderate);
    }

    #[test]
    fn test_status_errors_win() {
        let mut state = tracked(0, 0);
        state.record_warning("fetch", "slow remote");
        assert_eq!(state.status(), RepoStatus::Ok);

        state.record_error("fetch", "could not resolve host");
        assert_eq!(state.status(), RepoStatus::Failed);
        assert_eq!(state.errors().count(), 1);
    }

    #[test]
    fn test_head_label() {
        let mut state = RepoState::new();
        assert_eq!(state.head_label(), "N/A");

        state.head = Some(HeadRef::Detached(None));
        assert_eq!(state.head_label(), "-- No branch --");
        assert!(!state.on_branch());

        state.head = Some(HeadRef::Detached(Some("1a2b3c4".to_string())));
        assert_eq!(state.head_label(), "(1a2b3c4)");

        state.head = Some(HeadRef::Branch("develop".to_string()));
        assert_eq!(state.head_label(), "develop");
        assert_eq!(state.branch(), Some("develop"));
    }

    #[test]
    fn test_remote_queries() {
        let mut state = RepoState::new();
        assert!(!state.has_remote("origin"));
        assert!(!state.has_any_remote());

        state.remotes = Some(vec!["upstream".to_string()]);
        assert!(!state.has_remote("origin"));
        assert!(state.has_remote("upstream"));
        assert!(state.has_any_remote());
    }

    #[test]
    fn test_needs_merge() {
        let mut state = RepoState::new();
        assert_eq!(state.needs_merge(), None);

        state.merge = Some(Divergence::new(2, 0));
        assert_eq!(state.needs_merge(), Some(false));

        state.merge = Some(Divergence::new(0, 4));
        assert_eq!(state.needs_merge(), Some(true));
    }

    #[test]
    fn test_report_serializes_outcome() {
        let report = RepoReport {
            repository: Repository::new("api", "/work/api"),
            state: RepoState {
                outcome: RunOutcome::Cancelled { completed_steps: 2 },
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["repository"]["name"], "api");
        assert_eq!(json["state"]["outcome"]["state"], "cancelled");
        assert_eq!(json["state"]["outcome"]["completed_steps"], 2);
    }
}
