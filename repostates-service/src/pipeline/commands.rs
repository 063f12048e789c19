// Pipeline Commands
// Preset step sequences behind each command-line command

use crate::config::{FetchScope, Settings, DEFAULT_REMOTE};
use crate::pipeline::Pipeline;
use crate::steps::{
    AheadBehind, Checkout, CurrentReference, DefaultBranch, FetchCurrent, FetchPrune,
    GoneBranches, LatestTag, ListRemotes, MergeNeed, Pull, ShellCommand, StatusBranch,
    UncommittedChanges, UpstreamReference,
};

/// Options shared by every preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Remote used by fetch, default-branch and merge steps
    pub remote: String,
    pub fetch: FetchScope,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            fetch: FetchScope::default(),
        }
    }
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            remote: settings.remote.clone(),
            fetch: settings.fetch,
        }
    }
}

/// The command a run was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    Status,
    Pull,
    Checkout { target: String },
    GoneBranches,
    MergeState,
    Shell { command: String },
}

impl PipelineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Pull => "pull",
            Self::Checkout { .. } => "checkout",
            Self::GoneBranches => "gone-branches",
            Self::MergeState => "merge-state",
            Self::Shell { .. } => "shell",
        }
    }

    /// Build the step sequence for this command
    pub fn build(&self, options: &PipelineOptions) -> Pipeline {
        let name = self.name();
        match self {
            Self::Status => status(name, options),
            Self::Pull => status(name, options)
                .with_step(Pull)
                .with_step(StatusBranch),
            Self::Checkout { target } => preamble(name, options, false)
                .with_step(UncommittedChanges)
                .with_step(Checkout::new(target))
                .with_step(StatusBranch),
            Self::GoneBranches => {
                preamble(name, &pruning(options), true).with_step(GoneBranches)
            }
            Self::MergeState => preamble(name, options, true)
                .with_step(DefaultBranch::new(options.remote.as_str()))
                .with_step(MergeNeed::new(options.remote.as_str())),
            Self::Shell { command } => preamble(name, options, false)
                .with_step(ShellCommand::new(command.as_str()))
                .with_step(StatusBranch),
        }
    }
}

/// Remote listing and fetch. `FetchCurrent` needs the current branch, so
/// `CurrentReference` is placed ahead of it; `needs_head` adds it for the
/// other fetch scopes too.
fn preamble(name: &str, options: &PipelineOptions, needs_head: bool) -> Pipeline {
    let remote = options.remote.as_str();
    let pipeline = Pipeline::new(name).with_step(ListRemotes);
    match options.fetch {
        FetchScope::Prune if needs_head => pipeline
            .with_step(FetchPrune::new(remote))
            .with_step(CurrentReference),
        FetchScope::Prune => pipeline.with_step(FetchPrune::new(remote)),
        FetchScope::Current => pipeline
            .with_step(CurrentReference)
            .with_step(FetchCurrent::new(remote)),
        FetchScope::Skip if needs_head => pipeline.with_step(CurrentReference),
        FetchScope::Skip => pipeline,
    }
}

/// Fetching a single branch never prunes, so stale tracking refs would hide
/// gone branches. Upgrade that scope to a pruning fetch.
fn pruning(options: &PipelineOptions) -> PipelineOptions {
    if options.fetch != FetchScope::Current {
        return options.clone();
    }
    tracing::debug!("gone-branches needs pruned tracking refs, using a full prune fetch");
    PipelineOptions {
        fetch: FetchScope::Prune,
        ..options.clone()
    }
}

fn status(name: &str, options: &PipelineOptions) -> Pipeline {
    preamble(name, options, true)
        .with_step(UpstreamReference)
        .with_step(AheadBehind)
        .with_step(UncommittedChanges)
        .with_step(LatestTag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(fetch: FetchScope) -> PipelineOptions {
        PipelineOptions {
            fetch,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_pipeline() {
        let pipeline = PipelineCommand::Status.build(&PipelineOptions::default());
        assert_eq!(pipeline.name, "status");
        assert_eq!(
            pipeline.step_names(),
            vec![
                "list-remotes",
                "fetch-prune",
                "current-reference",
                "upstream-reference",
                "ahead-behind",
                "uncommitted-changes",
                "latest-tag",
            ]
        );
    }

    #[test]
    fn test_status_pipeline_fetch_current_after_reference() {
        let pipeline = PipelineCommand::Status.build(&options(FetchScope::Current));
        assert_eq!(
            &pipeline.step_names()[..3],
            &["list-remotes", "current-reference", "fetch-current"]
        );
    }

    #[test]
    fn test_status_pipeline_without_fetch() {
        let names = PipelineCommand::Status
            .build(&options(FetchScope::Skip))
            .step_names();
        assert!(!names.iter().any(|n| n.starts_with("fetch")));
        assert_eq!(names[1], "current-reference");
    }

    #[test]
    fn test_pull_pipeline_extends_status() {
        let status = PipelineCommand::Status.build(&PipelineOptions::default());
        let pull = PipelineCommand::Pull.build(&PipelineOptions::default());
        let names = pull.step_names();

        assert_eq!(&names[..status.len()], status.step_names().as_slice());
        assert_eq!(&names[status.len()..], &["pull", "status-branch"]);
    }

    #[test]
    fn test_checkout_pipeline() {
        let command = PipelineCommand::Checkout {
            target: "develop".to_string(),
        };
        assert_eq!(
            command.build(&PipelineOptions::default()).step_names(),
            vec![
                "list-remotes",
                "fetch-prune",
                "uncommitted-changes",
                "checkout",
                "status-branch",
            ]
        );
    }

    #[test]
    fn test_gone_branches_pipeline() {
        assert_eq!(
            PipelineCommand::GoneBranches
                .build(&PipelineOptions::default())
                .step_names(),
            vec!["list-remotes", "fetch-prune", "current-reference", "gone-branches"]
        );
    }

    #[test]
    fn test_gone_branches_pipeline_always_prunes() {
        let names = PipelineCommand::GoneBranches
            .build(&options(FetchScope::Current))
            .step_names();
        assert!(names.contains(&"fetch-prune"));
        assert!(!names.contains(&"fetch-current"));

        // An explicit no-fetch is left alone
        let names = PipelineCommand::GoneBranches
            .build(&options(FetchScope::Skip))
            .step_names();
        assert_eq!(names, vec!["list-remotes", "current-reference", "gone-branches"]);
    }

    #[test]
    fn test_merge_state_pipeline() {
        assert_eq!(
            PipelineCommand::MergeState
                .build(&PipelineOptions::default())
                .step_names(),
            vec![
                "list-remotes",
                "fetch-prune",
                "current-reference",
                "default-branch",
                "merge-need",
            ]
        );
    }

    #[test]
    fn test_shell_pipeline() {
        let command = PipelineCommand::Shell {
            command: "git log -1".to_string(),
        };
        let pipeline = command.build(&options(FetchScope::Skip));
        assert_eq!(pipeline.name, "shell");
        assert_eq!(
            pipeline.step_names(),
            vec!["list-remotes", "shell", "status-branch"]
        );
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            remote: "upstream".to_string(),
            fetch: FetchScope::Current,
            ..Default::default()
        };
        let options = PipelineOptions::from(&settings);
        assert_eq!(options.remote, "upstream");
        assert_eq!(options.fetch, FetchScope::Current);
    }
}
