pub mod run;

use clap::{Subcommand, ValueEnum};

use repostates_service::PipelineCommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    /// Run git status (default)
    #[default]
    Status,

    /// Run git pull on clean repositories that track an upstream
    Pull,

    /// Run git checkout on clean repositories
    Checkout {
        /// Branch to checkout to
        target_branch: String,
    },

    /// Find branches whose upstream is already gone
    GoneBranches {
        /// Action to perform on gone branches
        #[arg(value_enum, default_value_t = GoneAction::List)]
        action: GoneAction,
    },

    /// Show how far each branch is behind the remote default branch
    MergeState,

    /// Run an arbitrary shell command in every repository
    Shell {
        /// Custom shell command to run
        custom_command: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneAction {
    List,
}

impl Command {
    pub fn pipeline_command(&self) -> PipelineCommand {
        match self {
            Self::Status => PipelineCommand::Status,
            Self::Pull => PipelineCommand::Pull,
            Self::Checkout { target_branch } => PipelineCommand::Checkout {
                target: target_branch.clone(),
            },
            Self::GoneBranches { .. } => PipelineCommand::GoneBranches,
            Self::MergeState => PipelineCommand::MergeState,
            Self::Shell { custom_command } => PipelineCommand::Shell {
                command: custom_command.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_command_mapping() {
        assert_eq!(Command::Status.pipeline_command(), PipelineCommand::Status);
        assert_eq!(
            Command::Checkout {
                target_branch: "main".to_string()
            }
            .pipeline_command(),
            PipelineCommand::Checkout {
                target: "main".to_string()
            }
        );
        assert_eq!(
            Command::GoneBranches {
                action: GoneAction::List
            }
            .pipeline_command(),
            PipelineCommand::GoneBranches
        );
        assert_eq!(
            Command::Shell {
                custom_command: "ls".to_string()
            }
            .pipeline_command()
            .name(),
            "shell"
        );
    }
}
