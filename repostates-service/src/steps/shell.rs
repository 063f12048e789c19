// Shell Command Step
// Runs an arbitrary command line in every repository and keeps its raw output

use crate::repo::{CapturedOutput, RepoState, Repository};
use crate::runners::{ProcessResult, ProcessSpec};
use crate::steps::{record_failure, Step};

/// Run a user supplied command line through the platform shell.
///
/// Sets `output`. A non-zero exit belongs to the user's command and is
/// only a warning; failing to start or timing out is an error.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    command: String,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        tracing::info!("Custom command: {}", command);
        Self { command }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Step for ShellCommand {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn message(&self) -> String {
        format!("Running custom command: {}", self.command)
    }

    fn build(&self, repo: &Repository, _state: &RepoState) -> ProcessSpec {
        ProcessSpec::shell(&repo.path, &self.command)
    }

    fn fold(&self, state: &mut RepoState, result: &ProcessResult) {
        state.output = Some(CapturedOutput {
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        });
        if result.failure.is_some() {
            record_failure(state, self.name(), result);
        } else if !result.success() {
            state.record_warning(self.name(), result.describe_failure());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::NoteSeverity;
    use crate::steps::testing::{failed, ok, repo};

    #[test]
    fn test_shell_command_build_uses_platform_shell() {
        let step = ShellCommand::new("git log -1 --oneline");
        let spec = step.build(&repo(), &RepoState::new());

        assert_eq!(spec.args.last().map(String::as_str), Some("git log -1 --oneline"));
        assert_eq!(spec.working_dir, repo().path);
        if cfg!(target_os = "windows") {
            assert_eq!(spec.program, "cmd");
        } else {
            assert_eq!(spec.program, "sh");
        }
    }

    #[test]
    fn test_shell_command_captures_output() {
        let step = ShellCommand::new("echo hi");
        let mut state = RepoState::new();
        step.fold(&mut state, &ok("hi"));

        let output = state.output.unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "hi");
        assert!(state.notes.is_empty());
    }

    #[test]
    fn test_shell_command_failure_keeps_output() {
        let step = ShellCommand::new("make test");
        let mut state = RepoState::new();
        step.fold(&mut state, &failed(2, "make: *** [test] Error 1"));

        assert_eq!(state.output.as_ref().unwrap().exit_code, Some(2));
        assert_eq!(state.notes[0].severity, NoteSeverity::Warning);
        assert!(!state.has_errors());
    }

    #[test]
    fn test_shell_command_spawn_failure_is_error() {
        let step = ShellCommand::new("missing-tool");
        let mut state = RepoState::new();
        step.fold(&mut state, &ProcessResult::spawn_failure("No such file or directory"));

        assert!(state.has_errors());
        assert!(state.output.as_ref().unwrap().exit_code.is_none());
    }
}
