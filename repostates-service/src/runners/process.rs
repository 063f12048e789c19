// Process Runner
// Spawns one external command in a working directory and captures its output

use crate::runners::ProcessRunner;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// How long to wait for output pipes to close once the child has exited or
/// been killed
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// An external command: program, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ProcessSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I, working_dir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// A `git` invocation
    pub fn git<I, S>(working_dir: &Path, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args, working_dir)
    }

    /// A command line interpreted by the platform shell (sh on Unix, cmd on Windows)
    pub fn shell(working_dir: &Path, command_line: &str) -> Self {
        if cfg!(target_os = "windows") {
            Self::new("cmd", ["/C", command_line], working_dir)
        } else {
            Self::new("sh", ["-c", command_line], working_dir)
        }
    }

    /// The command as it would be typed, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a process did not produce a regular exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFailure {
    /// The process could not be started (missing binary, bad working directory)
    Spawn(String),
    /// The process started but waiting for it failed
    Wait(String),
    /// The process exceeded its deadline and was killed
    TimedOut(Duration),
}

/// Captured result of one external invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    /// Exit code (None if the process never exited normally)
    pub exit_code: Option<i32>,
    /// Standard output, trimmed
    pub stdout: String,
    /// Standard error, trimmed
    pub stderr: String,
    /// Set when no regular exit status is available
    pub failure: Option<ProcessFailure>,
}

impl ProcessResult {
    /// A process that ran and exited with `code`
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            failure: None,
        }
    }

    /// A process that could not be started
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            failure: Some(ProcessFailure::Spawn(message.into())),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none() && self.exit_code == Some(0)
    }

    pub fn spawn_failed(&self) -> bool {
        matches!(self.failure, Some(ProcessFailure::Spawn(_)))
    }

    /// Human readable reason for an unsuccessful run
    pub fn describe_failure(&self) -> String {
        match &self.failure {
            Some(ProcessFailure::Spawn(message)) => message.clone(),
            Some(ProcessFailure::Wait(message)) => format!("lost track of process: {}", message),
            Some(ProcessFailure::TimedOut(after)) => format!("timed out after {:?}", after),
            None => {
                let detail = self.stderr.lines().next().unwrap_or("").trim();
                match (self.exit_code, detail.is_empty()) {
                    (Some(code), true) => format!("exited with code {}", code),
                    (Some(code), false) => format!("exited with code {}: {}", code, detail),
                    (None, _) => "terminated by signal".to_string(),
                }
            }
        }
    }
}

/// Runs processes with tokio, optionally under a per-invocation deadline
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Create a runner without a deadline
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill any invocation that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait::async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, spec: &ProcessSpec) -> ProcessResult {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.current_dir(&spec.working_dir);
        // Never block on a credential prompt
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProcessResult::spawn_failure(format!(
                    "Failed to spawn '{}' in {}: {}",
                    spec.program,
                    spec.working_dir.display(),
                    e
                ));
            }
        };

        // Read both streams concurrently so a full pipe never stalls the child
        let stdout_collector = collect_stream(child.stdout.take());
        let stderr_collector = collect_stream(child.stderr.take());

        let wait_result = if let Some(timeout) = self.timeout {
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    let _ = child.kill().await;
                    return ProcessResult {
                        exit_code: None,
                        stdout: drain(stdout_collector).await,
                        stderr: drain(stderr_collector).await,
                        failure: Some(ProcessFailure::TimedOut(timeout)),
                    };
                }
            }
        } else {
            child.wait().await
        };

        // A backgrounded grandchild can hold the pipes open after exit
        let stdout = drain(stdout_collector).await;
        let stderr = drain(stderr_collector).await;

        match wait_result {
            Ok(status) => ProcessResult {
                exit_code: status.code(),
                stdout,
                stderr,
                failure: None,
            },
            Err(e) => ProcessResult {
                exit_code: None,
                stdout,
                stderr,
                failure: Some(ProcessFailure::Wait(e.to_string())),
            },
        }
    }
}

/// Output read so far from one pipe, plus the task still reading it
struct StreamCollector {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

fn collect_stream<R>(stream: Option<R>) -> StreamCollector
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let handle = tokio::spawn(async move {
        let Some(mut stream) = stream else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => append(&sink, &chunk[..n]),
            }
        }
    });
    StreamCollector { buf, handle }
}

/// Wait a bounded time for the pipe to close, then keep whatever was read
async fn drain(collector: StreamCollector) -> String {
    let StreamCollector { buf, mut handle } = collector;
    if tokio::time::timeout(DRAIN_GRACE, &mut handle).await.is_err() {
        handle.abort();
    }
    let bytes = match buf.lock() {
        Ok(buf) => buf.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    String::from_utf8_lossy(&bytes).trim().to_string()
}

fn append(buf: &Mutex<Vec<u8>>, bytes: &[u8]) {
    match buf.lock() {
        Ok(mut buf) => buf.extend_from_slice(bytes),
        Err(poisoned) => poisoned.into_inner().extend_from_slice(bytes),
    }
}

/// Whether a `git` executable can be found on PATH
pub fn git_available() -> bool {
    which::which("git").is_ok()
}
