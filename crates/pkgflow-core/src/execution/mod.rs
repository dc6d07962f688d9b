pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{BackendAction, BackendId, CoreError, CoreErrorKind};
use crate::orchestration::CancellationToken;

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn render(&self) -> String {
        let mut rendered = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }

    pub fn validate(&self, backend: BackendId, action: BackendAction) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(
                backend,
                action,
                "command program path must not be empty",
            ));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                backend,
                action,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                backend,
                action,
                "environment keys and values must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub backend: BackendId,
    pub action: BackendAction,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
    /// How the process is stopped on timeout or cancellation.
    pub termination: ProcessTerminationMode,
}

impl ProcessSpawnRequest {
    pub fn new(backend: BackendId, action: BackendAction, command: CommandSpec) -> Self {
        Self {
            backend,
            action,
            command,
            timeout: None,
            termination: ProcessTerminationMode::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn termination(mut self, termination: ProcessTerminationMode) -> Self {
        self.termination = termination;
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.backend, self.action)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.backend,
                self.action,
                "timeout must be greater than zero when provided",
            ));
        }

        if let ProcessTerminationMode::Graceful { grace_period } = self.termination
            && grace_period.is_zero()
        {
            return Err(invalid_input(
                self.backend,
                self.action,
                "grace period must be greater than zero",
            ));
        }

        Ok(())
    }
}

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// `Graceful` sends SIGTERM to the process group so wrappers such as sudo
/// can relay it, then SIGKILL once the grace period lapses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessTerminationMode {
    Graceful { grace_period: Duration },
    Immediate,
}

impl Default for ProcessTerminationMode {
    fn default() -> Self {
        Self::Graceful {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.status == ProcessExitStatus::ExitCode(0)
    }

    /// stdout followed by stderr, lossily decoded.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).to_string();
        let stderr = String::from_utf8_lossy(&self.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        text
    }
}

pub trait RunningProcess: Send + Sync {
    /// Waits for exit. Cancelling `cancellation` stops the process using the
    /// request's termination mode and yields a `Cancelled` error.
    fn wait(self: Box<Self>, cancellation: CancellationToken) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

fn invalid_input(backend: BackendId, action: BackendAction, message: &str) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message)
        .backend(backend)
        .action(action)
}
