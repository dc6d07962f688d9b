use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncReadExt;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessTerminationMode, ProcessWaitFuture, RunningProcess,
};
use crate::models::{BackendAction, BackendId, CoreError, CoreErrorKind};
use crate::orchestration::CancellationToken;

const OUTPUT_READ_DEADLINE: Duration = Duration::from_millis(250);
const KILL_REAP_DEADLINE: Duration = Duration::from_secs(1);

pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let mut cmd = tokio::process::Command::new(&request.command.program);
        cmd.args(&request.command.args);

        for (key, value) in &request.command.env {
            cmd.env(key, value);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            backend = %request.backend,
            action = ?request.action,
            command = %request.command.render(),
            "spawning process"
        );

        let child = cmd.spawn().map_err(|error| {
            process_failure(
                request.backend,
                request.action,
                format!("failed to spawn {}: {error}", request.command.render()),
            )
        })?;

        let pid = child.id();
        let started_at = SystemTime::now();

        Ok(Box::new(TokioRunningProcess {
            child: Mutex::new(Some(child)),
            pid,
            started_at,
            timeout: request.timeout,
            termination: request.termination,
            backend: request.backend,
            action: request.action,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<tokio::process::Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    timeout: Option<Duration>,
    termination: ProcessTerminationMode,
    backend: BackendId,
    action: BackendAction,
}

impl RunningProcess for TokioRunningProcess {
    fn wait(self: Box<Self>, cancellation: CancellationToken) -> ProcessWaitFuture {
        let child = self.child.into_inner().ok().flatten();
        let timeout = self.timeout;
        let termination = self.termination;
        let started_at = self.started_at;
        let backend = self.backend;
        let action = self.action;
        let pid = self.pid;

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                process_failure(backend, action, "child process already consumed".to_string())
            })?;

            let stdout_reader = {
                let mut stdout = child.stdout.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stdout.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };
            let stderr_reader = {
                let mut stderr = child.stderr.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stderr.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };

            let deadline = async {
                match timeout {
                    Some(duration) => tokio::time::sleep(duration).await,
                    None => std::future::pending::<()>().await,
                }
            };

            // Output is collected after exit with a bounded window so inherited
            // descendant fds cannot hang the wait.
            let status = tokio::select! {
                result = child.wait() => result.map_err(|error| {
                    process_failure(backend, action, format!("failed to wait for process: {error}"))
                })?,
                _ = deadline => {
                    stop_process_group(&mut child, pid, termination).await;
                    stdout_reader.abort();
                    stderr_reader.abort();
                    let millis = timeout.map(|t| t.as_millis()).unwrap_or_default();
                    return Err(CoreError::new(
                        CoreErrorKind::Timeout,
                        format!("process timed out after {millis}ms"),
                    )
                    .backend(backend)
                    .action(action));
                }
                _ = cancellation.cancelled() => {
                    stop_process_group(&mut child, pid, termination).await;
                    stdout_reader.abort();
                    stderr_reader.abort();
                    return Err(CoreError::cancelled("process cancelled")
                        .backend(backend)
                        .action(action));
                }
            };

            let stdout = match tokio::time::timeout(OUTPUT_READ_DEADLINE, stdout_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };
            let stderr = match tokio::time::timeout(OUTPUT_READ_DEADLINE, stderr_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };

            let finished_at = SystemTime::now();

            let status = match status.code() {
                Some(code) => ProcessExitStatus::ExitCode(code),
                None => ProcessExitStatus::Terminated,
            };

            Ok(ProcessOutput {
                status,
                stdout,
                stderr,
                started_at,
                finished_at,
            })
        })
    }
}

async fn stop_process_group(
    child: &mut tokio::process::Child,
    pid: Option<u32>,
    mode: ProcessTerminationMode,
) {
    if let ProcessTerminationMode::Graceful { grace_period } = mode {
        #[cfg(unix)]
        if let Some(pid) = pid {
            signal_process_group(pid, libc::SIGTERM);
            if tokio::time::timeout(grace_period, child.wait()).await.is_ok() {
                return;
            }
            tracing::warn!(
                pid,
                grace_ms = grace_period.as_millis() as u64,
                "process ignored SIGTERM, killing process group"
            );
        }
        #[cfg(not(unix))]
        let _ = grace_period;
    }

    #[cfg(unix)]
    if let Some(pid) = pid {
        signal_process_group(pid, libc::SIGKILL);
    }
    #[cfg(not(unix))]
    let _ = pid;

    let _ = child.start_kill();
    let _ = tokio::time::timeout(KILL_REAP_DEADLINE, child.wait()).await;
}

#[cfg(unix)]
fn signal_process_group(pid: u32, signal: libc::c_int) {
    let pgid = -(pid as libc::pid_t);
    let result = unsafe { libc::kill(pgid, signal) };
    if result != 0 {
        let os_error = std::io::Error::last_os_error();
        if os_error.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, signal, error = %os_error, "failed to signal process group");
        }
    }
}

fn process_failure(backend: BackendId, action: BackendAction, message: String) -> CoreError {
    CoreError::new(CoreErrorKind::ProcessFailure, message)
        .backend(backend)
        .action(action)
}
