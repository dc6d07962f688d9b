use crate::execution::{ProcessExecutor, ProcessOutput, ProcessSpawnRequest, spawn_validated};
use crate::models::CoreError;
use crate::orchestration::CancellationToken;

pub(crate) async fn run_and_collect_output(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
    cancellation: &CancellationToken,
) -> Result<ProcessOutput, CoreError> {
    let process = spawn_validated(executor, request)?;
    process.wait(cancellation.clone()).await
}

/// Runs a read-only probe; anything but a clean zero exit is `None`.
pub(crate) async fn run_probe(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> Option<ProcessOutput> {
    let rendered = request.command.render();
    match run_and_collect_output(executor, request, &CancellationToken::new()).await {
        Ok(output) if output.succeeded() => Some(output),
        Ok(output) => {
            tracing::debug!(command = %rendered, status = ?output.status, "probe returned non-zero");
            None
        }
        Err(error) => {
            tracing::debug!(command = %rendered, %error, "probe failed");
            None
        }
    }
}

/// Last non-empty lines of process output, for error messages.
pub(crate) fn output_tail(text: &str, lines: usize) -> String {
    let tail: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = tail.len().saturating_sub(lines);
    tail[start..].join("\n")
}

#[cfg(unix)]
pub(crate) fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub(crate) fn running_as_root() -> bool {
    false
}
