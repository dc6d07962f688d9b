use std::path::{Path, PathBuf};

use crate::backends::failure::install_failure;
use crate::backends::pacman::{INSTALL_TIMEOUT, QUERY_TIMEOUT};
use crate::backends::process_utils::{run_and_collect_output, run_probe};
use crate::backends::provider::{BackendContext, BackendProvider, BoxFuture};
use crate::execution::{CommandSpec, ProcessOutput, ProcessSpawnRequest, ProcessTerminationMode};
use crate::models::{BackendAction, BackendId, CoreError, validate_package_name};
use crate::orchestration::CancellationToken;

const WINGET_COMMAND: &str = "winget";
const SUCCESS_MARKERS: &[&str] = &["successfully installed", "already installed"];

pub fn winget_list_request(program: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Winget,
        BackendAction::QueryInstalled,
        CommandSpec::new(program)
            .args(["list", "--id"])
            .arg(package)
            .arg("--exact"),
    )
    .timeout(QUERY_TIMEOUT)
    .termination(ProcessTerminationMode::Immediate)
}

pub fn winget_install_request(program: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Winget,
        BackendAction::Install,
        CommandSpec::new(program)
            .args(["install", "--id"])
            .arg(package)
            .args([
                "--exact",
                "--silent",
                "--accept-package-agreements",
                "--accept-source-agreements",
            ]),
    )
    .timeout(INSTALL_TIMEOUT)
}

/// `winget list` exits 0 for some misses, so the id must be echoed back as a
/// whole column value. `Git.Git` does not match a `Git.GitLFS` row.
pub fn list_output_contains(stdout: &str, package: &str) -> bool {
    stdout
        .lines()
        .flat_map(str::split_whitespace)
        .any(|token| token.eq_ignore_ascii_case(package))
}

pub fn install_output_reports_success(output: &ProcessOutput) -> bool {
    if output.succeeded() {
        return true;
    }
    let text = output.combined_text().to_ascii_lowercase();
    SUCCESS_MARKERS.iter().any(|marker| text.contains(marker))
}

pub struct WingetProvider {
    context: BackendContext,
}

impl WingetProvider {
    pub fn new(context: BackendContext) -> Self {
        Self { context }
    }

    fn program(&self) -> PathBuf {
        self.context
            .find_executable(WINGET_COMMAND)
            .unwrap_or_else(|| PathBuf::from(WINGET_COMMAND))
    }
}

impl BackendProvider for WingetProvider {
    fn name(&self) -> &str {
        BackendId::Winget.name()
    }

    fn is_available(&self) -> bool {
        self.context.platform.is_windows()
            && self.context.find_executable(WINGET_COMMAND).is_some()
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if validate_package_name(package).is_err() {
                return false;
            }
            let request = winget_list_request(&self.program(), package);
            match run_probe(self.context.executor.as_ref(), request).await {
                Some(output) => list_output_contains(&String::from_utf8_lossy(&output.stdout), package),
                None => false,
            }
        })
    }

    fn install<'a>(
        &'a self,
        package: &'a str,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            validate_package_name(package).map_err(|error| error.backend(BackendId::Winget))?;
            let request = winget_install_request(&self.program(), package);
            tracing::info!(package, command = %request.command.render(), "installing with winget");

            let output =
                run_and_collect_output(self.context.executor.as_ref(), request, cancellation)
                    .await
                    .map_err(|error| error.package(package))?;

            if install_output_reports_success(&output) {
                if !output.succeeded() {
                    tracing::debug!(package, status = ?output.status, "winget reported success with non-zero exit");
                }
                Ok(())
            } else {
                Err(install_failure(BackendId::Winget, package, &output))
            }
        })
    }

    fn priority(&self) -> i32 {
        BackendId::Winget.priority()
    }

    fn parallel_safe(&self) -> bool {
        BackendId::Winget.parallel_safe()
    }
}
