use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backends::failure::install_failure;
use crate::backends::process_utils::{run_and_collect_output, run_probe, running_as_root};
use crate::backends::provider::{BackendContext, BackendProvider, BoxFuture};
use crate::execution::{CommandSpec, ProcessSpawnRequest, ProcessTerminationMode};
use crate::models::{BackendAction, BackendId, CoreError, CoreErrorKind, validate_package_name};
use crate::orchestration::CancellationToken;

const PACMAN_COMMAND: &str = "pacman";
pub const PACMAN_LOCK_PATH: &str = "/var/lib/pacman/db.lck";
pub(crate) const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const INSTALL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub fn pacman_query_request(program: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Pacman,
        BackendAction::QueryInstalled,
        CommandSpec::new(program).arg("-Q").arg(package),
    )
    .timeout(QUERY_TIMEOUT)
    .termination(ProcessTerminationMode::Immediate)
}

pub fn pacman_install_request(program: &Path, package: &str, as_root: bool) -> ProcessSpawnRequest {
    let command = if as_root {
        CommandSpec::new(program)
    } else {
        CommandSpec::new("sudo")
            .arg("-n")
            .arg(program.to_string_lossy())
    };

    ProcessSpawnRequest::new(
        BackendId::Pacman,
        BackendAction::Install,
        command
            .args(["-S", "--noconfirm", "--needed"])
            .arg(package)
            .env("LANG", "C")
            .env("LC_ALL", "C"),
    )
    .timeout(INSTALL_TIMEOUT)
}

/// Fails with `LockConflict` while another pacman holds the database lock.
/// The lock file is reported, never removed.
pub(crate) fn check_database_lock(
    backend: BackendId,
    package: &str,
    lock_path: &Path,
) -> Result<(), CoreError> {
    if !lock_path.exists() {
        return Ok(());
    }

    let mut message = format!(
        "pacman database is locked ({}); another package manager instance may be running",
        lock_path.display()
    );
    if let Some(hint) = CoreErrorKind::LockConflict.remediation() {
        message.push_str("\nhint: ");
        message.push_str(hint);
    }

    Err(CoreError::new(CoreErrorKind::LockConflict, message)
        .backend(backend)
        .package(package)
        .action(BackendAction::Preflight))
}

pub struct PacmanProvider {
    context: BackendContext,
    lock_path: PathBuf,
}

impl PacmanProvider {
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            lock_path: PathBuf::from(PACMAN_LOCK_PATH),
        }
    }

    pub fn with_lock_path(mut self, lock_path: impl Into<PathBuf>) -> Self {
        self.lock_path = lock_path.into();
        self
    }

    fn program(&self) -> PathBuf {
        self.context
            .find_executable(PACMAN_COMMAND)
            .unwrap_or_else(|| PathBuf::from(PACMAN_COMMAND))
    }
}

impl BackendProvider for PacmanProvider {
    fn name(&self) -> &str {
        BackendId::Pacman.name()
    }

    fn is_available(&self) -> bool {
        self.context.platform.is_linux() && self.context.find_executable(PACMAN_COMMAND).is_some()
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if validate_package_name(package).is_err() {
                return false;
            }
            let request = pacman_query_request(&self.program(), package);
            run_probe(self.context.executor.as_ref(), request)
                .await
                .is_some()
        })
    }

    fn install<'a>(
        &'a self,
        package: &'a str,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            validate_package_name(package).map_err(|error| error.backend(BackendId::Pacman))?;
            check_database_lock(BackendId::Pacman, package, &self.lock_path)?;

            let request = pacman_install_request(&self.program(), package, running_as_root());
            tracing::info!(package, command = %request.command.render(), "installing with pacman");

            let output =
                run_and_collect_output(self.context.executor.as_ref(), request, cancellation)
                    .await
                    .map_err(|error| error.package(package))?;

            if output.succeeded() {
                Ok(())
            } else {
                Err(install_failure(BackendId::Pacman, package, &output))
            }
        })
    }

    fn priority(&self) -> i32 {
        BackendId::Pacman.priority()
    }

    fn parallel_safe(&self) -> bool {
        BackendId::Pacman.parallel_safe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DEFAULT_GRACE_PERIOD;

    #[test]
    fn install_request_goes_through_non_interactive_sudo() {
        let request = pacman_install_request(Path::new("/usr/bin/pacman"), "git", false);
        assert_eq!(
            request.command.render(),
            "sudo -n /usr/bin/pacman -S --noconfirm --needed git"
        );
        assert_eq!(request.command.env.get("LC_ALL").map(String::as_str), Some("C"));
    }

    #[test]
    fn install_request_as_root_skips_sudo() {
        let request = pacman_install_request(Path::new("pacman"), "git", true);
        assert_eq!(request.command.render(), "pacman -S --noconfirm --needed git");
        assert_eq!(
            request.termination,
            ProcessTerminationMode::Graceful {
                grace_period: DEFAULT_GRACE_PERIOD
            }
        );
    }

    #[test]
    fn query_request_is_read_only() {
        let request = pacman_query_request(Path::new("pacman"), "git");
        assert_eq!(request.command.render(), "pacman -Q git");
        assert_eq!(request.action, BackendAction::QueryInstalled);
        assert_eq!(request.termination, ProcessTerminationMode::Immediate);
    }

    #[test]
    fn missing_lock_file_passes_preflight() {
        let path = std::env::temp_dir().join("pkgflow-no-such-db.lck");
        assert!(check_database_lock(BackendId::Pacman, "git", &path).is_ok());
    }
}
