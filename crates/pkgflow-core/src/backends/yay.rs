use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backends::failure::install_failure;
use crate::backends::pacman::{INSTALL_TIMEOUT, PACMAN_LOCK_PATH, QUERY_TIMEOUT, check_database_lock};
use crate::backends::process_utils::{run_and_collect_output, run_probe};
use crate::backends::provider::{BackendContext, BackendProvider, BoxFuture};
use crate::execution::{CommandSpec, ProcessSpawnRequest, ProcessTerminationMode};
use crate::models::{BackendAction, BackendId, CoreError, CoreErrorKind, validate_package_name};
use crate::orchestration::CancellationToken;

const YAY_COMMAND: &str = "yay";
const CREDENTIAL_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub fn yay_query_request(program: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Yay,
        BackendAction::QueryInstalled,
        CommandSpec::new(program).arg("-Q").arg(package),
    )
    .timeout(QUERY_TIMEOUT)
    .termination(ProcessTerminationMode::Immediate)
}

pub fn yay_install_request(program: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Yay,
        BackendAction::Install,
        CommandSpec::new(program)
            .args(["-S", "--noconfirm", "--needed"])
            .arg(package)
            .env("LANG", "C")
            .env("LC_ALL", "C"),
    )
    .timeout(INSTALL_TIMEOUT)
}

/// `sudo -n true`: succeeds only when sudo will not prompt.
pub fn sudo_credential_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BackendId::Yay,
        BackendAction::Preflight,
        CommandSpec::new("sudo").arg("-n").arg("true"),
    )
    .timeout(CREDENTIAL_CHECK_TIMEOUT)
    .termination(ProcessTerminationMode::Immediate)
}

pub struct YayProvider {
    context: BackendContext,
    lock_path: PathBuf,
}

impl YayProvider {
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
            .find_executable(YAY_COMMAND)
            .unwrap_or_else(|| PathBuf::from(YAY_COMMAND))
    }

    async fn check_credentials(
        &self,
        package: &str,
        cancellation: &CancellationToken,
    ) -> Result<(), CoreError> {
        let output = run_and_collect_output(
            self.context.executor.as_ref(),
            sudo_credential_request(),
            cancellation,
        )
        .await;

        match output {
            Ok(output) if output.succeeded() => Ok(()),
            Err(error) if error.is_cancellation() => Err(error.package(package)),
            _ => {
                let mut message =
                    "sudo needs a password and no terminal is available to ask for it".to_string();
                if let Some(hint) = CoreErrorKind::PermissionDenied.remediation() {
                    message.push_str("\nhint: ");
                    message.push_str(hint);
                }
                Err(CoreError::new(CoreErrorKind::PermissionDenied, message)
                    .backend(BackendId::Yay)
                    .package(package)
                    .action(BackendAction::Preflight))
            }
        }
    }
}

impl BackendProvider for YayProvider {
    fn name(&self) -> &str {
        BackendId::Yay.name()
    }

    fn is_available(&self) -> bool {
        self.context.platform.is_linux()
            && self.context.platform.is_arch_like()
            && self.context.find_executable(YAY_COMMAND).is_some()
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if validate_package_name(package).is_err() {
                return false;
            }
            let request = yay_query_request(&self.program(), package);
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
            validate_package_name(package).map_err(|error| error.backend(BackendId::Yay))?;
            check_database_lock(BackendId::Yay, package, &self.lock_path)?;
            self.check_credentials(package, cancellation).await?;

            let request = yay_install_request(&self.program(), package);
            tracing::info!(package, command = %request.command.render(), "installing with yay");

            let output =
                run_and_collect_output(self.context.executor.as_ref(), request, cancellation)
                    .await
                    .map_err(|error| error.package(package))?;

            if output.succeeded() {
                Ok(())
            } else {
                Err(install_failure(BackendId::Yay, package, &output))
            }
        })
    }

    fn priority(&self) -> i32 {
        BackendId::Yay.priority()
    }

    fn parallel_safe(&self) -> bool {
        BackendId::Yay.parallel_safe()
    }
}
