use std::sync::Arc;
use std::time::Instant;

use crate::models::{CoreError, InstallOptions, InstallResult, validate_package_name};
use crate::orchestration::{BatchOutcome, CancellationToken};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::registry::ProviderRegistry;

#[derive(Clone, Debug)]
pub struct SequentialExecutor {
    registry: Arc<ProviderRegistry>,
    progress: Option<ProgressSender>,
}

impl SequentialExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Installs one package through the best available provider. Never
    /// panics; every failure is reported in the returned result.
    pub async fn install_one(
        &self,
        package: &str,
        options: &InstallOptions,
        cancellation: &CancellationToken,
    ) -> InstallResult {
        let started = Instant::now();

        let Some(provider) = self.registry.select_best() else {
            tracing::error!(package, "no package manager available");
            self.emit(ProgressEvent::start(package, "none"));
            let result = InstallResult::failed(
                package,
                None,
                CoreError::no_provider().package(package),
                started.elapsed(),
            );
            self.finish(&result);
            return result;
        };
        let provider_name = provider.name();
        self.emit(ProgressEvent::start(package, provider_name));

        let result = if let Err(error) = validate_package_name(package) {
            tracing::error!(
                package,
                provider = provider_name,
                message = %error.message,
                "rejected package name"
            );
            InstallResult::failed(package, Some(provider_name), error, started.elapsed())
        } else if !options.force && provider.is_installed(package).await {
            tracing::info!(package, provider = provider_name, "already installed, skipping");
            InstallResult::skipped(package, provider_name, started.elapsed())
        } else if options.dry_run {
            tracing::info!(package, provider = provider_name, "dry run: would install");
            InstallResult::simulated(package, provider_name, started.elapsed())
        } else if cancellation.is_cancelled() {
            InstallResult::failed(
                package,
                Some(provider_name),
                CoreError::cancelled("installation cancelled").package(package),
                started.elapsed(),
            )
        } else {
            match provider.install(package, cancellation).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    tracing::info!(
                        package,
                        provider = provider_name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "installed"
                    );
                    InstallResult::installed(package, provider_name, elapsed)
                }
                Err(error) => {
                    if error.is_cancellation() {
                        tracing::warn!(package, provider = provider_name, "install cancelled");
                    } else {
                        tracing::error!(
                            package,
                            provider = provider_name,
                            kind = ?error.kind,
                            message = %error.message,
                            "install failed"
                        );
                    }
                    InstallResult::failed(package, Some(provider_name), error, started.elapsed())
                }
            }
        };

        self.finish(&result);
        result
    }

    /// Installs `packages` in input order. Stops after the first failure
    /// unless the options continue past failures, and before the next
    /// package once `cancellation` fires.
    pub async fn install_many(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            results: Vec::with_capacity(packages.len()),
            error: None,
        };

        for package in packages {
            if cancellation.is_cancelled() {
                tracing::warn!(
                    remaining = packages.len() - outcome.results.len(),
                    "installation cancelled"
                );
                outcome.error = Some(CoreError::cancelled("installation cancelled"));
                return outcome;
            }

            let result = self.install_one(package, options, cancellation).await;
            let cancelled = result.was_cancelled();
            let failed = !result.success;
            outcome.results.push(result);

            if cancelled {
                outcome.error = Some(CoreError::cancelled("installation cancelled"));
                return outcome;
            }
            if failed && !options.continues_past_failure() {
                tracing::error!(
                    package = %package,
                    remaining = packages.len() - outcome.results.len(),
                    "stopping after failed package; use --keep-going or --force to continue"
                );
                break;
            }
        }

        outcome
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress.send(event);
        }
    }

    fn finish(&self, result: &InstallResult) {
        if let Some(progress) = &self.progress {
            progress.record(result);
            progress.send(ProgressEvent::from_result(result));
        }
    }
}
