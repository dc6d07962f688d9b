use std::sync::Arc;

use crate::backends::{BackendContext, BackendProvider};
use crate::models::{CoreError, CoreErrorKind, InstallOptions, ParallelCapability};
use crate::orchestration::{BatchOutcome, CancellationToken, ParallelExecutor, SequentialExecutor};
use crate::progress::{BarRenderer, ProgressReporter, ProgressSender};
use crate::registry::ProviderRegistry;

/// Entry point for callers: picks sequential or parallel execution and
/// drives a progress reporter around the batch.
#[derive(Clone, Debug)]
pub struct PackageInstaller {
    registry: Arc<ProviderRegistry>,
}

impl PackageInstaller {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn with_default_backends(context: BackendContext) -> Self {
        Self::new(ProviderRegistry::with_default_backends(context))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn select_provider(&self) -> Option<Arc<dyn BackendProvider>> {
        self.registry.select_best()
    }

    pub fn check_parallel(&self, packages: &[String]) -> ParallelCapability {
        ParallelExecutor::new(self.registry.clone()).check_capability(packages)
    }

    /// Installs `packages`, rendering live progress unless quiet.
    pub async fn install(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
    ) -> BatchOutcome {
        if options.quiet {
            return self.run(packages, options, cancellation, None).await;
        }

        let renderer = BarRenderer::new(packages.len(), false).verbose(options.verbose);
        let mut reporter = ProgressReporter::new(renderer);
        self.install_with_reporter(packages, options, cancellation, &mut reporter)
            .await
    }

    pub async fn install_with_reporter(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
        reporter: &mut ProgressReporter,
    ) -> BatchOutcome {
        reporter.start();
        let outcome = self
            .run(packages, options, cancellation, Some(reporter.sender()))
            .await;
        reporter.close().await;
        outcome
    }

    /// Parallel install without fallback: fails with `InvalidInput` when the
    /// capability check does not pass.
    pub async fn install_parallel_checked(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
    ) -> Result<BatchOutcome, CoreError> {
        let executor = ParallelExecutor::new(self.registry.clone());
        let capability = executor.check_capability(packages);
        if !capability.supported {
            return Err(CoreError::new(CoreErrorKind::InvalidInput, capability.reason));
        }
        Ok(executor.install_many(packages, options, cancellation).await)
    }

    async fn run(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> BatchOutcome {
        let mut sequential = SequentialExecutor::new(self.registry.clone());
        if let Some(progress) = progress {
            sequential = sequential.with_progress(progress);
        }

        if options.parallel {
            let parallel = ParallelExecutor::from_sequential(sequential.clone());
            let capability = parallel.check_capability(packages);
            if capability.supported {
                return parallel.install_many(packages, options, cancellation).await;
            }
            tracing::warn!(
                reason = %capability.reason,
                "parallel install unavailable, installing sequentially"
            );
        }

        sequential.install_many(packages, options, cancellation).await
    }
}
