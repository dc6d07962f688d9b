use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;

use crate::models::{CoreError, CoreErrorKind, InstallOptions, InstallResult, ParallelCapability};
use crate::orchestration::{BatchOutcome, CancellationToken, SequentialExecutor};
use crate::progress::ProgressSender;
use crate::registry::ProviderRegistry;

/// Upper bound on concurrent installs, including explicit `max_workers`.
pub const WORKER_CAP: usize = 16;

pub fn optimal_worker_count(package_count: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);
    optimal_worker_count_for(package_count, cpus)
}

/// 1 for two or fewer packages, one per package up to the CPU count, and
/// `floor(1.5 * cpus)` beyond that.
pub fn optimal_worker_count_for(package_count: usize, cpus: usize) -> usize {
    let cpus = cpus.max(1);
    if package_count <= 2 {
        1
    } else if package_count <= cpus {
        package_count
    } else {
        cpus * 3 / 2
    }
}

/// Bounded worker pool over a shared queue. Results keep their package
/// association but arrive in completion order.
#[derive(Clone, Debug)]
pub struct ParallelExecutor {
    installer: SequentialExecutor,
}

impl ParallelExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            installer: SequentialExecutor::new(registry),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.installer = self.installer.with_progress(progress);
        self
    }

    pub(crate) fn from_sequential(installer: SequentialExecutor) -> Self {
        Self { installer }
    }

    pub fn check_capability(&self, packages: &[String]) -> ParallelCapability {
        let Some(provider) = self.installer.registry().select_best() else {
            return ParallelCapability::unsupported("no package manager available");
        };

        if !provider.parallel_safe() {
            return ParallelCapability::unsupported(format!(
                "{} holds an exclusive package database lock and cannot install in parallel",
                provider.name()
            ));
        }

        if packages.len() < 2 {
            return ParallelCapability::unsupported(
                "parallel install needs at least 2 packages",
            );
        }

        ParallelCapability::supported(
            optimal_worker_count(packages.len())
                .min(WORKER_CAP)
                .min(packages.len()),
        )
    }

    pub fn worker_count(&self, package_count: usize, options: &InstallOptions) -> usize {
        let requested = if options.max_workers > 0 {
            options.max_workers
        } else {
            optimal_worker_count(package_count)
        };
        requested.min(WORKER_CAP).min(package_count).max(1)
    }

    /// Runs every package through the four-step install on a pool of
    /// workers. Does not check capability or fall back to sequential.
    pub async fn install_many(
        &self,
        packages: &[String],
        options: &InstallOptions,
        cancellation: &CancellationToken,
    ) -> BatchOutcome {
        if packages.is_empty() {
            return BatchOutcome::default();
        }

        let workers = self.worker_count(packages.len(), options);
        tracing::info!(packages = packages.len(), workers, "starting parallel install");

        let queue = Arc::new(Mutex::new(packages.iter().cloned().collect::<VecDeque<_>>()));
        let results: Arc<Mutex<Vec<InstallResult>>> =
            Arc::new(Mutex::new(Vec::with_capacity(packages.len())));

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let installer = self.installer.clone();
            let queue = queue.clone();
            let results = results.clone();
            let options = *options;
            let cancellation = cancellation.clone();

            pool.spawn(async move {
                loop {
                    if cancellation.is_cancelled() {
                        tracing::debug!(worker, "worker stopping on cancellation");
                        break;
                    }

                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some(package) = next else {
                        break;
                    };

                    let result = installer.install_one(&package, &options, &cancellation).await;
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(result);
                }
            });
        }

        let mut error = None;
        while let Some(joined) = pool.join_next().await {
            if let Err(join_error) = joined {
                tracing::error!(%join_error, "install worker failed");
                error.get_or_insert_with(|| {
                    CoreError::new(
                        CoreErrorKind::Internal,
                        format!("install worker failed: {join_error}"),
                    )
                });
            }
        }

        if error.is_none() && cancellation.is_cancelled() {
            error = Some(CoreError::cancelled("installation cancelled"));
        }

        let results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        BatchOutcome { results, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batches_use_one_worker() {
        assert_eq!(optimal_worker_count_for(0, 8), 1);
        assert_eq!(optimal_worker_count_for(1, 8), 1);
        assert_eq!(optimal_worker_count_for(2, 8), 1);
    }

    #[test]
    fn batches_within_cpu_count_get_one_worker_each() {
        assert_eq!(optimal_worker_count_for(3, 8), 3);
        assert_eq!(optimal_worker_count_for(8, 8), 8);
    }

    #[test]
    fn large_batches_use_one_and_a_half_workers_per_cpu() {
        assert_eq!(optimal_worker_count_for(9, 8), 12);
        assert_eq!(optimal_worker_count_for(100, 4), 6);
        assert_eq!(optimal_worker_count_for(10, 3), 4);
    }

    #[test]
    fn explicit_workers_are_capped() {
        let executor = ParallelExecutor::new(Arc::new(ProviderRegistry::new()));
        let options = InstallOptions::new().max_workers(64);
        assert_eq!(executor.worker_count(100, &options), WORKER_CAP);
        assert_eq!(executor.worker_count(3, &options), 3);
        assert_eq!(
            executor.worker_count(5, &InstallOptions::new().max_workers(2)),
            2
        );
    }
}
