pub mod cancellation;
pub mod installer;
pub mod parallel;
pub mod sequential;

pub use cancellation::CancellationToken;
pub use installer::PackageInstaller;
pub use parallel::{ParallelExecutor, WORKER_CAP, optimal_worker_count, optimal_worker_count_for};
pub use sequential::SequentialExecutor;

use crate::models::{CoreError, InstallOutcome, InstallResult};
use crate::progress::InstallSummary;

/// Results of one batch plus the error that stopped it, if any. Package
/// failures live in the results; `error` is reserved for cancellation and
/// worker-pool failures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub results: Vec<InstallResult>,
    pub error: Option<CoreError>,
}

impl BatchOutcome {
    pub fn count(&self, outcome: InstallOutcome) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome() == outcome)
            .count()
    }

    pub fn installed_count(&self) -> usize {
        self.count(InstallOutcome::Installed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(InstallOutcome::Skipped)
    }

    pub fn failed_count(&self) -> usize {
        self.count(InstallOutcome::Failed)
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(InstallOutcome::Cancelled)
    }

    pub fn was_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(CoreError::is_cancellation) || self.cancelled_count() > 0
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.results.iter().all(|result| result.success)
    }

    pub fn summary(&self) -> InstallSummary {
        InstallSummary::from_results(self.results.iter().cloned())
    }
}
