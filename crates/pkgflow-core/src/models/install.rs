use std::time::Duration;

use serde::Deserialize;

use crate::models::{CoreError, CoreErrorKind};

/// Rejects names a backend would parse as something other than a single
/// package: empty, option-like (`-Syu`), or containing whitespace or control
/// characters.
pub fn validate_package_name(package: &str) -> Result<(), CoreError> {
    let reason = if package.is_empty() {
        "package name must not be empty"
    } else if package.starts_with('-') {
        "package name must not start with '-'"
    } else if package
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        "package name must not contain whitespace or control characters"
    } else {
        return Ok(());
    };

    Err(CoreError::new(
        CoreErrorKind::InvalidInput,
        format!("invalid package name '{}': {reason}", package.escape_debug()),
    )
    .package(package))
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Reinstall packages that are already present. A forced batch also keeps
    /// going after a failed package.
    pub force: bool,
    /// Keep going after a failed package without forcing reinstalls.
    pub keep_going: bool,
    pub dry_run: bool,
    /// Show full backend output for failed packages in live progress.
    pub verbose: bool,
    pub quiet: bool,
    pub parallel: bool,
    /// Worker count override for parallel installs; 0 picks automatically.
    pub max_workers: usize,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn continues_past_failure(&self) -> bool {
        self.force || self.keep_going
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstallResult {
    pub package: String,
    pub provider: Option<String>,
    pub success: bool,
    pub skipped: bool,
    pub simulated: bool,
    pub error: Option<CoreError>,
    pub duration: Duration,
}

impl InstallResult {
    pub fn installed(package: &str, provider: &str, duration: Duration) -> Self {
        Self {
            package: package.to_string(),
            provider: Some(provider.to_string()),
            success: true,
            skipped: false,
            simulated: false,
            error: None,
            duration,
        }
    }

    pub fn skipped(package: &str, provider: &str, duration: Duration) -> Self {
        Self {
            skipped: true,
            ..Self::installed(package, provider, duration)
        }
    }

    pub fn simulated(package: &str, provider: &str, duration: Duration) -> Self {
        Self {
            simulated: true,
            ..Self::installed(package, provider, duration)
        }
    }

    pub fn failed(
        package: &str,
        provider: Option<&str>,
        error: CoreError,
        duration: Duration,
    ) -> Self {
        Self {
            package: package.to_string(),
            provider: provider.map(str::to_string),
            success: false,
            skipped: false,
            simulated: false,
            error: Some(error),
            duration,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(CoreError::is_cancellation)
    }

    pub fn outcome(&self) -> InstallOutcome {
        match (self.success, self.skipped) {
            (true, true) => InstallOutcome::Skipped,
            (true, false) => InstallOutcome::Installed,
            (false, _) if self.was_cancelled() => InstallOutcome::Cancelled,
            (false, _) => InstallOutcome::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InstallOutcome {
    Installed,
    Skipped,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParallelCapability {
    pub supported: bool,
    pub recommended_workers: usize,
    pub reason: String,
}

impl ParallelCapability {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            recommended_workers: 1,
            reason: reason.into(),
        }
    }

    pub fn supported(recommended_workers: usize) -> Self {
        Self {
            supported: true,
            recommended_workers,
            reason: format!("parallel install supported, {recommended_workers} worker(s) recommended"),
        }
    }
}
