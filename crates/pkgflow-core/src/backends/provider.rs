use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::execution::{ProcessExecutor, TokioProcessExecutor};
use crate::models::{CoreError, PlatformInfo};
use crate::orchestration::CancellationToken;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A package manager the orchestrator can install through.
///
/// `is_installed` and `install` may be called concurrently from several
/// workers when `parallel_safe` returns true.
pub trait BackendProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this provider can run on the current host.
    fn is_available(&self) -> bool;

    /// Probes the host; any probe failure reads as "not installed".
    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool>;

    fn install<'a>(
        &'a self,
        package: &'a str,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), CoreError>>;

    /// Lower values are preferred.
    fn priority(&self) -> i32;

    fn parallel_safe(&self) -> bool {
        false
    }
}

/// Host facts and the process executor shared by the built-in backends.
#[derive(Clone)]
pub struct BackendContext {
    pub platform: PlatformInfo,
    pub executor: Arc<dyn ProcessExecutor>,
    pub search_path: Option<OsString>,
}

impl BackendContext {
    pub fn new(platform: PlatformInfo, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            platform,
            executor,
            search_path: std::env::var_os("PATH"),
        }
    }

    pub fn detect() -> Self {
        Self::new(crate::platform::detect(), Arc::new(TokioProcessExecutor))
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn find_executable(&self, binary_name: &str) -> Option<PathBuf> {
        super::detect_utils::find_executable(binary_name, self.search_path.as_deref())
    }
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("platform", &self.platform)
            .field("search_path", &self.search_path)
            .finish_non_exhaustive()
    }
}
