#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use pkgflow_core::backends::{BackendProvider, BoxFuture};
use pkgflow_core::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use pkgflow_core::models::{CoreError, CoreErrorKind};
use pkgflow_core::orchestration::CancellationToken;

/// Routes core logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn packages(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// In-memory provider with scripted installed state, failures and delays.
pub struct MockProvider {
    name: String,
    priority: i32,
    parallel_safe: bool,
    available: AtomicBool,
    installed: Mutex<HashSet<String>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    install_calls: Mutex<Vec<String>>,
    probe_calls: AtomicUsize,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            parallel_safe: false,
            available: AtomicBool::new(true),
            installed: Mutex::new(HashSet::new()),
            failing: HashSet::new(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            install_calls: Mutex::new(Vec::new()),
            probe_calls: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn parallel_safe(mut self) -> Self {
        self.parallel_safe = true;
        self
    }

    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    pub fn installed(self, names: &[&str]) -> Self {
        self.installed
            .lock()
            .unwrap()
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing.extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn install_calls(&self) -> Vec<String> {
        self.install_calls.lock().unwrap().clone()
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl BackendProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.probe_calls.fetch_add(1, Ordering::SeqCst);
            self.installed.lock().unwrap().contains(package)
        })
    }

    fn install<'a>(
        &'a self,
        package: &'a str,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            self.install_calls.lock().unwrap().push(package.to_string());
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self
                .delays
                .get(package)
                .copied()
                .unwrap_or(self.default_delay);
            let interrupted = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = cancellation.cancelled() => true,
            };
            self.current.fetch_sub(1, Ordering::SeqCst);

            if interrupted {
                return Err(CoreError::cancelled("install interrupted").package(package));
            }
            if self.failing.contains(package) {
                return Err(CoreError::new(
                    CoreErrorKind::ProcessFailure,
                    format!("error: target not found: {package}"),
                )
                .package(package));
            }

            self.installed.lock().unwrap().insert(package.to_string());
            Ok(())
        })
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parallel_safe(&self) -> bool {
        self.parallel_safe
    }
}

type Responder = dyn Fn(&ProcessSpawnRequest) -> (i32, String, String) + Send + Sync;

/// Process executor that records every request and answers from a script.
pub struct ScriptedExecutor {
    requests: Mutex<Vec<ProcessSpawnRequest>>,
    responder: Box<Responder>,
}

impl ScriptedExecutor {
    pub fn new(
        responder: impl Fn(&ProcessSpawnRequest) -> (i32, String, String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub fn always(code: i32, stdout: &str, stderr: &str) -> Self {
        let stdout = stdout.to_string();
        let stderr = stderr.to_string();
        Self::new(move |_| (code, stdout.clone(), stderr.clone()))
    }

    pub fn requests(&self) -> Vec<ProcessSpawnRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Commands as `program args...`, with the program reduced to its file name.
    pub fn rendered(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| {
                let program = request
                    .command
                    .program
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                std::iter::once(program)
                    .chain(request.command.args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

struct FakeProcess {
    output: ProcessOutput,
}

impl RunningProcess for FakeProcess {
    fn wait(self: Box<Self>, cancellation: CancellationToken) -> ProcessWaitFuture {
        let output = self.output;
        Box::pin(async move {
            if cancellation.is_cancelled() {
                return Err(CoreError::cancelled("process cancelled"));
            }
            Ok(output)
        })
    }
}

impl ProcessExecutor for ScriptedExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let (code, stdout, stderr) = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);

        let now = SystemTime::now();
        Ok(Box::new(FakeProcess {
            output: ProcessOutput {
                status: ProcessExitStatus::ExitCode(code),
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
                started_at: now,
                finished_at: now,
            },
        }))
    }
}

pub fn unique_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "pkgflow-{label}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Directory holding empty executables with the given names.
#[cfg(unix)]
pub fn fake_bin_dir(label: &str, binaries: &[&str]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = unique_temp_dir(label);
    for binary in binaries {
        let path = dir.join(binary);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    dir
}

pub fn touch(path: &Path) {
    std::fs::write(path, b"").unwrap();
}
