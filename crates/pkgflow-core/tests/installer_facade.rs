mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pkgflow_core::models::{CoreErrorKind, InstallOptions};
use pkgflow_core::orchestration::{CancellationToken, PackageInstaller, SequentialExecutor};
use pkgflow_core::progress::{EventSink, ProgressEvent, ProgressEventKind, ProgressReporter};
use pkgflow_core::registry::ProviderRegistry;

use support::{MockProvider, packages};

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl EventSink for RecordingSink {
    fn handle(&mut self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn installer_with(provider: Arc<MockProvider>) -> PackageInstaller {
    let mut registry = ProviderRegistry::new();
    registry.register(provider);
    PackageInstaller::new(registry)
}

#[tokio::test]
async fn reporter_sees_start_and_terminal_event_per_package() {
    let provider = Arc::new(MockProvider::new("pacman", 1).installed(&["git"]));
    let installer = installer_with(provider);
    let sink = RecordingSink::default();
    let mut reporter = ProgressReporter::new(sink.clone());

    let outcome = installer
        .install_with_reporter(
            &packages(&["git", "zsh"]),
            &InstallOptions::new(),
            &CancellationToken::new(),
            &mut reporter,
        )
        .await;

    assert!(outcome.is_success());
    let kinds: Vec<(String, ProgressEventKind)> = sink
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|e| (e.package.clone(), e.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("git".to_string(), ProgressEventKind::Start),
            ("git".to_string(), ProgressEventKind::Skip),
            ("zsh".to_string(), ProgressEventKind::Start),
            ("zsh".to_string(), ProgressEventKind::Success),
        ]
    );

    let summary = reporter.summary();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.successful, 1);
}

#[tokio::test]
async fn summary_tracks_each_package_as_it_finishes() {
    let provider = Arc::new(MockProvider::new("pacman", 1).installed(&["git"]));
    let mut registry = ProviderRegistry::new();
    registry.register(provider);
    let mut reporter = ProgressReporter::new(RecordingSink::default());
    reporter.start();
    let executor =
        SequentialExecutor::new(Arc::new(registry)).with_progress(reporter.sender());
    let options = InstallOptions::new();
    let cancellation = CancellationToken::new();

    executor.install_one("git", &options, &cancellation).await;
    let summary = reporter.summary();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);

    executor.install_one("zsh", &options, &cancellation).await;
    let summary = reporter.summary();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);

    reporter.close().await;
}

#[tokio::test]
async fn parallel_request_falls_back_for_lock_holding_provider() {
    support::init_tracing();
    let provider = Arc::new(MockProvider::new("pacman", 1));
    let installer = installer_with(provider.clone());

    let outcome = installer
        .install(
            &packages(&["git", "zsh", "neovim"]),
            &InstallOptions::new().parallel(true).quiet(true),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(provider.install_calls(), vec!["git", "zsh", "neovim"]);
    assert_eq!(provider.peak_concurrency(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_request_uses_pool_for_parallel_safe_provider() {
    let provider = Arc::new(
        MockProvider::new("winget", 2)
            .parallel_safe()
            .default_delay(Duration::from_millis(50)),
    );
    let installer = installer_with(provider.clone());
    let requested: Vec<String> = (0..6).map(|i| format!("Vendor.Pkg{i}")).collect();

    let outcome = installer
        .install(
            &requested,
            &InstallOptions::new().parallel(true).quiet(true).max_workers(3),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.results.len(), 6);
    assert!(outcome.is_success());
    assert!(provider.peak_concurrency() > 1);
}

#[tokio::test]
async fn checked_parallel_refuses_without_fallback() {
    let provider = Arc::new(MockProvider::new("pacman", 1));
    let installer = installer_with(provider.clone());

    let error = installer
        .install_parallel_checked(
            &packages(&["git", "zsh"]),
            &InstallOptions::new(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("pacman is not parallel-safe");

    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert!(provider.install_calls().is_empty());
}

#[tokio::test]
async fn no_provider_is_reported_through_the_facade() {
    let installer = PackageInstaller::new(ProviderRegistry::new());
    assert!(installer.select_provider().is_none());

    let outcome = installer
        .install(
            &packages(&["git"]),
            &InstallOptions::new().quiet(true),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(
        outcome.results[0].error.as_ref().map(|e| e.kind),
        Some(CoreErrorKind::NoProviderAvailable)
    );
}
