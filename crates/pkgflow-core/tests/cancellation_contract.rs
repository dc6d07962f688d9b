mod support;

use std::sync::Arc;
use std::time::Duration;

use pkgflow_core::models::{InstallOptions, InstallOutcome};
use pkgflow_core::orchestration::{CancellationToken, SequentialExecutor};
use pkgflow_core::registry::ProviderRegistry;

use support::{MockProvider, packages};

#[tokio::test(start_paused = true)]
async fn deadline_interrupts_in_flight_install() {
    let provider = Arc::new(
        MockProvider::new("pacman", 1)
            .default_delay(Duration::from_secs(10))
            .delay("huge", Duration::from_secs(600)),
    );
    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone());
    let executor = SequentialExecutor::new(Arc::new(registry));

    let cancellation = CancellationToken::new();
    let timer = cancellation.cancel_after(Duration::from_secs(60));

    let outcome = executor
        .install_many(
            &packages(&["git", "huge", "zsh"]),
            &InstallOptions::new(),
            &cancellation,
        )
        .await;
    timer.await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].outcome(), InstallOutcome::Installed);
    assert_eq!(outcome.results[1].outcome(), InstallOutcome::Cancelled);
    assert!(outcome.was_cancelled());
    assert_eq!(provider.install_calls(), vec!["git", "huge"]);
}

#[tokio::test]
async fn cancelled_waiters_across_clones_all_wake() {
    let token = CancellationToken::new();
    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        })
        .collect();

    tokio::task::yield_now().await;
    token.cancel();

    for waiter in waiters {
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
