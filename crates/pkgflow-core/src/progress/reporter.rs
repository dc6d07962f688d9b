use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::models::{InstallOutcome, InstallResult};
use crate::progress::ProgressEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Consumer side of the reporter; runs on the reporter's task.
pub trait EventSink: Send + 'static {
    fn handle(&mut self, event: &ProgressEvent);

    fn finish(&mut self) {}
}

enum ReporterMessage {
    Event(ProgressEvent),
    Close,
}

type ResultMap = Arc<Mutex<HashMap<String, InstallResult>>>;

/// Cloneable, non-blocking handle for emitting events.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ReporterMessage>,
    closed: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    results: ResultMap,
}

impl ProgressSender {
    /// Queues `event`, or drops it when the queue is full or the reporter has
    /// been closed. Events sent before `start` wait in the queue. Returns
    /// whether the event was queued.
    pub fn send(&self, event: ProgressEvent) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(
                package = %event.package,
                kind = ?event.kind,
                "progress reporter is closed; dropping event"
            );
            return false;
        }

        match self.tx.try_send(ReporterMessage::Event(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(ReporterMessage::Event(event))) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    package = %event.package,
                    kind = ?event.kind,
                    "progress queue is full; dropping event"
                );
                false
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("progress channel closed; dropping event");
                false
            }
        }
    }

    /// Stores the final result for a package; a later record replaces an
    /// earlier one. Never dropped, unlike events.
    pub fn record(&self, result: &InstallResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(result.package.clone(), result.clone());
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

pub struct ProgressReporter {
    tx: mpsc::Sender<ReporterMessage>,
    rx: Option<mpsc::Receiver<ReporterMessage>>,
    sink: Option<Box<dyn EventSink>>,
    consumer: Option<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    results: ResultMap,
}

impl ProgressReporter {
    pub fn new(sink: impl EventSink) -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY, sink)
    }

    pub fn with_capacity(capacity: usize, sink: impl EventSink) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Some(rx),
            sink: Some(Box::new(sink)),
            consumer: None,
            closed: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicUsize::new(0)),
            results: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawns the consumer task. A reporter starts at most once.
    pub fn start(&mut self) {
        let (Some(mut rx), Some(mut sink)) = (self.rx.take(), self.sink.take()) else {
            return;
        };

        self.consumer = Some(tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    ReporterMessage::Event(event) => sink.handle(&event),
                    ReporterMessage::Close => break,
                }
            }
            sink.finish();
        }));
    }

    pub fn is_running(&self) -> bool {
        self.consumer.is_some()
    }

    pub fn sender(&self) -> ProgressSender {
        ProgressSender {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
            dropped: self.dropped.clone(),
            results: self.results.clone(),
        }
    }

    pub fn send(&self, event: ProgressEvent) -> bool {
        self.sender().send(event)
    }

    /// Handles every event queued so far, then stops consumption.
    pub async fn close(&mut self) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };

        self.closed.store(true, Ordering::SeqCst);
        if self.tx.send(ReporterMessage::Close).await.is_err() {
            tracing::warn!("progress consumer exited before close");
        }
        if let Err(error) = consumer.await {
            tracing::error!(%error, "progress consumer task failed");
        }
    }

    pub fn dropped_events(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn record(&self, result: &InstallResult) {
        self.sender().record(result);
    }

    pub fn summary(&self) -> InstallSummary {
        let results = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect::<Vec<_>>();
        InstallSummary::from_results(results)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub total_duration: Duration,
    /// Sorted by package name.
    pub results: Vec<InstallResult>,
}

impl InstallSummary {
    pub fn from_results(results: impl IntoIterator<Item = InstallResult>) -> Self {
        let mut results: Vec<InstallResult> = results.into_iter().collect();
        results.sort_by(|a, b| a.package.cmp(&b.package));

        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in &results {
            summary.total_duration += result.duration;
            match result.outcome() {
                InstallOutcome::Installed => summary.successful += 1,
                InstallOutcome::Skipped => summary.skipped += 1,
                InstallOutcome::Failed => summary.failed += 1,
                InstallOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}
