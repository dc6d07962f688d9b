use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::models::InstallOutcome;
use crate::progress::{EventSink, InstallSummary, ProgressEvent, ProgressEventKind};

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

/// Live terminal rendering of progress events.
pub struct BarRenderer {
    bar: ProgressBar,
    verbose: bool,
}

impl BarRenderer {
    pub fn new(total: usize, quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
                verbose: false,
            };
        }

        let bar = ProgressBar::new(total as u64);
        match ProgressStyle::with_template(BAR_TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(error) => tracing::warn!(%error, "invalid progress bar template"),
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            verbose: false,
        }
    }

    /// Prints the whole failure text, backend output and hint included,
    /// instead of its first line.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn failure_line(event: &ProgressEvent, verbose: bool) -> String {
    let message = event.message.as_deref().unwrap_or("failed");
    let reason = if verbose {
        message
    } else {
        message.lines().next().unwrap_or("failed")
    };
    format!("✗ {}: {reason}", event.package)
}

impl EventSink for BarRenderer {
    fn handle(&mut self, event: &ProgressEvent) {
        match event.kind {
            ProgressEventKind::Start => {
                self.bar
                    .set_message(format!("{} via {}", event.package, event.provider));
            }
            ProgressEventKind::Success => {
                self.bar.inc(1);
                let note = event
                    .message
                    .as_deref()
                    .map(|message| format!(" ({message})"))
                    .unwrap_or_default();
                self.bar
                    .println(format!("✓ {} [{}]{note}", event.package, event.provider));
            }
            ProgressEventKind::Skip => {
                self.bar.inc(1);
                self.bar
                    .println(format!("- {} already installed", event.package));
            }
            ProgressEventKind::Fail => {
                self.bar.inc(1);
                self.bar.println(failure_line(event, self.verbose));
            }
        }
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

pub fn render_summary_table(summary: &InstallSummary) -> String {
    let name_width = summary
        .results
        .iter()
        .map(|result| result.package.len())
        .max()
        .unwrap_or(0)
        .max("PACKAGE".len());

    let mut out = format!(
        "{:<name_width$}  {:<9}  {:<8}  {:>8}\n",
        "PACKAGE", "STATUS", "PROVIDER", "TIME"
    );

    for result in &summary.results {
        let status = match result.outcome() {
            InstallOutcome::Installed if result.simulated => "dry-run",
            InstallOutcome::Installed => "installed",
            InstallOutcome::Skipped => "skipped",
            InstallOutcome::Failed => "failed",
            InstallOutcome::Cancelled => "cancelled",
        };
        out.push_str(&format!(
            "{:<name_width$}  {:<9}  {:<8}  {:>7.1}s\n",
            result.package,
            status,
            result.provider.as_deref().unwrap_or("-"),
            result.duration.as_secs_f64(),
        ));
    }

    out.push_str(&format!(
        "\n{} total: {} installed, {} skipped, {} failed, {} cancelled in {:.1}s\n",
        summary.total,
        summary.successful,
        summary.skipped,
        summary.failed,
        summary.cancelled,
        summary.total_duration.as_secs_f64(),
    ));
    out
}
