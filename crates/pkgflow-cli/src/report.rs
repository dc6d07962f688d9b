use std::process::ExitCode;
use std::time::SystemTime;

use pkgflow_core::models::{CoreErrorKind, InstallResult};
use pkgflow_core::progress::render_summary_table;
use pkgflow_core::BatchOutcome;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NO_PROVIDER: u8 = 2;
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Serialize)]
pub struct InstallReport {
    pub finished_at: String,
    pub provider: Option<String>,
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub duration_ms: u128,
    pub error: Option<String>,
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub package: String,
    pub provider: Option<String>,
    pub status: &'static str,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl ResultEntry {
    fn from_result(result: &InstallResult) -> Self {
        let status = match (result.success, result.skipped, result.simulated) {
            (true, true, _) => "skipped",
            (true, false, true) => "dry-run",
            (true, false, false) => "installed",
            (false, _, _) if result.was_cancelled() => "cancelled",
            (false, _, _) => "failed",
        };

        Self {
            package: result.package.clone(),
            provider: result.provider.clone(),
            status,
            duration_ms: result.duration.as_millis(),
            error_kind: result.error.as_ref().map(|error| format!("{:?}", error.kind)),
            error: result.error.as_ref().map(|error| error.message.clone()),
            hint: result.error.as_ref().and_then(|error| error.kind.remediation()),
        }
    }
}

impl InstallReport {
    pub fn new(outcome: &BatchOutcome, provider: Option<&str>) -> Self {
        let summary = outcome.summary();
        Self {
            finished_at: timestamp(SystemTime::now()),
            provider: provider.map(str::to_string),
            installed: summary.successful,
            skipped: summary.skipped,
            failed: summary.failed,
            cancelled: summary.cancelled,
            duration_ms: summary.total_duration.as_millis(),
            error: outcome.error.as_ref().map(ToString::to_string),
            results: outcome.results.iter().map(ResultEntry::from_result).collect(),
        }
    }
}

pub fn timestamp(at: SystemTime) -> String {
    OffsetDateTime::from(at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

pub fn print_json(report: &InstallReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

pub fn print_text(outcome: &BatchOutcome) {
    let summary = outcome.summary();
    if summary.total > 0 {
        print!("{}", render_summary_table(&summary));
    }

    for result in &outcome.results {
        let Some(error) = &result.error else {
            continue;
        };
        if error.is_cancellation() {
            continue;
        }
        eprintln!("\n{}: {}", result.package, error.message);
    }

    if let Some(error) = &outcome.error {
        eprintln!("\n{error}");
    }
}

/// 130 when cancelled, 2 when no package manager was usable, 1 on any
/// other failure, 0 otherwise.
pub fn exit_code(outcome: &BatchOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

fn exit_status(outcome: &BatchOutcome) -> u8 {
    if outcome.was_cancelled() {
        return EXIT_CANCELLED;
    }

    let no_provider = outcome.results.iter().any(|result| {
        result
            .error
            .as_ref()
            .is_some_and(|error| error.kind == CoreErrorKind::NoProviderAvailable)
    });
    if no_provider {
        return EXIT_NO_PROVIDER;
    }

    if outcome.is_success() {
        0
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pkgflow_core::CoreError;

    use super::*;

    fn outcome(results: Vec<InstallResult>, error: Option<CoreError>) -> BatchOutcome {
        BatchOutcome { results, error }
    }

    #[test]
    fn exit_codes_rank_cancellation_then_missing_provider() {
        let ok = outcome(
            vec![
                InstallResult::installed("git", "pacman", Duration::ZERO),
                InstallResult::skipped("zsh", "pacman", Duration::ZERO),
            ],
            None,
        );
        assert_eq!(exit_status(&ok), 0);

        let failed = outcome(
            vec![InstallResult::failed(
                "git",
                Some("pacman"),
                CoreError::new(CoreErrorKind::ProcessFailure, "exit 1"),
                Duration::ZERO,
            )],
            None,
        );
        assert_eq!(exit_status(&failed), EXIT_FAILURE);

        let missing = outcome(
            vec![InstallResult::failed("git", None, CoreError::no_provider(), Duration::ZERO)],
            None,
        );
        assert_eq!(exit_status(&missing), EXIT_NO_PROVIDER);

        let cancelled = outcome(Vec::new(), Some(CoreError::cancelled("interrupted")));
        assert_eq!(exit_status(&cancelled), EXIT_CANCELLED);
    }

    #[test]
    fn report_serializes_status_and_hint() {
        let report = InstallReport::new(
            &outcome(
                vec![
                    InstallResult::simulated("fd", "pacman", Duration::from_millis(3)),
                    InstallResult::failed(
                        "git",
                        Some("pacman"),
                        CoreError::new(CoreErrorKind::LockConflict, "database locked"),
                        Duration::ZERO,
                    ),
                ],
                None,
            ),
            Some("pacman"),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["provider"], "pacman");
        assert_eq!(json["installed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][0]["status"], "dry-run");
        assert!(json["results"][0].get("error").is_none());
        assert_eq!(json["results"][1]["error_kind"], "LockConflict");
        assert!(json["results"][1]["hint"].is_string());
    }

    #[test]
    fn timestamp_is_rfc3339() {
        assert_eq!(timestamp(SystemTime::UNIX_EPOCH), "1970-01-01T00:00:00Z");
    }
}
