use crate::execution::{ProcessExitStatus, ProcessOutput};
use crate::models::{BackendAction, BackendId, CoreError, CoreErrorKind};

use super::process_utils::output_tail;

const PERMISSION_MARKERS: &[&str] = &[
    "a password is required",
    "a terminal is required",
    "no tty present",
    "sudo: ",
    "incorrect password",
    "permission denied",
    "you cannot perform this operation unless you are root",
];

const LOCK_MARKERS: &[&str] = &["db.lck", "unable to lock database"];

const NETWORK_MARKERS: &[&str] = &[
    "failed to retrieve",
    "download failed",
    "could not resolve host",
    "failed retrieving file",
    "connection timed out",
    "0x80072ee7",
];

/// Maps package-manager output to an error kind. Lock conflicts are checked
/// before permission markers since pacman prints both when the lock is held.
pub fn classify_failure(output: &str) -> CoreErrorKind {
    let lowered = output.to_ascii_lowercase();
    let matches = |markers: &[&str]| markers.iter().any(|marker| lowered.contains(marker));

    if matches(LOCK_MARKERS) {
        CoreErrorKind::LockConflict
    } else if matches(NETWORK_MARKERS) {
        CoreErrorKind::NetworkFailure
    } else if matches(PERMISSION_MARKERS) {
        CoreErrorKind::PermissionDenied
    } else {
        CoreErrorKind::ProcessFailure
    }
}

pub(crate) fn install_failure(backend: BackendId, package: &str, output: &ProcessOutput) -> CoreError {
    let text = output.combined_text();
    let kind = classify_failure(&text);
    let status = match output.status {
        ProcessExitStatus::ExitCode(code) => format!("exited with code {code}"),
        ProcessExitStatus::Terminated => "was terminated by signal".to_string(),
    };

    let mut message = format!("{backend} install of {package} {status}");
    let tail = output_tail(&text, 5);
    if !tail.is_empty() {
        message.push_str(":\n");
        message.push_str(&tail);
    }
    if let Some(hint) = kind.remediation() {
        message.push_str("\nhint: ");
        message.push_str(hint);
    }

    CoreError::new(kind, message)
        .backend(backend)
        .package(package)
        .action(BackendAction::Install)
}
