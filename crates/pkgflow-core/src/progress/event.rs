use std::time::SystemTime;

use crate::models::{CoreError, InstallResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProgressEventKind {
    Start,
    Success,
    Fail,
    Skip,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub kind: ProgressEventKind,
    pub package: String,
    pub provider: String,
    pub message: Option<String>,
    pub error: Option<CoreError>,
    pub timestamp: SystemTime,
}

impl ProgressEvent {
    pub fn new(kind: ProgressEventKind, package: &str, provider: &str) -> Self {
        Self {
            kind,
            package: package.to_string(),
            provider: provider.to_string(),
            message: None,
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn start(package: &str, provider: &str) -> Self {
        Self::new(ProgressEventKind::Start, package, provider)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: CoreError) -> Self {
        self.error = Some(error);
        self
    }

    /// Terminal event for a finished package.
    pub fn from_result(result: &InstallResult) -> Self {
        let provider = result.provider.as_deref().unwrap_or("none");

        if result.skipped {
            return Self::new(ProgressEventKind::Skip, &result.package, provider)
                .message("already installed");
        }

        if result.success {
            let event = Self::new(ProgressEventKind::Success, &result.package, provider);
            return if result.simulated {
                event.message("dry run")
            } else {
                event
            };
        }

        let event = Self::new(ProgressEventKind::Fail, &result.package, provider);
        match &result.error {
            Some(error) => event.message(error.message.clone()).error(error.clone()),
            None => event,
        }
    }
}
