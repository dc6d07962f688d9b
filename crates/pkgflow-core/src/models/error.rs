use crate::models::{BackendAction, BackendId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    NoProviderAvailable,
    InvalidInput,
    Timeout,
    Cancelled,
    PermissionDenied,
    LockConflict,
    NetworkFailure,
    ProcessFailure,
    Internal,
}

impl CoreErrorKind {
    pub fn is_cancellation(self) -> bool {
        self == Self::Cancelled
    }

    pub fn remediation(self) -> Option<&'static str> {
        match self {
            Self::NoProviderAvailable => Some(
                "install a supported package manager (yay, pacman or winget) and make sure it is on PATH",
            ),
            Self::PermissionDenied => Some(
                "run from an interactive terminal, refresh sudo credentials with `sudo -v`, \
                 or allow passwordless sudo for the package manager",
            ),
            Self::LockConflict => Some(
                "wait for the other package manager instance to finish; if none is running, \
                 remove the stale lock file yourself and retry",
            ),
            Self::NetworkFailure => Some("check the network connection and mirror list, then retry"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub backend: Option<BackendId>,
    pub package: Option<String>,
    pub action: Option<BackendAction>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            backend: None,
            package: None,
            action: None,
            kind,
            message: message.into(),
        }
    }

    pub fn backend(mut self, backend: BackendId) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn action(mut self, action: BackendAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn no_provider() -> Self {
        Self::new(
            CoreErrorKind::NoProviderAvailable,
            "no package manager available",
        )
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Cancelled, message)
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind.is_cancellation()
    }
}
