use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendId {
    Yay,
    Pacman,
    Winget,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [BackendId::Yay, BackendId::Pacman, BackendId::Winget];

    pub fn name(self) -> &'static str {
        match self {
            Self::Yay => "yay",
            Self::Pacman => "pacman",
            Self::Winget => "winget",
        }
    }

    pub fn kind(self) -> BackendKind {
        match self {
            Self::Yay => BackendKind::AurHelper,
            Self::Pacman => BackendKind::NativeRepository,
            Self::Winget => BackendKind::PlatformDefault,
        }
    }

    /// Lower is preferred.
    pub fn priority(self) -> i32 {
        match self.kind() {
            BackendKind::AurHelper => 0,
            BackendKind::NativeRepository => 1,
            BackendKind::PlatformDefault => 2,
        }
    }

    /// pacman-based backends hold the database lock for a whole transaction.
    pub fn parallel_safe(self) -> bool {
        match self {
            Self::Yay | Self::Pacman => false,
            Self::Winget => true,
        }
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendKind {
    AurHelper,
    NativeRepository,
    PlatformDefault,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendAction {
    Detect,
    QueryInstalled,
    Preflight,
    Install,
}
