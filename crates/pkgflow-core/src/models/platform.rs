#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
    Other(String),
}

impl OsFamily {
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlatformInfo {
    pub os_family: OsFamily,
    pub distribution_id: Option<String>,
    pub distribution_like: Vec<String>,
}

impl PlatformInfo {
    pub fn new(os_family: OsFamily) -> Self {
        Self {
            os_family,
            distribution_id: None,
            distribution_like: Vec::new(),
        }
    }

    pub fn linux(distribution_id: impl Into<String>) -> Self {
        Self {
            os_family: OsFamily::Linux,
            distribution_id: Some(distribution_id.into()),
            distribution_like: Vec::new(),
        }
    }

    pub fn windows() -> Self {
        Self::new(OsFamily::Windows)
    }

    pub fn like(mut self, family: impl Into<String>) -> Self {
        self.distribution_like.push(family.into());
        self
    }

    pub fn is_linux(&self) -> bool {
        self.os_family == OsFamily::Linux
    }

    pub fn is_windows(&self) -> bool {
        self.os_family == OsFamily::Windows
    }

    pub fn is_arch_like(&self) -> bool {
        if !self.is_linux() {
            return false;
        }

        self.distribution_id.as_deref() == Some("arch")
            || self.distribution_like.iter().any(|like| like == "arch")
    }
}
