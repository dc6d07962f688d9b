use std::path::Path;

use crate::models::{OsFamily, PlatformInfo};

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Host platform from the compile target and, on Linux, `/etc/os-release`.
pub fn detect() -> PlatformInfo {
    let os_family = OsFamily::from_os_name(std::env::consts::OS);
    if os_family != OsFamily::Linux {
        return PlatformInfo::new(os_family);
    }

    match std::fs::read_to_string(Path::new(OS_RELEASE_PATH)) {
        Ok(content) => parse_os_release(&content),
        Err(error) => {
            tracing::debug!(%error, "failed to read {OS_RELEASE_PATH}");
            PlatformInfo::new(OsFamily::Linux)
        }
    }
}

pub fn parse_os_release(content: &str) -> PlatformInfo {
    let mut info = PlatformInfo::new(OsFamily::Linux);

    for line in content.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("ID=") {
            let id = unquote(value);
            if !id.is_empty() {
                info.distribution_id = Some(id.to_ascii_lowercase());
            }
        } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
            info.distribution_like = unquote(value)
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect();
        }
    }

    info
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}
