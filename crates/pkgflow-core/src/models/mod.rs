pub mod backend;
pub mod error;
pub mod install;
pub mod manifest;
pub mod platform;

pub use backend::{BackendAction, BackendId, BackendKind};
pub use error::{CoreError, CoreErrorKind};
pub use install::{
    InstallOptions, InstallOutcome, InstallResult, ParallelCapability, validate_package_name,
};
pub use manifest::{PackageCategory, PackageInfo, PackageManifest};
pub use platform::{OsFamily, PlatformInfo};
