pub mod backends;
pub mod execution;
pub mod models;
pub mod orchestration;
pub mod platform;
pub mod progress;
pub mod registry;

pub use backends::{BackendContext, BackendProvider};
pub use models::{CoreError, CoreErrorKind, InstallOptions, InstallResult};
pub use orchestration::{BatchOutcome, CancellationToken, PackageInstaller};
pub use registry::ProviderRegistry;
