pub mod detect_utils;
pub mod failure;
pub mod pacman;
pub mod process_utils;
pub mod provider;
pub mod winget;
pub mod yay;

pub use failure::classify_failure;
pub use pacman::PacmanProvider;
pub use provider::{BackendContext, BackendProvider, BoxFuture};
pub use winget::WingetProvider;
pub use yay::YayProvider;
