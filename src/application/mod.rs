pub mod backend;
pub mod download_coordinator;
pub mod tasks;

pub use backend::DownloadBackend;
pub use download_coordinator::{
    BatchEvent, BatchOutcome, DownloadCoordinator, RunGuard, Toggle, DEFAULT_SETTLE_DELAY,
};
pub use tasks::build_tasks;
