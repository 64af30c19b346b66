use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::AppError;

/// The mechanism that actually puts a document on disk.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Filename the server would suggest for `url`, if it says so.
    async fn server_filename(&self, url: &str) -> Result<Option<String>, AppError>;

    /// Fetch `url` and store it. `None` lets the backend pick its default name.
    async fn download(&self, url: &str, filename: Option<&str>) -> Result<PathBuf, AppError>;
}
