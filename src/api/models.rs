use std::path::PathBuf;
use std::time::Duration;

/// Origin path every document link of the postbox is relative to.
pub const POSTBOX_BASE_URL: &str = "https://banking.ing.de/app/postbox";

/// Name the download mechanism falls back to when nobody knows better.
pub const DEFAULT_DOCUMENT_NAME: &str = "document.pdf";

/// Configuration for the postbox HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub download_dir: PathBuf,
    /// Raw `Cookie` header of an authenticated banking session.
    pub cookie: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: POSTBOX_BASE_URL.to_string(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            cookie: None,
            timeout: Duration::from_secs(120),
        }
    }
}
