use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_DISPOSITION, COOKIE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::disposition::parse_filename;
use super::models::{ClientConfig, DEFAULT_DOCUMENT_NAME};
use crate::application::DownloadBackend;
use crate::domain::AppError;
use crate::utils::{sanitize_filename, unique_path};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server answered with status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ApiError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ApiError + '_ {
    move |source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create a file in `dir` that did not exist before. A name taken between the
/// existence check and the create moves on to the next ` (n)` candidate.
async fn create_unique(dir: &Path, filename: &str) -> Result<(PathBuf, File)> {
    loop {
        let path = unique_path(dir, filename);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Name taken, trying next");
            }
            Err(e) => return Err(io_error(&path)(e)),
        }
    }
}

/// HTTP access to the banking postbox, authenticated by the session cookie.
#[derive(Clone)]
pub struct PostboxClient {
    config: ClientConfig,
    http: Client,
}

impl PostboxClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.config.cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    /// Read the postbox page markup from a URL or a saved HTML file.
    pub async fn load_page(&self, location: &str) -> Result<String> {
        if location.starts_with("http://") || location.starts_with("https://") {
            debug!(url = location, "Fetching postbox page");
            let response = self.request(Method::GET, location).send().await?;
            if !response.status().is_success() {
                return Err(ApiError::UnexpectedStatus(response.status()));
            }
            return Ok(response.text().await?);
        }

        let path = Path::new(location);
        debug!(path = %path.display(), "Reading saved postbox page");
        tokio::fs::read_to_string(path)
            .await
            .map_err(io_error(path))
    }

    /// Ask the server for the document's filename without fetching the body.
    pub async fn head_filename(&self, url: &str) -> Result<Option<String>> {
        let response = self.request(Method::HEAD, url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus(response.status()));
        }

        Ok(response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_filename))
    }

    /// Start a download. Only `200 OK` counts as a usable response.
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        url: &str,
    ) -> Result<(Option<u64>, BoxStream<'static, Result<bytes::Bytes>>)> {
        let response = self.request(Method::GET, url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ApiError::UnexpectedStatus(response.status()));
        }

        let total_size = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok((total_size, stream))
    }

    /// Download `url` into the configured directory and return the written path.
    /// Existing files are never overwritten.
    pub async fn save(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let (total_size, mut stream) = self.download_file_stream(url).await?;

        let dir = &self.config.download_dir;
        tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        let name = filename
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());
        let (path, mut file) = create_unique(dir, &name).await?;

        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_error(&path))?;
            downloaded += chunk.len() as u64;
        }
        file.sync_all().await.map_err(io_error(&path))?;

        info!(
            path = %path.display(),
            bytes = downloaded,
            expected = ?total_size,
            "Saved document"
        );
        Ok(path)
    }
}

#[async_trait]
impl DownloadBackend for PostboxClient {
    async fn server_filename(&self, url: &str) -> std::result::Result<Option<String>, AppError> {
        self.head_filename(url)
            .await
            .map_err(|e| AppError::FilenameLookup(e.to_string()))
    }

    async fn download(
        &self,
        url: &str,
        filename: Option<&str>,
    ) -> std::result::Result<PathBuf, AppError> {
        self.save(url, filename)
            .await
            .map_err(|e| AppError::Download(e.to_string()))
    }
}
