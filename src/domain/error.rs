use thiserror::Error;

/// Failures while turning scraped segments into a filename.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("Row has no segment at position {0}")]
    MissingSegment(usize),

    #[error("Date segment '{0}' is not in DD_MM_YYYY form")]
    MalformedDate(String),
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Row {row} has no download link")]
    MissingLink { row: usize },

    #[error("Row {row}: {source}")]
    Compose { row: usize, source: ComposeError },

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load postbox page: {0}")]
    Page(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Filename lookup failed: {0}")]
    FilenameLookup(String),

    #[error("Settings error: {0}")]
    Settings(String),
}
