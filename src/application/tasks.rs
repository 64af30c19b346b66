use tracing::error;

use crate::domain::{compose, AppError, DownloadTask, Row};
use crate::settings::Settings;
use crate::utils::sanitize_filename;

/// Turn scraped rows into download tasks, in row order.
///
/// Any row without a download link or with an unusable date fails the whole
/// batch before a single download is issued.
pub fn build_tasks(
    rows: &[Row],
    settings: &Settings,
    base_url: &str,
) -> Result<Vec<DownloadTask>, AppError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let row_number = index + 1;

            let filename = compose(
                &row.segments,
                &settings.filename_template,
                settings.rename_files,
            )
            .map_err(|source| AppError::Compose {
                row: row_number,
                source,
            })?
            // the template is free text and may contain path separators
            .map(|name| sanitize_filename(&name));

            let href = row.href.as_deref().ok_or_else(|| {
                error!(row = row_number, segments = ?row.segments, "Row has no download link");
                AppError::MissingLink { row: row_number }
            })?;

            Ok(DownloadTask {
                url: document_url(base_url, href)?,
                filename,
            })
        })
        .collect()
}

/// `base_url` joined with the page-relative `href`, minus its leading `.`.
pub fn document_url(base_url: &str, href: &str) -> Result<String, AppError> {
    let relative = href.char_indices().nth(1).map_or("", |(i, _)| &href[i..]);
    let url = format!("{}{}", base_url, relative);

    url::Url::parse(&url).map_err(|e| AppError::InvalidUrl(format!("{}: {}", url, e)))?;
    Ok(url)
}
