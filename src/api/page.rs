//! Postbox list scraping.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::{AppError, Row};
use crate::utils::sanitize_segment;

const ROW_SELECTOR: &str = ".ibbr-table-body div.ibbr-table-row";
const CELL_CLASS: &str = "ibbr-table-cell";
const LINK_TEXT: &str = "Download";

/// Anything that can list the postbox rows currently on screen.
pub trait RowSource {
    fn rows(&self) -> Result<Vec<Row>, AppError>;
}

/// Rows scraped from the markup of the postbox page.
pub struct HtmlRowSource {
    html: String,
}

impl HtmlRowSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl RowSource for HtmlRowSource {
    fn rows(&self) -> Result<Vec<Row>, AppError> {
        let document = Html::parse_document(&self.html);
        let row_selector = selector(ROW_SELECTOR)?;
        let link_selector = selector("a")?;

        let rows: Vec<Row> = document
            .select(&row_selector)
            .map(|row| Row {
                segments: segments(row),
                href: download_href(row, &link_selector),
            })
            .collect();

        debug!(count = rows.len(), "Scraped postbox rows");
        Ok(rows)
    }
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Page(format!("Failed to parse selector: {:?}", e)))
}

/// Text of every direct `span.ibbr-table-cell` child except the last one,
/// which only holds the row's actions.
fn segments(row: ElementRef<'_>) -> Vec<String> {
    let mut cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| {
            cell.value().name() == "span" && cell.value().classes().any(|c| c == CELL_CLASS)
        })
        .collect();
    cells.pop();

    cells
        .into_iter()
        .map(|cell| sanitize_segment(&cell.text().collect::<String>()))
        .collect()
}

fn download_href(row: ElementRef<'_>, link_selector: &Selector) -> Option<String> {
    row.select(link_selector)
        .find(|link| link.text().collect::<String>().contains(LINK_TEXT))
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="ibbr-table-body">
          <div class="ibbr-table-row">
            <span class="ibbr-table-cell"> Kontoauszug </span>
            <span class="ibbr-table-cell">Jahres-abschluss 2023</span>
            <span class="ibbr-table-cell">15.03.2024</span>
            <span class="ibbr-table-cell">
              <a href="./archive?id=1">Archivieren</a>
              <a href="./download?id=1">Download</a>
            </span>
          </div>
          <div class="ibbr-table-row">
            <span class="ibbr-table-cell">Wertpapiere</span>
            <span class="ibbr-table-cell">Dividendengutschrift Müller AG</span>
            <span class="ibbr-table-cell">01.02.2024</span>
            <span class="ibbr-table-cell"></span>
          </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_scrapes_rows_in_order() {
        let rows = HtmlRowSource::new(PAGE).rows().unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(
            rows[0].segments,
            vec!["Kontoauszug", "Jahres_abschluss_2023", "15_03_2024"]
        );
        assert_eq!(rows[0].href.as_deref(), Some("./download?id=1"));

        assert_eq!(
            rows[1].segments,
            vec!["Wertpapiere", "Dividendengutschrift_Müller_AG", "01_02_2024"]
        );
        assert_eq!(rows[1].href, None);
    }

    #[test]
    fn test_page_without_rows() {
        let rows = HtmlRowSource::new("<html><body><p>Leer</p></body></html>")
            .rows()
            .unwrap();
        assert!(rows.is_empty());
    }
}
