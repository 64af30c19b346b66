use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static NON_SEGMENT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9ÄÖÜäöüß]").expect("valid segment regex"));

/// Normalize a scraped table cell: trim, then replace everything that is not
/// an ASCII letter, digit, umlaut or ß with an underscore.
pub fn sanitize_segment(text: &str) -> String {
    NON_SEGMENT_CHARS.replace_all(text.trim(), "_").into_owned()
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}

/// First path in `dir` named `filename` that does not exist yet, inserting
/// ` (1)`, ` (2)`, ... before the extension on collisions.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], &filename[dot..]),
        _ => (filename, ""),
    };

    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("  15.03.2024 "), "15_03_2024");
        assert_eq!(sanitize_segment("Kontoauszug"), "Kontoauszug");
        assert_eq!(sanitize_segment("Größe & Maß"), "Größe___Maß");
        assert_eq!(sanitize_segment("Übersicht 2/24"), "Übersicht_2_24");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.pdf"), "test_file.pdf");
        assert_eq!(sanitize_filename("normal-name.pdf"), "normal-name.pdf");
        assert_eq!(sanitize_filename("../secret.pdf"), "_secret.pdf");
    }

    #[test]
    fn test_unique_path_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "a.pdf"), dir.path().join("a.pdf"));

        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        assert_eq!(unique_path(dir.path(), "a.pdf"), dir.path().join("a (1).pdf"));

        std::fs::write(dir.path().join("a (1).pdf"), b"x").unwrap();
        assert_eq!(unique_path(dir.path(), "a.pdf"), dir.path().join("a (2).pdf"));
    }
}
