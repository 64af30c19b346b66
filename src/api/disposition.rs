//! `Content-Disposition` filename extraction.

use std::sync::LazyLock;

use regex::Regex;

static EXTENDED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)filename\*=UTF-8''(.+?)(?:;|$)").expect("valid extended filename regex")
});

static PLAIN_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename=(?:"(.+?)"|([^;\s]+))"#).expect("valid filename regex")
});

/// Filename suggested by a `Content-Disposition` header value.
///
/// The RFC 5987 `filename*=UTF-8''...` form wins over `filename=`. Either is
/// percent-decoded; a value that does not decode yields `None`.
pub fn parse_filename(header: &str) -> Option<String> {
    let raw = EXTENDED_FILENAME
        .captures(header)
        .and_then(|caps| caps.get(1))
        .or_else(|| {
            PLAIN_FILENAME
                .captures(header)
                .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        })?
        .as_str();

    let decoded = urlencoding::decode(raw).ok()?;
    let name = decoded.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted() {
        assert_eq!(
            parse_filename(r#"attachment; filename="Kontoauszug_2024.pdf""#).as_deref(),
            Some("Kontoauszug_2024.pdf")
        );
    }

    #[test]
    fn test_parse_bare() {
        assert_eq!(
            parse_filename("inline; filename=Abrechnung.pdf; size=100").as_deref(),
            Some("Abrechnung.pdf")
        );
    }

    #[test]
    fn test_extended_form_wins() {
        let header =
            r#"attachment; filename="fallback.pdf"; filename*=UTF-8''Geb%C3%BChren%20M%C3%A4rz.pdf"#;
        assert_eq!(parse_filename(header).as_deref(), Some("Gebühren März.pdf"));
    }

    #[test]
    fn test_plain_form_is_percent_decoded() {
        assert_eq!(
            parse_filename("attachment; filename=Depot%20Info.pdf").as_deref(),
            Some("Depot Info.pdf")
        );
    }

    #[test]
    fn test_no_filename() {
        assert_eq!(parse_filename("attachment"), None);
        assert_eq!(parse_filename(""), None);
    }

    #[test]
    fn test_undecodable_value() {
        assert_eq!(parse_filename("attachment; filename*=UTF-8''%FF%FE.pdf"), None);
    }
}
