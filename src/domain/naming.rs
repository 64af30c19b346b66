//! Filename templates.
//!
//! A template is free text containing the tokens `DD`, `MM`, `YYYY`, `ART`
//! and `BETREFF`. Each token is replaced at its first occurrence in the
//! template; text that was inserted for one token is never searched again.

use super::error::ComposeError;

pub const DEFAULT_TEMPLATE: &str = "YYYY.MM.DD_ART_BETREFF";

/// Every token a stored template has to contain, in substitution order.
pub const PLACEHOLDERS: [&str; 5] = ["DD", "MM", "YYYY", "ART", "BETREFF"];

const EXTENSION: &str = ".pdf";

/// Tokens the template lacks. Empty means the template is acceptable.
pub fn missing_placeholders(template: &str) -> Vec<&'static str> {
    PLACEHOLDERS
        .iter()
        .copied()
        .filter(|token| !template.contains(token))
        .collect()
}

/// Build the target filename for a row.
///
/// Returns `Ok(None)` when renaming is switched off, in which case the
/// server-provided name should be used. Segment 0 is the category, segment 1
/// the subject and segment 2 the date as `DD_MM_YYYY`.
pub fn compose(
    segments: &[String],
    template: &str,
    rename_enabled: bool,
) -> Result<Option<String>, ComposeError> {
    if !rename_enabled {
        return Ok(None);
    }

    let segment = |index: usize| {
        segments
            .get(index)
            .map(String::as_str)
            .ok_or(ComposeError::MissingSegment(index))
    };

    let category = segment(0)?;
    let subject = segment(1)?;
    let date = segment(2)?;

    let parts: Vec<&str> = date.split('_').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(ComposeError::MalformedDate(date.to_string()));
    };

    let values = [*day, *month, *year, category, subject];
    let stem = substitute_first(template, &PLACEHOLDERS, &values);

    Ok(Some(format!("{}{}", stem, EXTENSION)))
}

fn substitute_first(template: &str, tokens: &[&str], values: &[&str]) -> String {
    // (start, end, replacement), offsets into `template`
    let mut claimed: Vec<(usize, usize, &str)> = Vec::with_capacity(tokens.len());

    for (token, value) in tokens.iter().zip(values) {
        let hit = template
            .match_indices(token)
            .map(|(start, _)| (start, start + token.len()))
            .find(|&(start, end)| {
                claimed
                    .iter()
                    .all(|&(taken_start, taken_end, _)| end <= taken_start || start >= taken_end)
            });

        if let Some((start, end)) = hit {
            claimed.push((start, end, *value));
        }
    }

    claimed.sort_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(template.len() + 32);
    let mut cursor = 0;
    for (start, end, value) in claimed {
        out.push_str(&template[cursor..start]);
        out.push_str(value);
        cursor = end;
    }
    out.push_str(&template[cursor..]);
    out
}
