//! Per-field cleanup rules.
//!
//! Every function here is total: it returns the normalized value or `None`
//! for unknown, and never panics. Blank input is always unknown.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}'), ('\u{2018}', '\u{2019}')];

/// Value for a non-blank language code that is not in the table.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Code -> language name. Codes are matched case-insensitively.
const LANGUAGES: &[(&str, &str)] = &[
    ("eng", "English"),
    ("en", "English"),
    ("en-us", "English"),
    ("en-gb", "English"),
    ("en-ca", "English"),
    ("enm", "English"),
    ("fre", "French"),
    ("fra", "French"),
    ("fr", "French"),
    ("ger", "German"),
    ("deu", "German"),
    ("de", "German"),
    ("spa", "Spanish"),
    ("es", "Spanish"),
    ("ita", "Italian"),
    ("it", "Italian"),
    ("por", "Portuguese"),
    ("pt", "Portuguese"),
    ("pol", "Polish"),
    ("pl", "Polish"),
    ("rus", "Russian"),
    ("ru", "Russian"),
    ("jpn", "Japanese"),
    ("ja", "Japanese"),
    ("zho", "Chinese"),
    ("chi", "Chinese"),
    ("zh", "Chinese"),
    ("kor", "Korean"),
    ("ko", "Korean"),
    ("ara", "Arabic"),
    ("ar", "Arabic"),
    ("heb", "Hebrew"),
    ("he", "Hebrew"),
    ("dut", "Dutch"),
    ("nld", "Dutch"),
    ("nl", "Dutch"),
    ("swe", "Swedish"),
    ("sv", "Swedish"),
    ("nor", "Norwegian"),
    ("no", "Norwegian"),
    ("dan", "Danish"),
    ("da", "Danish"),
    ("fin", "Finnish"),
    ("fi", "Finnish"),
    ("tur", "Turkish"),
    ("tr", "Turkish"),
    ("gre", "Greek"),
    ("ell", "Greek"),
    ("el", "Greek"),
    ("grc", "Ancient Greek"),
    ("lat", "Latin"),
    ("la", "Latin"),
    ("cze", "Czech"),
    ("ces", "Czech"),
    ("cs", "Czech"),
    ("hun", "Hungarian"),
    ("hu", "Hungarian"),
    ("srp", "Serbian"),
    ("glg", "Galician"),
    ("msa", "Malay"),
    ("wel", "Welsh"),
    ("cym", "Welsh"),
    ("gla", "Scottish Gaelic"),
    ("ale", "Aleut"),
    ("mul", "Multiple languages"),
];

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Trim only; no checksum validation.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    non_blank(raw).map(str::to_string)
}

/// Strip surrounding whitespace and any number of matching wrapping quotes.
pub fn normalize_title(raw: &str) -> Option<String> {
    let mut title = raw.trim();
    loop {
        let stripped = QUOTE_PAIRS.iter().find_map(|&(open, close)| {
            title
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        });
        match stripped {
            Some(inner) => title = inner.trim(),
            None => break,
        }
    }
    non_blank(title).map(str::to_string)
}

/// Fallback identity key: normalized title, lowercased, inner whitespace collapsed.
pub fn title_key(raw: &str) -> Option<String> {
    let title = normalize_title(raw)?;
    Some(title.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Split on any of `,` `;` `/`, trim, drop empty tokens.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split([',', ';', '/'])
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_authors(raw: &str) -> Option<String> {
    let authors = split_authors(raw);
    (!authors.is_empty()).then(|| authors.join(", "))
}

/// Code or full name -> full name; anything else non-blank is `"Unknown"`.
pub fn normalize_language(raw: &str) -> Option<String> {
    let value = non_blank(raw)?;
    let name = LANGUAGES
        .iter()
        .find(|(code, name)| code.eq_ignore_ascii_case(value) || name.eq_ignore_ascii_case(value))
        .map(|&(_, name)| name)
        .unwrap_or(UNKNOWN_LANGUAGE);
    Some(name.to_string())
}

/// Four-digit year from a bare year, a date or a datetime.
pub fn normalize_year(raw: &str) -> Option<i32> {
    let value = non_blank(raw)?;

    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.year())
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.year())
        })
        .or_else(|| {
            ["%Y-%m-%d", "%m/%d/%Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|d| d.year())
        });

    parsed
        .or_else(|| first_four_digit_run(value))
        .filter(|year| *year > 0)
}

/// First maximal run of ASCII digits that is exactly four long.
fn first_four_digit_run(value: &str) -> Option<i32> {
    value
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 4)
        .and_then(|run| run.parse().ok())
}

/// Leading integer token (`"352"`, `"352.0"`, `"352 pages"`).
pub fn normalize_pages(raw: &str) -> Option<u32> {
    let token = non_blank(raw)?.split_whitespace().next()?.trim_end_matches(',');
    if let Ok(pages) = token.parse::<u32>() {
        return Some(pages);
    }
    let float: f64 = token.parse().ok()?;
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u32::MAX as f64)
        .then(|| float as u32)
}

/// Parse a rating on `scale` and rescale to 0-5. Out of range is unknown.
pub fn normalize_rating(raw: &str, scale: f64) -> Option<f64> {
    let value = non_blank(raw)?;
    let value = if value.contains(',') && !value.contains('.') {
        value.replacen(',', ".", 1)
    } else {
        value.to_string()
    };
    let rating: f64 = value.parse().ok()?;
    if !rating.is_finite() || !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    let rescaled = if scale == 5.0 { rating } else { rating * 5.0 / scale };
    (0.0..=5.0).contains(&rescaled).then_some(rescaled)
}

/// Free text (publisher): trim.
pub fn normalize_text(raw: &str) -> Option<String> {
    non_blank(raw).map(str::to_string)
}

/// `"['Fiction', 'Classics']"` -> `"Fiction, Classics"`.
pub fn normalize_category(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '"' | '\''))
        .collect();
    let parts: Vec<&str> = cleaned
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}
