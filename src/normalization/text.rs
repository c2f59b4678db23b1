/// Raw note-field values that mean "no notes" rather than a one-element list.
const NOTE_SENTINELS: [&str; 4] = ["unknown", "n/a", "none", ""];

/// Trimmed `raw` when it is non-blank, otherwise `default`.
pub fn value_or(raw: &str, default: &str) -> String {
    match non_blank(raw) {
        Some(v) => v,
        None => default.to_string(),
    }
}

/// Trimmed `raw`, or `None` when nothing is left after trimming.
pub fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Hyphens become spaces and the first character of every word is upper-cased.
///
/// Only word starts are touched: "MEN" stays "MEN" and "l'eau" becomes "L'Eau".
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_word = false;
    for c in raw.chars() {
        let c = if c == '-' { ' ' } else { c };
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !prev_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_word = is_word;
    }
    out.trim().to_string()
}

/// Split a comma-separated note field into title-cased tokens.
pub fn split_notes(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if NOTE_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(|note| title_case(note.trim()))
        .filter(|note| !note.is_empty())
        .collect()
}

/// Lower-case and collapse every run of non `[a-z0-9]` characters into one hyphen.
pub fn slug_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Leading-integer parse of a release year ("2020", "2020.0", " 1999 ").
///
/// Empty, non-numeric and zero values yield `None`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let year = rest[..end].parse::<i32>().ok()? * sign;
    if year == 0 {
        None
    } else {
        Some(year)
    }
}
