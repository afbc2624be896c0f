use regex::Regex;
use std::sync::OnceLock;

static FIRST_DIGITS: OnceLock<Regex> = OnceLock::new();

/// Cell text as read from a sheet: surrounding whitespace and byte order marks
/// removed, the inside left as is.
pub(crate) fn clean_cell(value: &str) -> String {
    value
        .trim_matches(|ch: char| ch.is_whitespace() || ch == '\u{feff}')
        .to_string()
}

/// Numeric value of the first run of ASCII digits, e.g. `"12.1 п."` -> `12`.
pub(crate) fn plan_line_number(value: &str) -> Option<u64> {
    let pattern = FIRST_DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit pattern"));
    pattern
        .find(value)
        .and_then(|found| found.as_str().parse::<u64>().ok())
}
