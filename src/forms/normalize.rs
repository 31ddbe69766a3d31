//! Field-level normalization: date rewriting, phone and Aadhaar patterns,
//! and the legacy date-key rules shared by forms and dynamic columns.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DDMMYYYY: Regex = Regex::new(r"^\s*(\d{2})/(\d{2})/(\d{4})\s*$").unwrap();
    pub static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
    pub static ref AADHAAR_RE: Regex = Regex::new(r"^\d{4} \d{4} \d{4}$").unwrap();
}

/// Field names treated as dates even though they do not contain "date".
const DATE_KEYS: &[&str] = &[
    "dob",
    "joining_date",
    "joined_on",
    "from_date",
    "to_date",
    "applied_date",
    "disbursement_date",
    "approval_date",
    "issue_date",
    "expiry_date",
    "birth_date",
];

/// Whether a field name is eligible for date-input rewriting.
pub fn is_date_key(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("date") || DATE_KEYS.contains(&lower.as_str())
}

/// Rewrite `dd/mm/yyyy` input to the sortable `yyyy-mm-dd` form.
///
/// The rewrite is purely syntactic; an impossible calendar date passes
/// through rearranged and is caught by parsing downstream. Anything not
/// matching the pattern is returned untouched.
pub fn normalize_date_input(raw: &str) -> String {
    match DDMMYYYY.captures(raw) {
        Some(caps) => format!("{}-{}-{}", &caps[3], &caps[2], &caps[1]),
        None => raw.to_string(),
    }
}

/// Parse a date in either accepted textual form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

/// Render a stored date back in the entry format.
pub fn format_date_display(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
