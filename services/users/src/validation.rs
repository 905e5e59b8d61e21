//! Input validation utilities

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Longest filename component kept when staging an upload
const MAX_FILENAME_LENGTH: usize = 100;

/// Fallback when nothing usable is left of the client's filename
const DEFAULT_FILENAME: &str = "avatar";

/// Validate gender against the configured allow-list
pub fn validate_gender(gender: &str, allowed: &[String]) -> Result<(), String> {
    if allowed.iter().any(|g| g == gender) {
        Ok(())
    } else {
        Err("Invalid gender value".to_string())
    }
}

/// Parse a `YYYY-MM-DD` birthdate. Month and day must be zero-padded.
pub fn parse_birthdate(value: &str) -> Result<NaiveDate, String> {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = DATE_REGEX
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Failed to compile date regex"));

    let invalid = || "Invalid date format, must be yyyy-mm-dd".to_string();

    if !regex.is_match(value) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, and leading dots are stripped so the result can never be `..` or a
/// hidden file.
pub fn sanitize_filename(filename: &str) -> String {
    static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();
    let regex = UNSAFE_CHARS
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("Failed to compile filename regex"));

    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let replaced = regex.replace_all(last, "_");
    let trimmed = replaced.trim_start_matches('.');

    if trimmed.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    // only ASCII remains, so byte truncation is safe
    trimmed[..trimmed.len().min(MAX_FILENAME_LENGTH)].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_gender() {
        let allowed: Vec<String> = ["Male", "Female", "Others", ""]
            .iter()
            .map(|g| g.to_string())
            .collect();

        for ok in ["Male", "Female", "Others", ""] {
            assert!(validate_gender(ok, &allowed).is_ok());
        }
        for bad in ["female", "Unknown", "Others "] {
            assert!(validate_gender(bad, &allowed).is_err());
        }
    }

    #[test]
    fn test_parse_birthdate() {
        assert_eq!(
            parse_birthdate("2000-02-29"),
            Ok(NaiveDate::from_ymd_opt(2000, 2, 29).expect("date"))
        );
        assert!(parse_birthdate("2001-02-29").is_err());
        assert!(parse_birthdate("2024-13-40").is_err());
        assert!(parse_birthdate("not-a-date").is_err());
        assert!(parse_birthdate("2024-1-05").is_err());
        assert!(parse_birthdate("").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("me.png"), "me.png");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\face.gif"), "face.gif");
        assert_eq!(sanitize_filename(".."), "avatar");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "avatar");
        assert_eq!(sanitize_filename("dir/"), "avatar");
        assert_eq!(sanitize_filename("é.png"), "_.png");

        let long = "a".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LENGTH);
    }
}
