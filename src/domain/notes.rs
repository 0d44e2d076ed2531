//! Numeric-intensity notes prefix codec
//!
//! A metric's notes may carry a structured prefix `N/10` with N in 1..=10,
//! optionally followed by ` - ` and free text:
//!
//! ```text
//! "7/10"                → numeric 7, rest ""
//! "7/10 - behind eyes"  → numeric 7, rest "behind eyes"
//! "fell over"           → no numeric, rest is the whole string
//! ```
//!
//! Anything that does not match exactly is treated as plain notes; `0/10`
//! and `11/10` are out of range and left untouched.

use super::types::Intensity;

/// Split notes into an optional numeric intensity and the trailing text
pub fn split_numeric_intensity(notes: &str) -> (Option<u8>, &str) {
    let digits_end = notes
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(notes.len());
    if digits_end == 0 || digits_end > 2 {
        return (None, notes);
    }

    let value: u8 = match notes[..digits_end].parse() {
        Ok(value) => value,
        Err(_) => return (None, notes),
    };
    if !(1..=10).contains(&value) {
        return (None, notes);
    }

    let after = match notes[digits_end..].strip_prefix("/10") {
        Some(after) => after,
        None => return (None, notes),
    };

    if after.is_empty() {
        (Some(value), "")
    } else if let Some(rest) = after.strip_prefix(" - ") {
        (Some(value), rest)
    } else {
        (None, notes)
    }
}

/// Categorical bucket for a 1..=10 numeric intensity
///
/// 1–3 low, 4–6 medium, 7–10 high. Values above 10 saturate to high.
pub fn intensity_for_numeric(value: u8) -> Intensity {
    match value {
        0..=3 => Intensity::Low,
        4..=6 => Intensity::Medium,
        _ => Intensity::High,
    }
}

/// Rebuild a notes string from a numeric intensity and trailing text
pub fn format_notes_prefix(value: u8, rest: &str) -> String {
    if rest.is_empty() {
        format!("{value}/10")
    } else {
        format!("{value}/10 - {rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_rest() {
        assert_eq!(
            split_numeric_intensity("7/10 - behind the eyes"),
            (Some(7), "behind the eyes")
        );
    }

    #[test]
    fn test_split_without_rest() {
        assert_eq!(split_numeric_intensity("10/10"), (Some(10), ""));
        assert_eq!(split_numeric_intensity("1/10"), (Some(1), ""));
    }

    #[test]
    fn test_split_rejects_out_of_range() {
        assert_eq!(split_numeric_intensity("0/10"), (None, "0/10"));
        assert_eq!(split_numeric_intensity("11/10"), (None, "11/10"));
        assert_eq!(split_numeric_intensity("11/10 - x"), (None, "11/10 - x"));
    }

    #[test]
    fn test_split_rejects_malformed() {
        assert_eq!(split_numeric_intensity(""), (None, ""));
        assert_eq!(split_numeric_intensity("fell over"), (None, "fell over"));
        assert_eq!(split_numeric_intensity("7/9 - x"), (None, "7/9 - x"));
        assert_eq!(split_numeric_intensity("7/10- x"), (None, "7/10- x"));
        assert_eq!(split_numeric_intensity("7/10x"), (None, "7/10x"));
    }

    #[test]
    fn test_buckets() {
        assert_eq!(intensity_for_numeric(1), Intensity::Low);
        assert_eq!(intensity_for_numeric(3), Intensity::Low);
        assert_eq!(intensity_for_numeric(4), Intensity::Medium);
        assert_eq!(intensity_for_numeric(6), Intensity::Medium);
        assert_eq!(intensity_for_numeric(7), Intensity::High);
        assert_eq!(intensity_for_numeric(10), Intensity::High);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_notes_prefix(7, ""), "7/10");
        assert_eq!(format_notes_prefix(7, "behind the eyes"), "7/10 - behind the eyes");
    }
}
