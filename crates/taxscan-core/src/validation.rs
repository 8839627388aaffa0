//! Local structural checks for tax IDs and fiscal document numbers.
//!
//! These rules need no network access and run independently of any registry
//! lookup; they are a fast pre-check, not proof that the identifier exists.

use std::sync::LazyLock;

use jiff::civil::Date;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ExtractedRecord;

/// Digit counts of a valid RNC (9) or cédula (11).
const TAX_ID_LENGTHS: [usize; 2] = [9, 11];

/// Series allowed after the `B` prefix of a paper NCF.
const B_SERIES: [u8; 11] = [1, 2, 3, 4, 11, 12, 13, 14, 15, 16, 17];

/// Series allowed after the `E` prefix of an electronic NCF.
const E_SERIES: [u8; 10] = [31, 32, 33, 34, 41, 43, 44, 45, 46, 47];

static NCF_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:B(?<b>[0-9]{2})[0-9]{8}|E(?<e>[0-9]{2})[0-9]{10})$").expect("valid NCF pattern")
});

/// Strips separators from a tax ID and returns its digits if it is well formed.
pub fn normalize_tax_id(value: &str) -> Option<String> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, '-' | '.' | ' ' | '\t'))
        .collect();

    let well_formed = TAX_ID_LENGTHS.contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit());

    well_formed.then_some(digits)
}

/// Returns true for a 9-digit RNC or an 11-digit cédula, separators allowed.
pub fn is_valid_tax_id(value: &str) -> bool {
    normalize_tax_id(value).is_some()
}

/// Returns true for a structurally valid NCF.
///
/// The value is upper-cased and stripped of leading zeros before matching one of:
/// - `B` + 10 digits whose first two digits are 01–04 or 11–17,
/// - `E` + 12 digits whose first two digits are 31–34, 41 or 43–47.
pub fn is_valid_fiscal_document_number(value: &str) -> bool {
    let normalized = value.trim().trim_start_matches('0').to_ascii_uppercase();

    let Some(captures) = NCF_SHAPE.captures(&normalized) else {
        return false;
    };

    let (series, allowed): (&str, &[u8]) = match (captures.name("b"), captures.name("e")) {
        (Some(series), _) => (series.as_str(), B_SERIES.as_slice()),
        (_, Some(series)) => (series.as_str(), E_SERIES.as_slice()),
        _ => return false,
    };

    series
        .parse::<u8>()
        .is_ok_and(|series| allowed.contains(&series))
}

/// Parses a receipt date printed as `DD/MM/YYYY`.
pub fn parse_receipt_date(value: &str) -> Option<Date> {
    Date::strptime("%d/%m/%Y", value.trim()).ok()
}

/// Structural checks for one extracted record.
///
/// A failed check marks a cell that needs human review in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCheck {
    /// The vendor tax ID has 9 or 11 digits.
    pub tax_id_valid: bool,
    /// The NCF matches one of the authorized series.
    pub ncf_valid: bool,
    /// The date parses as `DD/MM/YYYY`.
    pub date_valid: bool,
}

impl RecordCheck {
    /// Runs every structural check against `record`.
    pub fn of(record: &ExtractedRecord) -> Self {
        Self {
            tax_id_valid: is_valid_tax_id(&record.rnc),
            ncf_valid: is_valid_fiscal_document_number(&record.ncf),
            date_valid: parse_receipt_date(&record.date).is_some(),
        }
    }

    /// Returns true if every check passed.
    pub fn is_clean(&self) -> bool {
        self.tax_id_valid && self.ncf_valid && self.date_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_id_lengths() {
        assert!(is_valid_tax_id("131563856"));
        assert!(is_valid_tax_id("00112345678"));
        assert!(!is_valid_tax_id("13156385"));
        assert!(!is_valid_tax_id("1315638567"));
        assert!(!is_valid_tax_id("131563856789"));
        assert!(!is_valid_tax_id(""));
    }

    #[test]
    fn test_tax_id_separators() {
        assert!(is_valid_tax_id("1-31-56385-6"));
        assert!(is_valid_tax_id("001-1234567-8"));
        assert!(is_valid_tax_id("131 563 856"));
        assert_eq!(normalize_tax_id("1-31-56385-6").as_deref(), Some("131563856"));
    }

    #[test]
    fn test_tax_id_rejects_non_digits() {
        assert!(!is_valid_tax_id("13156385A"));
        assert!(!is_valid_tax_id("RNC131563"));
        assert_eq!(normalize_tax_id("12345678O"), None);
    }

    #[test]
    fn test_b_series() {
        for series in ["01", "02", "03", "04", "11", "12", "13", "14", "15", "16", "17"] {
            let ncf = format!("B{series}00055276");
            assert!(is_valid_fiscal_document_number(&ncf), "{ncf}");
        }

        for series in ["00", "05", "10", "18", "31", "99"] {
            let ncf = format!("B{series}00055276");
            assert!(!is_valid_fiscal_document_number(&ncf), "{ncf}");
        }
    }

    #[test]
    fn test_e_series() {
        for series in ["31", "32", "33", "34", "41", "43", "44", "45", "46", "47"] {
            let ncf = format!("E{series}0000000123");
            assert!(is_valid_fiscal_document_number(&ncf), "{ncf}");
        }

        for series in ["30", "35", "42", "48", "01"] {
            let ncf = format!("E{series}0000000123");
            assert!(!is_valid_fiscal_document_number(&ncf), "{ncf}");
        }
    }

    #[test]
    fn test_ncf_normalization() {
        assert!(is_valid_fiscal_document_number("b0100055276"));
        assert!(is_valid_fiscal_document_number("00B0100055276"));
        assert!(is_valid_fiscal_document_number(" B0100055276 "));
    }

    #[test]
    fn test_ncf_wrong_shape() {
        assert!(!is_valid_fiscal_document_number("B010005527"));
        assert!(!is_valid_fiscal_document_number("B01000552761"));
        assert!(!is_valid_fiscal_document_number("E3100000001"));
        assert!(!is_valid_fiscal_document_number("A0100055276"));
        assert!(!is_valid_fiscal_document_number("B01٠٠٠55276"));
        assert!(!is_valid_fiscal_document_number("E31００00000001"));
        assert!(!is_valid_fiscal_document_number(""));
    }

    #[test]
    fn test_parse_receipt_date() {
        let date = parse_receipt_date("09/08/2025").unwrap();
        assert_eq!((date.day(), date.month(), date.year()), (9, 8, 2025));

        assert!(parse_receipt_date("2025-08-09").is_none());
        assert!(parse_receipt_date("31/02/2025").is_none());
    }

    #[test]
    fn test_record_check() {
        let record = ExtractedRecord {
            rnc: "131563856".into(),
            ncf: "B9900055276".into(),
            date: "09/08/2025".into(),
            subtotal: 100.0,
            itbis: 18.0,
            isc: 0.0,
            other_taxes: 0.0,
            tips: 0.0,
        };

        let check = RecordCheck::of(&record);
        assert!(check.tax_id_valid);
        assert!(!check.ncf_valid);
        assert!(check.date_valid);
        assert!(!check.is_clean());
    }
}
