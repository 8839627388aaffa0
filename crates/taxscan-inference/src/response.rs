//! Decoding of the recognition service's text answer into receipt records.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taxscan_core::types::{amounts_match, round_cents};
use taxscan_core::{ConsistencyWarning, ExtractedRecord};

use crate::{Error, Result, TRACING_TARGET_DECODE};

/// Raw answer returned by a recognition provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    /// Text the service produced; expected, not guaranteed, to be JSON.
    pub text: String,
    /// Model that produced the answer, when the provider reports it.
    pub model: Option<String>,
}

impl RecognitionResponse {
    /// Creates a response from the service's text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    /// Sets the reporting model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Records read from one document, with any consistency warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Receipts found in the document, in the order the service listed them.
    pub records: Vec<ExtractedRecord>,
    /// Records whose reported subtotal was replaced by `total - itbis`.
    pub warnings: Vec<ConsistencyWarning>,
}

impl Extraction {
    /// Returns true when the document held no receipt.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One receipt as the service wrote it, before the subtotal is settled.
#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(deserialize_with = "tax_id")]
    rnc: String,
    #[serde(deserialize_with = "text")]
    ncf: String,
    #[serde(deserialize_with = "text")]
    date: String,
    #[serde(default, deserialize_with = "amount")]
    total: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    subtotal: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    itbis: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    isc: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    other_taxes: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    tips: Option<f64>,
}

impl RawReceipt {
    /// Settles the subtotal and drops the transient total.
    fn into_record(
        self,
        index: usize,
    ) -> std::result::Result<(ExtractedRecord, Option<ConsistencyWarning>), String> {
        let itbis = self.itbis.unwrap_or_default();
        let mut warning = None;

        let subtotal = match (self.total, self.subtotal) {
            (Some(total), reported) => {
                let derived = round_cents(total - itbis);
                if let Some(reported) = reported.filter(|r| !amounts_match(*r, derived)) {
                    warning = Some(ConsistencyWarning {
                        record_index: index,
                        ncf: self.ncf.clone(),
                        reported_subtotal: reported,
                        derived_subtotal: derived,
                    });
                }
                derived
            }
            (None, Some(reported)) => reported,
            (None, None) => return Err(format!("receipt {index} has neither total nor subtotal")),
        };

        if subtotal < 0.0 {
            return Err(format!("receipt {index} has a negative subtotal ({subtotal:.2})"));
        }

        let record = ExtractedRecord {
            rnc: self.rnc,
            ncf: self.ncf,
            date: self.date,
            subtotal,
            itbis,
            isc: self.isc.unwrap_or_default(),
            other_taxes: self.other_taxes.unwrap_or_default(),
            tips: self.tips.unwrap_or_default(),
        };

        Ok((record, warning))
    }
}

/// Decodes the service's text into records.
///
/// Accepts a JSON array of receipts or a single receipt object, optionally
/// wrapped in a markdown code fence. Anything else fails with a `Schema`
/// error carrying the raw text.
pub fn parse_records(text: &str) -> Result<Extraction> {
    let body = strip_code_fence(text);

    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::schema(text)
            .with_message(format!("answer is not JSON: {e}"))
            .with_source(e)
    })?;

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(Error::schema(text).with_message(format!(
                "expected a list of receipts, got {}",
                json_type(&other)
            )));
        }
    };

    let mut extraction = Extraction::default();
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawReceipt = serde_json::from_value(item).map_err(|e| {
            Error::schema(text)
                .with_message(format!("receipt {index}: {e}"))
                .with_source(e)
        })?;

        let (record, warning) = raw
            .into_record(index)
            .map_err(|message| Error::schema(text).with_message(message))?;

        if let Some(warning) = warning {
            tracing::warn!(
                target: TRACING_TARGET_DECODE,
                record_index = warning.record_index,
                ncf = %warning.ncf,
                reported = warning.reported_subtotal,
                derived = warning.derived_subtotal,
                "Reported subtotal disagrees with total - itbis"
            );
            extraction.warnings.push(warning);
        }

        extraction.records.push(record);
    }

    tracing::trace!(
        target: TRACING_TARGET_DECODE,
        records = extraction.records.len(),
        "Decoded recognition answer"
    );

    Ok(extraction)
}

/// Removes a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads an amount written as a number or as text such as `"RD$ 1,458.00"`.
fn amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(number) => Ok(number.as_f64()),
        Value::String(raw) => {
            if !raw.chars().any(|c| c.is_ascii_digit()) {
                return Ok(None);
            }

            normalize_amount(&raw)
                .and_then(|normalized| normalized.parse().ok())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid amount '{raw}'")))
        }
        other => Err(de::Error::custom(format!(
            "expected an amount, got {}",
            json_type(&other)
        ))),
    }
}

/// Rewrites amount text as a plain decimal number, or `None` if ambiguous.
///
/// With both `.` and `,` present, the last one is the decimal separator and
/// must appear once. A lone separator kind marks decimals only when it
/// appears once followed by one or two digits; otherwise it groups thousands.
fn normalize_amount(raw: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let (negative, digits) = match kept.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, kept.as_str()),
    };
    if digits.is_empty() || digits.contains('-') {
        return None;
    }

    let occurrences = |at: usize| {
        let separator = digits.as_bytes()[at];
        digits.bytes().filter(|b| *b == separator).count()
    };

    let decimal = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let at = dot.max(comma);
            if occurrences(at) != 1 {
                return None;
            }
            Some(at)
        }
        (Some(at), None) | (None, Some(at)) => {
            let fraction = digits.len() - at - 1;
            (occurrences(at) == 1 && (1..=2).contains(&fraction)).then_some(at)
        }
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(kept.len());
    if negative {
        normalized.push('-');
    }
    for (index, c) in digits.char_indices() {
        match c {
            '.' | ',' if Some(index) == decimal => normalized.push('.'),
            '.' | ',' => {}
            _ => normalized.push(c),
        }
    }

    Some(normalized)
}

/// Reads a tax ID written as a number or as text with separators.
fn tax_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(raw) => Ok(raw
            .chars()
            .filter(|c| !matches!(c, '-' | '.') && !c.is_whitespace())
            .collect()),
        Value::Number(number) => match (number.as_u64(), number.as_f64()) {
            (Some(digits), _) => Ok(digits.to_string()),
            (None, Some(float)) if float.fract() == 0.0 && float >= 0.0 => {
                Ok(format!("{float:.0}"))
            }
            _ => Err(de::Error::custom(format!("invalid tax ID {number}"))),
        },
        other => Err(de::Error::custom(format!(
            "expected a tax ID, got {}",
            json_type(&other)
        ))),
    }
}

/// Reads a free-text field, accepting numbers written without quotes.
fn text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(raw) => Ok(raw.trim().to_owned()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!(
            "expected text, got {}",
            json_type(&other)
        ))),
    }
}
