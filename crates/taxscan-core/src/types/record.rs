//! Receipt records produced by the extraction step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing monetary amounts.
pub const AMOUNT_TOLERANCE: f64 = 0.005;

/// One receipt found within a scanned document.
///
/// A document may yield zero or more records (a multi-page PDF may hold several
/// receipts). The transient `total` read from the receipt is never part of the
/// record: by the time a record exists, `subtotal = total - itbis` has been
/// re-derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Vendor tax ID (RNC or cédula), digits only.
    pub rnc: String,
    /// Fiscal document number (NCF / e-NCF).
    pub ncf: String,
    /// Receipt date as printed, normalized to `DD/MM/YYYY` by the service.
    pub date: String,
    /// Base amount before taxes and tips.
    pub subtotal: f64,
    /// Primary consumption tax (ITBIS).
    pub itbis: f64,
    /// Selective consumption tax (ISC).
    pub isc: f64,
    /// Any other taxes or fees.
    pub other_taxes: f64,
    /// Legal tip (10% de ley).
    pub tips: f64,
}

impl ExtractedRecord {
    /// Returns the amount the vendor charged: base plus every tax and the tip.
    pub fn charged_total(&self) -> f64 {
        round_cents(self.subtotal + self.itbis + self.isc + self.other_taxes + self.tips)
    }
}

/// Rounds an amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Returns true if two amounts are equal to the cent.
pub fn amounts_match(left: f64, right: f64) -> bool {
    (left - right).abs() < AMOUNT_TOLERANCE
}

/// Emitted when the service's subtotal disagrees with `total - itbis`.
///
/// The record keeps the derived value; the warning never fails the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    /// Position of the record within the document's record list.
    pub record_index: usize,
    /// NCF of the affected record, for display.
    pub ncf: String,
    /// Subtotal reported by the recognition service.
    pub reported_subtotal: f64,
    /// Subtotal recomputed from the transient total.
    pub derived_subtotal: f64,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {} ({}): reported subtotal {:.2} differs from total - itbis = {:.2}",
            self.record_index, self.ncf, self.reported_subtotal, self.derived_subtotal
        )
    }
}
