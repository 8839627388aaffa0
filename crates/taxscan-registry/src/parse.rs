//! Scraping of the registry's result table.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::RegistryRecord;

/// Element ID of the table listing a taxpayer's registry data.
pub const RESULT_TABLE_ID: &str = "cphMain_dvDatosContribuyentes";

static RESULT_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("table#{RESULT_TABLE_ID}")).expect("valid table selector")
});
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));

/// Collapses every whitespace run of the element's text to a single space.
fn collapsed_text(element: ElementRef<'_>) -> String {
    collapse(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the postback response into a registry record.
///
/// Returns `None` when the result table is absent or has no usable row,
/// meaning the tax ID is not registered. Only rows with exactly two cells
/// are read; the first cell is the label (colons removed) and the second
/// its value.
pub fn parse_result_table(tax_id: &str, html: &str) -> Option<RegistryRecord> {
    let document = Html::parse_document(html);
    let table = document.select(&RESULT_TABLE).next()?;

    let record = table
        .select(&ROW)
        .filter_map(|row| {
            let cells: Vec<_> = row.select(&CELL).collect();
            let [label, value] = cells.as_slice() else {
                return None;
            };

            let label: String = label.text().collect();
            let key = collapse(&label.replace(':', ""));
            (!key.is_empty()).then(|| (key, collapsed_text(*value)))
        })
        .fold(RegistryRecord::new(tax_id), |record, (key, value)| {
            record.with_field(key, value)
        });

    (!record.is_empty()).then_some(record)
}
