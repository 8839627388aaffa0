//! Response schema describing the receipt list.
//!
//! Written in the OpenAPI subset recognition services accept for structured
//! output. `total` is requested so the subtotal can be re-derived, but never
//! reaches an [`ExtractedRecord`](taxscan_core::ExtractedRecord).

use serde_json::{Value, json};

/// Fields every receipt object must carry.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "rnc", "ncf", "date", "total", "subtotal", "itbis", "isc", "tips",
];

/// Returns the schema of an array of receipt objects.
pub fn receipt_list_schema() -> Value {
    let amount = |description: &str| json!({ "type": "NUMBER", "description": description });

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "rnc": { "type": "STRING", "description": "Vendor RNC or cédula, digits only" },
                "ncf": { "type": "STRING", "description": "Fiscal document number" },
                "date": { "type": "STRING", "description": "Issue date, DD/MM/YYYY" },
                "total": amount("Final amount paid"),
                "subtotal": amount("Total minus ITBIS"),
                "itbis": amount("ITBIS"),
                "isc": amount("Selective consumption tax"),
                "other_taxes": amount("Other taxes and fees"),
                "tips": amount("Legal tip"),
            },
            "required": REQUIRED_FIELDS,
            "propertyOrdering": [
                "rnc", "ncf", "date", "total", "subtotal", "itbis", "isc", "other_taxes", "tips",
            ],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let schema = receipt_list_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["type"], "OBJECT");
        assert_eq!(schema["items"]["properties"]["itbis"]["type"], "NUMBER");
        assert_eq!(schema["items"]["required"].as_array().unwrap().len(), 8);
    }
}
