//! Records scraped from the fiscal registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Registry field holding the taxpayer's status (e.g. `ACTIVO`).
pub const FIELD_STATUS: &str = "Estado";

/// Registry field holding the taxpayer's legal name.
pub const FIELD_NAME: &str = "Nombre/Razón Social";

/// Open key/value record scraped from the registry's result table.
///
/// The registry publishes no contract for the set of keys, so the record is an
/// open mapping rather than a fixed structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Tax ID the registry was queried with.
    pub tax_id: String,
    /// Scraped label/value pairs.
    pub fields: HashMap<String, String>,
}

impl RegistryRecord {
    /// Creates an empty record for the given tax ID.
    pub fn new(tax_id: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.into(),
            fields: HashMap::new(),
        }
    }

    /// Adds a field to the record.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the value scraped for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns the taxpayer status, if the registry reported one.
    pub fn status(&self) -> Option<&str> {
        self.get(FIELD_STATUS)
    }

    /// Returns the taxpayer's legal name, falling back to any `Nombre*` label.
    pub fn name(&self) -> Option<&str> {
        self.get(FIELD_NAME).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.starts_with("Nombre"))
                .map(|(_, value)| value.as_str())
        })
    }

    /// Returns true when the registry lists the taxpayer as active.
    pub fn is_active(&self) -> bool {
        self.status()
            .is_some_and(|status| status.eq_ignore_ascii_case("ACTIVO"))
    }

    /// Returns the number of scraped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field was scraped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the record and returns the raw field map.
    pub fn into_fields(self) -> HashMap<String, String> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_fields() {
        let record = RegistryRecord::new("131563856")
            .with_field("Nombre/Razón Social", "CERVECERIA NACIONAL DOMINICANA SA")
            .with_field("Estado", "ACTIVO");

        assert_eq!(record.name(), Some("CERVECERIA NACIONAL DOMINICANA SA"));
        assert_eq!(record.status(), Some("ACTIVO"));
        assert!(record.is_active());
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_name_falls_back_to_any_nombre_label() {
        let record = RegistryRecord::new("101").with_field("Nombre", "ACME SRL");
        assert_eq!(record.name(), Some("ACME SRL"));
        assert!(!record.is_active());
    }
}
