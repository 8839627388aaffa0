//! The `validate` command.

use taxscan_core::{is_valid_fiscal_document_number, is_valid_tax_id};

use crate::config::ValidateArgs;
use crate::report::{ValidationReport, write_json};

pub async fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    let reports: Vec<ValidationReport> = args.values.into_iter().map(validate).collect();
    write_json(&reports, None).await
}

fn validate(value: String) -> ValidationReport {
    ValidationReport {
        tax_id_valid: is_valid_tax_id(&value),
        ncf_valid: is_valid_fiscal_document_number(&value),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_classifies_values() {
        let rnc = validate("1-31-56385-6".into());
        assert!(rnc.tax_id_valid);
        assert!(!rnc.ncf_valid);

        let ncf = validate("E310000000001".into());
        assert!(!ncf.tax_id_valid);
        assert!(ncf.ncf_valid);
    }
}
