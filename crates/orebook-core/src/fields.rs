//! Declarative field vocabulary shared by the sanitizer, reconciler, and
//! upsert write-set builder.
//!
//! Each entry maps a raw field name from a fetch collaborator to its storage
//! column, whether it carries a `_currency` sibling column, and an optional
//! minimum-plausibility threshold. Keeping the vocabulary in one table is
//! what stops the parse rules and the schema from drifting apart.

/// Parse/storage rule for one financial field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field name as produced by fetch collaborators.
    pub name: &'static str,
    /// Column name in the `financials` table.
    pub column: &'static str,
    /// Monetary fields get a `<column>_currency` sibling and are converted
    /// to the storage currency before persistence.
    pub monetary: bool,
    /// Values below this magnitude are presumed scraping artifacts and are
    /// dropped before the write set is built.
    pub min_plausible: Option<f64>,
}

impl FieldSpec {
    /// Name of the `_currency` sibling column, for monetary fields.
    pub fn currency_column(&self) -> Option<String> {
        self.monetary.then(|| format!("{}_currency", self.column))
    }
}

/// Minimum magnitude for market capitalization and share counts. Anything
/// smaller is a parsing or scraping artifact, not a real figure.
pub const MIN_PLAUSIBLE_MAGNITUDE: f64 = 1_000_000.0;

/// The fixed field vocabulary accepted from fetch collaborators.
pub const FIELDS: [FieldSpec; 9] = [
    FieldSpec {
        name: "market_cap_value",
        column: "market_cap_value",
        monetary: true,
        min_plausible: Some(MIN_PLAUSIBLE_MAGNITUDE),
    },
    FieldSpec {
        name: "revenue_value",
        column: "revenue_value",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "net_income_value",
        column: "net_income_value",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "cash_value",
        column: "cash_value",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "debt_value",
        column: "debt_value",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "liabilities",
        column: "liabilities",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "shares_outstanding",
        column: "shares_outstanding",
        monetary: false,
        min_plausible: Some(MIN_PLAUSIBLE_MAGNITUDE),
    },
    FieldSpec {
        name: "ebitda",
        column: "ebitda",
        monetary: true,
        min_plausible: None,
    },
    FieldSpec {
        name: "free_cash_flow",
        column: "free_cash_flow",
        monetary: true,
        min_plausible: None,
    },
];

/// Look up a field spec by its collaborator-facing name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_names_are_unique() {
        for (index, spec) in FIELDS.iter().enumerate() {
            assert!(
                FIELDS[index + 1..].iter().all(|other| other.name != spec.name),
                "duplicate field name '{}'",
                spec.name
            );
        }
    }

    #[test]
    fn monetary_fields_have_currency_siblings() {
        let spec = field_spec("market_cap_value").expect("known field");
        assert_eq!(
            spec.currency_column().as_deref(),
            Some("market_cap_value_currency")
        );

        let shares = field_spec("shares_outstanding").expect("known field");
        assert_eq!(shares.currency_column(), None);
    }

    #[test]
    fn plausibility_thresholds_cover_cap_and_shares() {
        assert_eq!(
            field_spec("market_cap_value").and_then(|spec| spec.min_plausible),
            Some(MIN_PLAUSIBLE_MAGNITUDE)
        );
        assert_eq!(
            field_spec("shares_outstanding").and_then(|spec| spec.min_plausible),
            Some(MIN_PLAUSIBLE_MAGNITUDE)
        );
        assert_eq!(
            field_spec("revenue_value").and_then(|spec| spec.min_plausible),
            None
        );
    }
}
