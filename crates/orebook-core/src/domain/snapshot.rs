use crate::fields::FieldSpec;
use crate::{MergedRecord, RateTable, UtcDateTime};

/// One validated field ready for persistence, converted to the storage
/// currency and past the plausibility gate.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotField {
    pub spec: &'static FieldSpec,
    pub value: f64,
    /// Storage currency for monetary fields, `None` for counts.
    pub currency: Option<String>,
}

/// Validated per-company snapshot: only the fields that survived
/// sanitization, currency conversion, and plausibility gating. This is the
/// exact write set handed to the store.
#[derive(Debug, Clone)]
pub struct FinancialSnapshot {
    pub fields: Vec<SnapshotField>,
    pub data_source: String,
    pub as_of: UtcDateTime,
}

impl FinancialSnapshot {
    /// Build a validated snapshot from a merged record.
    ///
    /// Monetary fields are converted into `storage_currency`; a missing
    /// exchange rate drops the field (logged as degraded, never an error).
    /// Fields below their plausibility minimum are dropped so an implausible
    /// figure can never overwrite a previously stored value.
    pub fn from_merged(
        merged: &MergedRecord,
        rates: &RateTable,
        storage_currency: &str,
        as_of: UtcDateTime,
    ) -> Self {
        let mut fields = Vec::new();

        for spec in &crate::fields::FIELDS {
            let Some(candidate) = merged.get(spec.name) else {
                continue;
            };

            let value = if spec.monetary {
                match rates.convert(candidate.value, &candidate.currency, storage_currency) {
                    Some(converted) => converted,
                    None => {
                        tracing::warn!(
                            field = spec.name,
                            currency = %candidate.currency,
                            "conversion failed, dropping field"
                        );
                        continue;
                    }
                }
            } else {
                candidate.value
            };

            if !value.is_finite() {
                continue;
            }

            if let Some(min) = spec.min_plausible {
                if value.abs() < min {
                    tracing::warn!(
                        field = spec.name,
                        value,
                        min,
                        "implausible value, dropping field"
                    );
                    continue;
                }
            }

            fields.push(SnapshotField {
                spec,
                value,
                currency: spec.monetary.then(|| storage_currency.to_owned()),
            });
        }

        Self {
            fields,
            data_source: merged.data_source(),
            as_of,
        }
    }

    /// Whether the snapshot carries any substantive field beyond metadata.
    pub fn has_data(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&SnapshotField> {
        self.fields.iter().find(|field| field.spec.name == name)
    }
}
