//! Source reconciler: merges per-field candidates from multiple sources
//! into one canonical record.
//!
//! The rule is first-wins by priority: for each field, the first source in
//! priority order that supplies a non-null post-sanitization value wins, and
//! later sources only fill fields left empty by earlier ones. Values are
//! never averaged or voted between sources, so every persisted figure can be
//! traced back to exactly one source.

use std::collections::HashMap;

use crate::fields::FIELDS;
use crate::{sanitize, RawFieldMap, SourceId};

/// Sanitized field set from one source, ready for merging.
#[derive(Debug, Clone)]
pub struct SourceFields {
    pub source: SourceId,
    pub priority: u8,
    pub currency_hint: Option<String>,
    pub values: HashMap<&'static str, f64>,
}

impl SourceFields {
    /// Run the sanitizer over every vocabulary field present in a raw map.
    /// Fields that fail sanitization are simply absent.
    pub fn from_raw(raw: &RawFieldMap, priority: u8) -> Self {
        let mut values = HashMap::new();
        for spec in &FIELDS {
            if let Some(raw_value) = raw.get(spec.name) {
                if let Some(value) = sanitize(raw_value, spec.name) {
                    values.insert(spec.name, value);
                }
            }
        }

        Self {
            source: raw.source,
            priority,
            currency_hint: raw.currency_hint.clone(),
            values,
        }
    }
}

/// One merged field with its winning source and source currency.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedValue {
    pub value: f64,
    pub source: SourceId,
    pub currency: String,
}

/// Canonical merged record for one company.
#[derive(Debug, Clone, Default)]
pub struct MergedRecord {
    pub values: HashMap<&'static str, MergedValue>,
    /// Sources that won at least one field, in priority order.
    pub contributing: Vec<SourceId>,
}

impl MergedRecord {
    pub fn get(&self, field: &str) -> Option<&MergedValue> {
        self.values.get(field)
    }

    /// Provenance string persisted as `data_source`.
    pub fn data_source(&self) -> String {
        self.contributing
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Merge sanitized source results by priority. `default_currency` applies
/// when a source carried no currency hint.
pub fn reconcile(sources: &[SourceFields], default_currency: &str) -> MergedRecord {
    let mut ordered: Vec<&SourceFields> = sources.iter().collect();
    ordered.sort_by_key(|fields| fields.priority);

    let mut merged = MergedRecord::default();
    for fields in &ordered {
        let currency = fields
            .currency_hint
            .clone()
            .unwrap_or_else(|| default_currency.to_owned());

        let mut contributed = false;
        for spec in &FIELDS {
            if merged.values.contains_key(spec.name) {
                continue;
            }
            if let Some(&value) = fields.values.get(spec.name) {
                merged.values.insert(
                    spec.name,
                    MergedValue {
                        value,
                        source: fields.source,
                        currency: currency.clone(),
                    },
                );
                contributed = true;
            }
        }

        if contributed {
            merged.contributing.push(fields.source);
        }
    }

    merged
}
