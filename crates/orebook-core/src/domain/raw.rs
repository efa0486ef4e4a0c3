use std::collections::HashMap;

use serde::Deserialize;

use crate::{SourceId, UtcDateTime};

/// One raw value as produced by a fetch collaborator: free text, a bare
/// number, or an explicit null.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Transient fetch result: field name → raw value, tagged with the source
/// that produced it and an optional currency hint. Consumed once per fetch
/// cycle and discarded; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFieldMap {
    pub source: SourceId,
    pub currency_hint: Option<String>,
    pub fetched_at: UtcDateTime,
    values: HashMap<String, RawValue>,
}

impl RawFieldMap {
    pub fn new(source: SourceId, currency_hint: Option<String>, fetched_at: UtcDateTime) -> Self {
        Self {
            source,
            currency_hint,
            fetched_at,
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.values.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
