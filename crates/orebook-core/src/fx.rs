//! Exchange rate table: read-mostly, loaded once per run.
//!
//! Lookups are strictly directed, with no inverse or transitive derivation. A
//! missing pair degrades the conversion to `None` and logs the gap; it never
//! raises. Fixed fallback defaults cover a small documented set of pairs so
//! a run never blocks on missing rate data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One persisted exchange rate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub fetch_date: String,
}

/// Hardcoded last-resort rates, injected only when the persisted table has
/// no entry for the pair. Documented here, never invented at runtime.
pub const FALLBACK_RATES: [(&str, &str, f64); 4] = [
    ("CAD", "USD", 0.73),
    ("AUD", "USD", 0.65),
    ("EUR", "USD", 1.08),
    ("GBP", "USD", 1.27),
];

/// In-memory directed rate lookup table.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(String, String), f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from persisted rows. Non-finite or non-positive rates
    /// are discarded.
    pub fn from_entries(entries: &[RateEntry]) -> Self {
        let mut table = Self::new();
        for entry in entries {
            if entry.rate.is_finite() && entry.rate > 0.0 {
                table.insert(&entry.from_currency, &entry.to_currency, entry.rate);
            }
        }
        table
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: f64) {
        self.rates.insert(
            (from.to_ascii_uppercase(), to.to_ascii_uppercase()),
            rate,
        );
    }

    /// Inject [`FALLBACK_RATES`] for pairs the persisted table did not
    /// cover, logging each injection as a degraded-confidence rate.
    pub fn with_fallback_defaults(mut self) -> Self {
        for (from, to, rate) in FALLBACK_RATES {
            let key = (from.to_owned(), to.to_owned());
            if !self.rates.contains_key(&key) {
                tracing::warn!(from, to, rate, "using hardcoded fallback exchange rate");
                self.rates.insert(key, rate);
            }
        }
        self
    }

    /// Directed rate lookup. `rate(c, c)` is always `1.0`; missing pairs are
    /// `None` with no inverse or transitive derivation.
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();
        if from == to {
            return Some(1.0);
        }
        self.rates.get(&(from, to)).copied()
    }

    /// Convert an amount between currencies. A missing pair logs a
    /// conversion-failure event and returns `None` rather than erroring.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        match self.rate(from, to) {
            Some(rate) => Some(amount * rate),
            None => {
                tracing::warn!(from, to, "no exchange rate for pair, dropping conversion");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
