use serde::{Deserialize, Serialize};

use crate::Ticker;

/// A tracked company. Identity (`id`, `ticker`) is immutable once created;
/// only the descriptive payload is human-editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub ticker: Ticker,
    pub name: String,
    pub description: Option<String>,
}

impl Company {
    pub fn new(
        id: i64,
        ticker: Ticker,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            ticker,
            name: name.into(),
            description,
        }
    }
}
