//! Domain types for the financial fact engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Company`] | Tracked company with stable id and ticker |
//! | [`Ticker`] | Validated exchange ticker |
//! | [`UtcDateTime`] | RFC3339 UTC timestamp |
//! | [`RawValue`] / [`RawFieldMap`] | Transient fetch payloads |
//! | [`FinancialSnapshot`] | Validated write set for one company |

mod company;
mod raw;
mod snapshot;
mod ticker;
mod timestamp;

pub use company::Company;
pub use raw::{RawFieldMap, RawValue};
pub use snapshot::{FinancialSnapshot, SnapshotField};
pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
