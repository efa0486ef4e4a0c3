//! # Orebook Core
//!
//! Domain contracts for the orebook financial fact engine: the pieces that
//! turn noisy multi-source financial figures into canonical numeric facts.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Company, ticker, timestamps, raw payloads, snapshots |
//! | [`fields`] | Declarative field vocabulary (name → rule → column) |
//! | [`sanitize`](mod@sanitize) | Free-text figure parsing |
//! | [`reconcile`](mod@reconcile) | Priority-ordered multi-source merging |
//! | [`fx`] | Exchange rate table with documented fallbacks |
//! | [`retry`] | Bounded retry executor with full-jitter backoff |
//! | [`source`] | Fetch collaborator trait and error taxonomy |
//!
//! The pipeline for one company is strictly sequential:
//!
//! ```text
//! fetch (FactSource, retried) → sanitize → reconcile → convert → snapshot
//! ```
//!
//! Everything in this crate is deterministic and I/O-free apart from the
//! retry executor's timers; persistence lives in `orebook-store` and
//! orchestration in `orebook-engine`.

pub mod domain;
pub mod error;
pub mod fields;
pub mod fx;
pub mod reconcile;
pub mod retry;
pub mod sanitize;
pub mod source;

pub use domain::{Company, FinancialSnapshot, RawFieldMap, RawValue, SnapshotField, Ticker, UtcDateTime};
pub use error::ValidationError;
pub use fields::{field_spec, FieldSpec, FIELDS, MIN_PLAUSIBLE_MAGNITUDE};
pub use fx::{RateEntry, RateTable, FALLBACK_RATES};
pub use reconcile::{reconcile, MergedRecord, MergedValue, SourceFields};
pub use retry::{execute, FailureReason, RetryPolicy};
pub use sanitize::sanitize;
pub use source::{FactSource, FetchError, SourceId};
