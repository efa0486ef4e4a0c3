//! Fetch collaborator contract.
//!
//! Anything that can produce a [`RawFieldMap`] for a company (an HTTP
//! financial API, a scraped verification feed, a test fixture) implements
//! [`FactSource`]. The engine only ever sees this trait; browser automation
//! and selector heuristics live on the far side of it.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Company, RawFieldMap, ValidationError};

/// Canonical source identifiers used for reconciliation priority and
/// provenance tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Primary market-data API.
    PrimaryApi,
    /// Secondary scraped verification source.
    Verification,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryApi => "primary_api",
            Self::Verification => "verification",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary_api" => Ok(Self::PrimaryApi),
            "verification" => Ok(Self::Verification),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

/// Failure classification for fetch attempts.
///
/// The retry executor uses [`FetchError::retryable`] to decide between
/// another attempt and giving up immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP-style status failure.
    Status(u16),
    /// The attempt exceeded its timeout budget.
    Timeout,
    /// Connection or transport-level failure.
    Transport(String),
    /// The collaborator responded with an unexpected shape.
    Malformed(String),
}

impl FetchError {
    /// Timeouts, transport errors, 5xx, and 429 are retryable; other 4xx
    /// and malformed responses are terminal.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "upstream returned status {status}"),
            Self::Timeout => f.write_str("attempt timed out"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Malformed(message) => write!(f, "malformed response: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetch collaborator contract.
///
/// Implementations must be `Send + Sync`; the run coordinator shares them
/// across concurrently in-flight company pipelines.
pub trait FactSource: Send + Sync {
    /// Identifier used for provenance and priority ordering.
    fn id(&self) -> SourceId;

    /// Reconciliation priority; lower values win field-level disagreement.
    fn priority(&self) -> u8;

    /// Fetch the raw field map for one company.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, upstream status errors,
    /// or an unexpected response shape. The caller wraps this in the retry
    /// executor; implementations should not retry internally.
    fn fetch<'a>(
        &'a self,
        company: &'a Company,
    ) -> Pin<Box<dyn Future<Output = Result<RawFieldMap, FetchError>> + Send + 'a>>;
}
