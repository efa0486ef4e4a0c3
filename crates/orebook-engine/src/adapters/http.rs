use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;

use orebook_core::{Company, FactSource, FetchError, RawFieldMap, RawValue, SourceId, UtcDateTime};

/// Expected collaborator response shape.
#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    fields: HashMap<String, RawValue>,
}

/// Reqwest-backed JSON collaborator adapter.
///
/// Performs single attempts only; retry and per-attempt timeout policy live
/// in the caller's retry executor.
#[derive(Debug, Clone)]
pub struct HttpFactSource {
    id: SourceId,
    priority: u8,
    base_url: String,
    client: reqwest::Client,
}

impl HttpFactSource {
    pub fn new(id: SourceId, priority: u8, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("orebook/0.1.0")
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            id,
            priority,
            base_url: base_url.into(),
            client,
        }
    }

    fn url_for(&self, company: &Company) -> String {
        format!(
            "{}/v1/financials/{}",
            self.base_url.trim_end_matches('/'),
            company.ticker.as_str()
        )
    }
}

impl FactSource for HttpFactSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn fetch<'a>(
        &'a self,
        company: &'a Company,
    ) -> Pin<Box<dyn Future<Output = Result<RawFieldMap, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url_for(company))
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            let payload: ApiPayload = response.json().await.map_err(|error| {
                if error.is_decode() {
                    FetchError::Malformed(error.to_string())
                } else {
                    transport_error(error)
                }
            })?;

            let mut raw = RawFieldMap::new(self.id, payload.currency, UtcDateTime::now());
            for (field, value) in payload.fields {
                raw.insert(field, value);
            }
            Ok(raw)
        })
    }
}

fn transport_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orebook_core::Ticker;

    #[test]
    fn url_is_built_from_base_and_ticker() {
        let source = HttpFactSource::new(SourceId::PrimaryApi, 0, "https://api.example.com/");
        let company = Company::new(6, Ticker::parse("XOM").expect("ticker"), "Exxon Mobil", None);
        assert_eq!(
            source.url_for(&company),
            "https://api.example.com/v1/financials/XOM"
        );
    }

    #[test]
    fn payload_accepts_mixed_raw_values() {
        let payload: ApiPayload = serde_json::from_str(
            r#"{"currency":"CAD","fields":{"market_cap_value":"$450.2B","shares_outstanding":4100000000,"ebitda":null}}"#,
        )
        .expect("payload");
        assert_eq!(payload.currency.as_deref(), Some("CAD"));
        assert_eq!(payload.fields.len(), 3);
    }
}
