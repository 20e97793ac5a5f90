use crate::normalization::LookupCandidates;
use crate::transport::{HttpTransport, TransportError};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use url::Url;

lazy_static! {
    // Field scan instead of a schema: the service adds fields freely
    static ref VOTES_FIELD: Regex = Regex::new(r#""votes"\s*:\s*(\d+)"#).unwrap();
    static ref RATING_FIELD: Regex = Regex::new(r#""rating"\s*:\s*"([^"]+)""#).unwrap();
}

/// Result of one lookup round across all candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    pub succeeded: bool,
    pub votes: u32,
    pub rating: String,
    pub raw_body: String,
}

impl LookupResult {
    pub fn failed() -> Self {
        Self::default()
    }

    /// Build a successful result from a response body.
    ///
    /// Missing or unparsable fields default to `0` / empty.
    pub fn from_body(body: &str) -> Self {
        Self {
            succeeded: true,
            votes: extract_votes(body),
            rating: extract_rating(body),
            raw_body: body.to_string(),
        }
    }
}

pub fn extract_votes(body: &str) -> u32 {
    VOTES_FIELD
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

pub fn extract_rating(body: &str) -> String {
    RATING_FIELD
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Client for the number reputation service (`GET {base}/num/{number}`).
pub struct ReputationClient {
    transport: Arc<dyn HttpTransport>,
    api_base: Url,
    bearer_token: String,
    country_code: String,
}

impl ReputationClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_base: &str,
        bearer_token: impl Into<String>,
        country_code: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let api_base = Url::parse(api_base)?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry a path: {api_base}");
        }

        Ok(Self {
            transport,
            api_base,
            bearer_token: bearer_token.into(),
            country_code: country_code.into(),
        })
    }

    /// URL for one candidate, e.g. `https://host/api/num/4989123?format=json`.
    pub fn lookup_url(&self, candidate: &str) -> Result<String, TransportError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .push("num")
            .push(candidate);
        url.set_query(Some("format=json"));
        Ok(url.to_string())
    }

    /// Look up a normalized number, trying each candidate format in order.
    ///
    /// The first 2xx response wins even if it carries no votes. Transport
    /// errors and error statuses move on to the next candidate; nothing is
    /// retried.
    pub async fn lookup(&self, normalized: &str) -> LookupResult {
        for candidate in LookupCandidates::with_country_code(normalized, &self.country_code) {
            let url = match self.lookup_url(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    log::warn!("PhoneBlock LOOKUP skip try='{candidate}': {e}");
                    continue;
                }
            };

            match self.transport.get_json(&url, &self.bearer_token).await {
                Ok(reply) => {
                    log::info!(
                        "PhoneBlock LOOKUP try='{candidate}' status={}",
                        reply.status
                    );
                    if !reply.is_success() {
                        continue;
                    }

                    let result = LookupResult::from_body(&reply.body);
                    log::debug!(
                        "Lookup for {candidate}: votes={} rating='{}'",
                        result.votes,
                        result.rating
                    );
                    return result;
                }
                Err(e) => {
                    log::info!("PhoneBlock LOOKUP EXC try='{candidate}': {e}");
                }
            }
        }

        LookupResult::failed()
    }
}
