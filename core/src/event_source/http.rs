//! Primary read path: a narrow JSON-over-HTTP contract against an external
//! normalization service (spec §4.1). Does not expose attribute series or
//! context-tagged reads; those are fallback-only.

use super::{AttributeSample, EntityFilter, EventSource};
use crate::types::{Event, TimeWindow};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EventsResponse {
    events: Vec<Event>,
}

/// Grounded on the teacher's `reqwest`-backed provider clients (e.g.
/// `OpenAIEmbeddingProvider`): a bounded-timeout `reqwest::Client`, a base
/// URL, and a thin typed response.
pub struct HttpEventSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventSource {
    /// # Errors
    /// Returns `Error::SourceUnavailable` if the HTTP client cannot be built
    /// (e.g. TLS backend initialization failure).
    pub fn new(base_url: impl Into<String>, total_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(total_timeout)
            .build()
            .map_err(|e| Error::SourceUnavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_events(
        &self,
        window: TimeWindow,
        filter: Option<&EntityFilter>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let mut request = self
            .client
            .get(format!("{}/events", self.base_url))
            .query(&[
                ("start", window.start.to_rfc3339()),
                ("end", window.end.to_rfc3339()),
                ("limit", limit.to_string()),
            ]);
        if let Some(filter) = filter {
            if let Some(domains) = &filter.domains {
                request = request.query(&[("domains", domains.join(","))]);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("http transport error: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "http primary returned {}",
                response.status()
            )));
        }

        let body: EventsResponse = response
            .json()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("decoding events response: {e}")))?;

        if body.events.is_empty() && window.duration().num_seconds() > 0 {
            return Err(Error::SourceUnavailable(
                "http primary returned an empty result for a non-empty window".to_string(),
            ));
        }

        Ok(body
            .events
            .into_iter()
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .collect())
    }

    async fn fetch_attribute_series(
        &self,
        _window: TimeWindow,
        _attribute: &str,
    ) -> Result<Vec<AttributeSample>> {
        Err(Error::SourceUnavailable(
            "attribute series is not exposed by the http primary path".to_string(),
        ))
    }

    async fn fetch_context_tagged_events(
        &self,
        _window: TimeWindow,
        _context_tag: &str,
    ) -> Result<Vec<Event>> {
        Err(Error::SourceUnavailable(
            "context-tagged reads are not exposed by the http primary path".to_string(),
        ))
    }
}
