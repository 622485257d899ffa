//! Composes the HTTP primary and time-series fallback paths into the single
//! [`EventSource`] the rest of the pipeline depends on (spec §4.1).

use super::{AttributeSample, EntityFilter, EventSource, HttpEventSource, TimeSeriesEventSource};
use crate::types::{Event, TimeWindow};
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::warn;

/// Attribute series and context-tagged reads always go straight to the
/// fallback store — the HTTP primary does not expose them (spec §4.1).
pub struct FallbackEventSource {
    primary: HttpEventSource,
    fallback: TimeSeriesEventSource,
}

impl FallbackEventSource {
    #[must_use]
    pub fn new(primary: HttpEventSource, fallback: TimeSeriesEventSource) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl EventSource for FallbackEventSource {
    async fn fetch_events(
        &self,
        window: TimeWindow,
        filter: Option<&EntityFilter>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        match self.primary.fetch_events(window, filter, limit).await {
            Ok(events) => Ok(events),
            Err(primary_err) => {
                warn!(error = %primary_err, "event source primary path failed, falling back");
                self.fallback
                    .fetch_events(window, filter, limit)
                    .await
                    .map_err(|fallback_err| {
                        Error::SourceUnavailable(format!(
                            "primary failed ({primary_err}) and fallback failed ({fallback_err})"
                        ))
                    })
            }
        }
    }

    async fn fetch_attribute_series(
        &self,
        window: TimeWindow,
        attribute: &str,
    ) -> Result<Vec<AttributeSample>> {
        self.fallback.fetch_attribute_series(window, attribute).await
    }

    async fn fetch_context_tagged_events(
        &self,
        window: TimeWindow,
        context_tag: &str,
    ) -> Result<Vec<Event>> {
        self.fallback
            .fetch_context_tagged_events(window, context_tag)
            .await
    }
}
