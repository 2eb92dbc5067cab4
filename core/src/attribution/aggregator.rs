//! Single-shot attribution collection with an organic re-query and a
//! launch-wide deadline.

use super::{
    AttributionData, AttributionListeners, AttributionProvider, AttributionSnapshot,
    ConversionEvent, ConversionRequery, AF_STATUS_KEY, ORGANIC_STATUS, UNKNOWN_ATTRIBUTION_ID,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_ORGANIC_GRACE: Duration = Duration::from_millis(5_000);

pub struct AttributionAggregator {
    provider: Arc<dyn AttributionProvider>,
    requery: Arc<dyn ConversionRequery>,
    organic_grace: Duration,
}

impl AttributionAggregator {
    pub fn new(provider: Arc<dyn AttributionProvider>, requery: Arc<dyn ConversionRequery>) -> Self {
        Self {
            provider,
            requery,
            organic_grace: DEFAULT_ORGANIC_GRACE,
        }
    }

    pub fn with_organic_grace(mut self, grace: Duration) -> Self {
        self.organic_grace = grace;
        self
    }

    pub fn attribution_id(&self) -> String {
        self.provider
            .attribution_id()
            .unwrap_or_else(|| UNKNOWN_ATTRIBUTION_ID.to_string())
    }

    /// Start the provider and wait for its conversion data, or `timeout`,
    /// whichever comes first. Never fails: errors and timeouts resolve to
    /// empty conversion data.
    ///
    /// Deep-link data is included only if it arrived before resolution.
    pub async fn collect(&self, timeout: Duration) -> AttributionSnapshot {
        let (listeners, conversion_rx, mut deep_link_rx) = AttributionListeners::channel();
        self.provider.start(listeners);

        let conversion_data =
            match tokio::time::timeout(timeout, self.resolve_conversion(conversion_rx)).await {
                Ok(data) => data,
                Err(_) => {
                    tracing::warn!(
                        "Timed out after {:?} waiting for conversion data",
                        timeout
                    );
                    AttributionData::new()
                }
            };

        let deep_link_data = deep_link_rx.try_recv().ok();
        tracing::info!(
            "Attribution collected: {} conversion keys, deep link {}",
            conversion_data.len(),
            if deep_link_data.is_some() { "present" } else { "absent" }
        );

        AttributionSnapshot {
            conversion_data,
            deep_link_data,
        }
    }

    async fn resolve_conversion(
        &self,
        conversion_rx: oneshot::Receiver<ConversionEvent>,
    ) -> AttributionData {
        match conversion_rx.await {
            Ok(ConversionEvent::Data(data)) => self.requery_if_organic(data).await,
            Ok(ConversionEvent::Failed(_)) => AttributionData::new(),
            Err(_) => {
                // Listeners dropped without a callback: nothing will arrive,
                // so leave the outcome to the deadline.
                tracing::debug!("Attribution provider released its listeners");
                std::future::pending().await
            }
        }
    }

    async fn requery_if_organic(&self, data: AttributionData) -> AttributionData {
        let status = match data.get(AF_STATUS_KEY).and_then(Value::as_str) {
            Some(status) => status,
            None => {
                tracing::debug!("No {} in conversion data", AF_STATUS_KEY);
                return data;
            }
        };

        if status != ORGANIC_STATUS {
            return data;
        }

        tracing::info!(
            "Organic install reported, re-querying in {:?}",
            self.organic_grace
        );
        tokio::time::sleep(self.organic_grace).await;

        let device_id = self.attribution_id();
        match self.requery.requery(&device_id).await {
            Ok(fresh) => {
                tracing::info!("Using re-queried conversion data");
                fresh
            }
            Err(e) => {
                tracing::warn!("Conversion re-query failed, keeping original: {}", e);
                data
            }
        }
    }
}
