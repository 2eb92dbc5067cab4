//! Install attribution collection
//!
//! The provider SDK reports two independent events: a conversion
//! classification and (sometimes) a resolved deep link. `AttributionListeners`
//! turns those callbacks into one-shot channels so the aggregator can await a
//! single `AttributionSnapshot` per launch.

pub mod aggregator;
pub mod requery;

pub use aggregator::AttributionAggregator;
pub use requery::{ConversionRequery, HttpConversionRequery};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Free-form attribution payload as reported by the provider
pub type AttributionData = Map<String, Value>;

/// Status field the provider uses for its organic/non-organic classification
pub const AF_STATUS_KEY: &str = "af_status";
pub const ORGANIC_STATUS: &str = "Organic";

/// Sent in place of the attribution id when the provider has none yet
pub const UNKNOWN_ATTRIBUTION_ID: &str = "unknown-af-id";

#[derive(Debug, Clone, Error)]
pub enum AttributionError {
    #[error("Attribution request failed: {0}")]
    Transport(String),
    #[error("Attribution response could not be decoded: {0}")]
    Decode(String),
}

/// Result of one attribution collection. Lives for a single launch sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionSnapshot {
    pub conversion_data: AttributionData,
    pub deep_link_data: Option<AttributionData>,
}

/// A deep link resolved by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLink {
    pub deep_link_value: Option<String>,
    pub click_event: AttributionData,
}

impl DeepLink {
    pub fn into_data(self) -> AttributionData {
        let mut data = AttributionData::new();
        if let Some(value) = self.deep_link_value {
            data.insert("deep_link_value".to_string(), Value::String(value));
        }
        for (key, value) in self.click_event {
            data.insert(key, value);
        }
        data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeepLinkResult {
    Found(DeepLink),
    NotFound,
    Failed(String),
}

#[derive(Debug)]
pub(crate) enum ConversionEvent {
    Data(AttributionData),
    Failed(String),
}

/// Callback sinks handed to the provider when it is started.
///
/// Each sink delivers at most once; repeated callbacks are dropped.
pub struct AttributionListeners {
    conversion: Mutex<Option<oneshot::Sender<ConversionEvent>>>,
    deep_link: Mutex<Option<oneshot::Sender<AttributionData>>>,
}

pub(crate) type ListenerChannels = (
    Arc<AttributionListeners>,
    oneshot::Receiver<ConversionEvent>,
    oneshot::Receiver<AttributionData>,
);

impl AttributionListeners {
    pub(crate) fn channel() -> ListenerChannels {
        let (conversion_tx, conversion_rx) = oneshot::channel();
        let (deep_link_tx, deep_link_rx) = oneshot::channel();
        let listeners = Arc::new(Self {
            conversion: Mutex::new(Some(conversion_tx)),
            deep_link: Mutex::new(Some(deep_link_tx)),
        });
        (listeners, conversion_rx, deep_link_rx)
    }

    pub fn on_conversion_data(&self, data: AttributionData) {
        tracing::debug!("Conversion data received ({} keys)", data.len());
        self.deliver_conversion(ConversionEvent::Data(data));
    }

    pub fn on_conversion_failure(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Conversion data failed: {}", reason);
        self.deliver_conversion(ConversionEvent::Failed(reason));
    }

    pub fn on_deep_link(&self, result: DeepLinkResult) {
        match result {
            DeepLinkResult::Found(link) => {
                tracing::debug!("Deep link resolved");
                if let Some(tx) = self.deep_link.lock().take() {
                    let _ = tx.send(link.into_data());
                }
            }
            DeepLinkResult::NotFound => tracing::debug!("Deep link not found"),
            DeepLinkResult::Failed(reason) => tracing::warn!("Deep link error: {}", reason),
        }
    }

    fn deliver_conversion(&self, event: ConversionEvent) {
        match self.conversion.lock().take() {
            // The receiver may already be gone if the launch timed out.
            Some(tx) => {
                let _ = tx.send(event);
            }
            None => tracing::debug!("Ignoring repeated conversion callback"),
        }
    }
}

/// Device attribution SDK binding
pub trait AttributionProvider: Send + Sync {
    /// Start the SDK. Events for this launch are reported through `listeners`.
    fn start(&self, listeners: Arc<AttributionListeners>);

    /// Current device attribution id, if the SDK has assigned one
    fn attribution_id(&self) -> Option<String>;
}
