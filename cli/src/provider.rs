// Scripted attribution for desktop launches
//
// Replays conversion and deep-link payloads from JSON files. Without a
// conversion file the provider never calls back, so the launch exercises the
// attribution deadline.

use anyhow::{Context, Result};
use launchgate_core::attribution::DeepLink;
use launchgate_core::{AttributionData, AttributionListeners, AttributionProvider, DeepLinkResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub struct ScriptedProvider {
    conversion: Option<AttributionData>,
    deep_link: Option<AttributionData>,
    attribution_id: Option<String>,
    pending: Mutex<Vec<Arc<AttributionListeners>>>,
}

impl ScriptedProvider {
    pub fn new(
        conversion: Option<AttributionData>,
        deep_link: Option<AttributionData>,
        attribution_id: Option<String>,
    ) -> Self {
        Self {
            conversion,
            deep_link,
            attribution_id,
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl AttributionProvider for ScriptedProvider {
    fn start(&self, listeners: Arc<AttributionListeners>) {
        tracing::debug!("Scripted attribution provider started");

        if let Some(click_event) = &self.deep_link {
            let deep_link_value = click_event
                .get("deep_link_value")
                .and_then(Value::as_str)
                .map(str::to_string);
            listeners.on_deep_link(DeepLinkResult::Found(DeepLink {
                deep_link_value,
                click_event: click_event.clone(),
            }));
        }

        match &self.conversion {
            Some(data) => listeners.on_conversion_data(data.clone()),
            None => self.pending.lock().push(listeners),
        }
    }

    fn attribution_id(&self) -> Option<String> {
        self.attribution_id.clone()
    }
}

/// Read a JSON object from `path`
pub fn load_payload(path: &Path) -> Result<AttributionData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchgate_core::attribution::HttpConversionRequery;
    use launchgate_core::settings::AttributionSettings;
    use launchgate_core::AttributionAggregator;
    use serde_json::json;
    use std::time::Duration;

    fn requery() -> Arc<HttpConversionRequery> {
        Arc::new(HttpConversionRequery::new(
            &AttributionSettings::default(),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_without_conversion_listeners_are_held() {
        let provider = Arc::new(ScriptedProvider::new(None, None, None));
        let aggregator = AttributionAggregator::new(provider.clone(), requery());

        let snapshot = aggregator.collect(Duration::from_millis(20)).await;

        assert!(snapshot.conversion_data.is_empty());
        assert_eq!(provider.pending.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_replays_conversion_and_deep_link() {
        let conversion = match json!({"af_status": "Non-organic", "campaign": "x"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let deep_link = match json!({"deep_link_value": "promo"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let provider = Arc::new(ScriptedProvider::new(
            Some(conversion.clone()),
            Some(deep_link),
            Some("af-1".to_string()),
        ));
        let aggregator = AttributionAggregator::new(provider.clone(), requery());

        let snapshot = aggregator.collect(Duration::from_secs(5)).await;

        assert_eq!(snapshot.conversion_data, conversion);
        assert_eq!(snapshot.deep_link_data.unwrap()["deep_link_value"], "promo");
        assert!(provider.pending.lock().is_empty());
        assert_eq!(aggregator.attribution_id(), "af-1");
    }

    #[test]
    fn test_load_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversion.json");
        std::fs::write(&path, r#"{"af_status":"Non-organic","campaign":"x"}"#).unwrap();

        let data = load_payload(&path).unwrap();
        assert_eq!(data["campaign"], "x");
    }

    #[test]
    fn test_load_payload_rejects_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversion.json");
        std::fs::write(&path, "[]").unwrap();

        assert!(load_payload(&path).is_err());
    }
}
