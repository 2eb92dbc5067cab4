// Server-side conversion lookup, used once when the SDK first reports an
// organic install.

use super::{AttributionData, AttributionError};
use crate::settings::AttributionSettings;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait ConversionRequery: Send + Sync {
    /// Fetch the provider's current conversion data for `device_id`
    async fn requery(&self, device_id: &str) -> Result<AttributionData, AttributionError>;
}

/// `GET {base}/{platform}/{app_id}?devkey=..&device_id=..`
pub struct HttpConversionRequery {
    agent: ureq::Agent,
    endpoint: String,
    dev_key: String,
}

impl HttpConversionRequery {
    pub fn new(settings: &AttributionSettings, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: format!(
                "{}/{}/{}",
                settings.requery_base.trim_end_matches('/'),
                settings.platform,
                settings.app_id
            ),
            dev_key: settings.dev_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConversionRequery for HttpConversionRequery {
    async fn requery(&self, device_id: &str) -> Result<AttributionData, AttributionError> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let dev_key = self.dev_key.clone();
        let device_id = device_id.to_string();

        tokio::task::spawn_blocking(move || {
            let response = agent
                .get(&endpoint)
                .query("devkey", &dev_key)
                .query("device_id", &device_id)
                .call()
                .map_err(|e| AttributionError::Transport(e.to_string()))?;
            let body = response
                .into_string()
                .map_err(|e| AttributionError::Transport(e.to_string()))?;
            parse_conversion_body(&body)
        })
        .await
        .map_err(|e| AttributionError::Transport(e.to_string()))?
    }
}

/// The lookup must return a JSON object; anything else is a decode error
pub fn parse_conversion_body(body: &str) -> Result<AttributionData, AttributionError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AttributionError::Decode(
            "expected a JSON object".to_string(),
        )),
        Err(e) => Err(AttributionError::Decode(e.to_string())),
    }
}
