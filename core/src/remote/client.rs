// Config endpoint client
//
// `RemoteConfigClient` assembles the request body and decodes the answer;
// `ConfigTransport` performs the single JSON POST. Errors come back as
// `FetchError` values, never panics.

use super::params::{build_params, RequestContext};
use super::{ConfigResult, FetchError};
use crate::attribution::AttributionData;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait ConfigTransport: Send + Sync {
    /// POST `body` as JSON and return the raw response body
    async fn post_json(&self, body: Value) -> Result<String, FetchError>;
}

pub struct HttpConfigTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpConfigTransport {
    /// `timeout` bounds each socket operation; `None` uses ureq's defaults
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConfigTransport for HttpConfigTransport {
    async fn post_json(&self, body: Value) -> Result<String, FetchError> {
        let payload = serde_json::to_string(&body)
            .map_err(|e| FetchError::Server(format!("cannot encode request: {}", e)))?;
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || {
            let response = agent
                .post(&endpoint)
                .set("Content-Type", "application/json")
                .send_string(&payload)
                .map_err(classify_error)?;
            response.into_string().map_err(classify_body_error)
        })
        .await
        .map_err(|e| FetchError::Server(format!("request task failed: {}", e)))?
    }
}

fn classify_error(error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::Status(code, _) => FetchError::Server(format!("HTTP {}", code)),
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::Dns
            | ureq::ErrorKind::ConnectionFailed
            | ureq::ErrorKind::Io
            | ureq::ErrorKind::ProxyConnect => FetchError::Connectivity(transport.to_string()),
            _ => FetchError::Server(transport.to_string()),
        },
    }
}

/// A broken read is a network fault; an oversized or non-UTF-8 body came from
/// a live server.
fn classify_body_error(error: std::io::Error) -> FetchError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::Other | ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            FetchError::Server(format!("unreadable response body: {}", error))
        }
        _ => FetchError::Connectivity(format!("reading response: {}", error)),
    }
}

#[derive(Clone)]
pub struct RemoteConfigClient {
    transport: Arc<dyn ConfigTransport>,
}

impl RemoteConfigClient {
    pub fn new(transport: Arc<dyn ConfigTransport>) -> Self {
        Self { transport }
    }

    /// Merge attribution with `context` and fetch the config
    pub async fn fetch_config(
        &self,
        conversion_data: &AttributionData,
        deep_link_data: Option<&AttributionData>,
        context: &RequestContext,
    ) -> Result<ConfigResult, FetchError> {
        let params = build_params(conversion_data, deep_link_data, context);
        tracing::debug!("Requesting config with {} parameters", params.len());

        let body = self.transport.post_json(Value::Object(params)).await?;
        tracing::debug!("Config response: {}", body);

        serde_json::from_str(&body)
            .map_err(|e| FetchError::Server(format!("undecodable config response: {}", e)))
    }
}
