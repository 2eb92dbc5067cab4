//! Push capability seen by the launch sequence: the current token and the
//! messaging project id, both optional.

use async_trait::async_trait;
use serde_json::Value;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Current registration token, if the platform has issued one
    async fn current_token(&self) -> Option<String>;

    /// Messaging project (or sender) id
    fn project_id(&self) -> Option<String>;
}

/// For shells without push support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPush;

#[async_trait]
impl PushProvider for NoPush {
    async fn current_token(&self) -> Option<String> {
        None
    }

    fn project_id(&self) -> Option<String> {
        None
    }
}

/// A fixed token and project id
#[derive(Debug, Clone, Default)]
pub struct StaticPush {
    pub token: Option<String>,
    pub project_id: Option<String>,
}

#[async_trait]
impl PushProvider for StaticPush {
    async fn current_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn project_id(&self) -> Option<String> {
        self.project_id.clone()
    }
}

/// Web destination carried by a notification payload under `data.url`
pub fn notification_destination(payload: &Value) -> Option<String> {
    payload
        .get("data")?
        .get("url")?
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
