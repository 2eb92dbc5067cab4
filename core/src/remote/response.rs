// Parsed config endpoint response

use crate::store::CachedDestination;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResult {
    pub ok: bool,
    #[serde(default)]
    pub url: Option<String>,
    /// Destination expiry, epoch seconds
    #[serde(default, rename = "expires")]
    pub expires_at: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ConfigResult {
    pub fn is_valid(&self) -> bool {
        self.ok && self.url.is_some()
    }

    /// The destination to cache, if the response carries a complete one.
    ///
    /// A valid response without `expires` breaks the endpoint contract and
    /// is treated as carrying no destination.
    pub fn destination(&self) -> Option<CachedDestination> {
        if !self.is_valid() {
            return None;
        }
        match (&self.url, self.expires_at) {
            (Some(url), Some(expires_at)) => Some(CachedDestination::new(url.clone(), expires_at)),
            _ => {
                tracing::warn!("Config response has a url but no expiry; ignoring it");
                None
            }
        }
    }
}
