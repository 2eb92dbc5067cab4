// Durable launch-mode state
//
// Three independent records: the operating mode, the cached web destination
// and the push-prompt deferral timestamp. Reads never fail; a missing or
// corrupt record comes back as absent.

use crate::clock::{Clock, SystemClock};
use crate::store::backend::StorageBackend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MODE_KEY: &[u8] = b"launchgate.appMode";
const DESTINATION_KEY: &[u8] = b"launchgate.webViewData";
const PUSH_DEFERRAL_KEY: &[u8] = b"launchgate.pushPermissionTimestamp";

/// Minimum spacing between two push permission prompts (3 days)
pub const PUSH_PROMPT_COOLDOWN_SECS: f64 = 259_200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    Undetermined,
    WebExperience,
    NativeExperience,
}

impl OperatingMode {
    /// Persisted representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Undetermined => "notDetermined",
            OperatingMode::WebExperience => "webView",
            OperatingMode::NativeExperience => "wrapper",
        }
    }

    /// Parse a persisted value; anything unrecognised is `Undetermined`
    pub fn parse(raw: &str) -> Self {
        match raw {
            "webView" => OperatingMode::WebExperience,
            "wrapper" => OperatingMode::NativeExperience,
            _ => OperatingMode::Undetermined,
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatingMode::Undetermined => write!(f, "Undetermined"),
            OperatingMode::WebExperience => write!(f, "WebExperience"),
            OperatingMode::NativeExperience => write!(f, "NativeExperience"),
        }
    }
}

/// Last known remote web destination. Replaced whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDestination {
    pub url: String,
    #[serde(rename = "expires")]
    pub expires_at: f64,
}

impl CachedDestination {
    pub fn new(url: impl Into<String>, expires_at: f64) -> Self {
        Self {
            url: url.into(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: f64) -> bool {
        now > self.expires_at
    }
}

#[derive(Clone)]
pub struct ModeStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl ModeStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Mode
    // ------------------------------------------------------------------

    pub fn get_mode(&self) -> OperatingMode {
        match self.read(MODE_KEY) {
            Some(raw) => OperatingMode::parse(&String::from_utf8_lossy(&raw)),
            None => OperatingMode::Undetermined,
        }
    }

    pub fn set_mode(&self, mode: OperatingMode) {
        tracing::debug!("Persisting operating mode {}", mode);
        self.write(MODE_KEY, mode.as_str().as_bytes());
    }

    pub fn is_first_launch(&self) -> bool {
        self.get_mode() == OperatingMode::Undetermined
    }

    // ------------------------------------------------------------------
    // Destination
    // ------------------------------------------------------------------

    pub fn save_destination(&self, url: &str, expires_at: f64) {
        let destination = CachedDestination::new(url, expires_at);
        match serde_json::to_vec(&destination) {
            Ok(encoded) => self.write(DESTINATION_KEY, &encoded),
            Err(e) => tracing::warn!("Failed to encode destination: {}", e),
        }
    }

    pub fn get_destination(&self) -> Option<CachedDestination> {
        self.read_json(DESTINATION_KEY)
    }

    pub fn clear_destination(&self) {
        self.remove(DESTINATION_KEY);
    }

    /// True when nothing is cached or the cached entry is past its expiry
    pub fn is_destination_expired(&self) -> bool {
        match self.get_destination() {
            Some(destination) => destination.is_expired_at(self.now()),
            None => true,
        }
    }

    // ------------------------------------------------------------------
    // Push prompt cooldown
    // ------------------------------------------------------------------

    pub fn push_deferred_at(&self) -> Option<f64> {
        self.read_json(PUSH_DEFERRAL_KEY)
    }

    pub fn should_offer_push_prompt(&self) -> bool {
        match self.push_deferred_at() {
            Some(deferred_at) => self.now() - deferred_at >= PUSH_PROMPT_COOLDOWN_SECS,
            None => true,
        }
    }

    pub fn record_push_deferral(&self) {
        let now = self.now();
        match serde_json::to_vec(&now) {
            Ok(encoded) => self.write(PUSH_DEFERRAL_KEY, &encoded),
            Err(e) => tracing::warn!("Failed to encode push deferral: {}", e),
        }
    }

    pub fn clear_push_deferral(&self) {
        self.remove(PUSH_DEFERRAL_KEY);
    }

    /// Clear mode, destination and deferral marker in one step
    pub fn reset_all(&self) {
        if let Err(e) = self
            .backend
            .remove_all(&[MODE_KEY, DESTINATION_KEY, PUSH_DEFERRAL_KEY])
        {
            tracing::warn!("Failed to reset launch state: {}", e);
            return;
        }
        let _ = self.backend.flush();
        tracing::info!("Launch state reset");
    }

    // ------------------------------------------------------------------
    // Backend helpers
    // ------------------------------------------------------------------

    fn read(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Storage read failed, treating as absent: {}", e);
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &[u8]) -> Option<T> {
        let raw = self.read(key)?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Corrupt record, treating as absent: {}", e);
                None
            }
        }
    }

    fn write(&self, key: &[u8], value: &[u8]) {
        if let Err(e) = self.backend.put(key, value) {
            tracing::warn!("Storage write failed: {}", e);
            return;
        }
        let _ = self.backend.flush();
    }

    fn remove(&self, key: &[u8]) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!("Storage remove failed: {}", e);
            return;
        }
        let _ = self.backend.flush();
    }
}
