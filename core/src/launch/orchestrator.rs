//! Launch orchestrator
//!
//! Decides between the web and native experience once per launch:
//!
//! - First launch (mode undetermined): collect attribution, fetch the config
//!   and persist the outcome. Only a connectivity failure leaves the mode
//!   undetermined, surfacing `NoConnectivity` for the user to retry.
//! - Later launches: native resolves immediately; web uses the cached
//!   destination while fresh, otherwise refetches and falls back to the stale
//!   cache.
//!
//! Nothing persisted is touched by a retry beyond what the branches above
//! write, so a retry always restarts its branch from the top.

use super::{LaunchError, LaunchState};
use crate::attribution::{
    AttributionAggregator, AttributionData, AttributionProvider, HttpConversionRequery,
};
use crate::device::DeviceProfile;
use crate::push::PushProvider;
use crate::remote::{
    ConfigResult, FetchError, HttpConfigTransport, RemoteConfigClient, RequestContext,
};
use crate::settings::{LaunchSettings, SettingsError};
use crate::store::{ModeStore, OperatingMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Timing policy for one launch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPolicy {
    pub attribution_timeout: Duration,
    /// Bound on the config fetch; elapsing counts as a connectivity failure
    pub fetch_timeout: Option<Duration>,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            attribution_timeout: Duration::from_millis(10_000),
            fetch_timeout: Some(Duration::from_millis(30_000)),
        }
    }
}

impl From<&LaunchSettings> for LaunchPolicy {
    fn from(settings: &LaunchSettings) -> Self {
        Self {
            attribution_timeout: settings.attribution_timeout(),
            fetch_timeout: settings.fetch_timeout(),
        }
    }
}

pub struct LaunchOrchestrator {
    store: ModeStore,
    attribution: AttributionAggregator,
    config: RemoteConfigClient,
    push: Arc<dyn PushProvider>,
    device: DeviceProfile,
    policy: LaunchPolicy,
    state: watch::Sender<LaunchState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a sequence ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LaunchOrchestrator {
    pub fn new(
        store: ModeStore,
        attribution: AttributionAggregator,
        config: RemoteConfigClient,
        push: Arc<dyn PushProvider>,
        device: DeviceProfile,
    ) -> Self {
        let (state, _) = watch::channel(LaunchState::Loading);
        Self {
            store,
            attribution,
            config,
            push,
            device,
            policy: LaunchPolicy::default(),
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Wire the HTTP transports described by `settings`
    pub fn from_settings(
        settings: &LaunchSettings,
        store: ModeStore,
        provider: Arc<dyn AttributionProvider>,
        push: Arc<dyn PushProvider>,
        device: DeviceProfile,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;

        let requery_timeout = settings.fetch_timeout().unwrap_or(settings.attribution_timeout());
        let requery = Arc::new(HttpConversionRequery::new(
            &settings.attribution,
            requery_timeout,
        ));
        let attribution =
            AttributionAggregator::new(provider, requery).with_organic_grace(settings.organic_grace());
        let transport = Arc::new(HttpConfigTransport::new(
            settings.config_endpoint.clone(),
            settings.fetch_timeout(),
        ));

        Ok(
            Self::new(store, attribution, RemoteConfigClient::new(transport), push, device)
                .with_policy(LaunchPolicy::from(settings)),
        )
    }

    pub fn with_policy(mut self, policy: LaunchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &ModeStore {
        &self.store
    }

    /// Current state
    pub fn state(&self) -> LaunchState {
        self.state.borrow().clone()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.state.subscribe()
    }

    /// Run the launch sequence to a terminal state
    pub async fn start(&self) -> Result<LaunchState, LaunchError> {
        let _guard = self.begin()?;
        self.publish(LaunchState::Loading);

        let resolved = match self.store.get_mode() {
            OperatingMode::Undetermined => {
                tracing::info!("First launch");
                self.first_launch().await
            }
            mode => {
                tracing::info!("Subsequent launch, persisted mode {}", mode);
                self.subsequent_launch(mode).await
            }
        };

        tracing::info!("Launch resolved: {}", resolved);
        self.publish(resolved.clone());
        Ok(resolved)
    }

    /// User-initiated retry, only valid from `NoConnectivity`
    pub async fn retry(&self) -> Result<LaunchState, LaunchError> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(LaunchError::AlreadyRunning);
        }
        let current = self.state();
        if current != LaunchState::NoConnectivity {
            return Err(LaunchError::InvalidStateTransition(current));
        }
        tracing::info!("Retrying launch");
        self.start().await
    }

    /// Forget every persisted decision; the next `start` is a first launch
    pub fn reset(&self) -> Result<(), LaunchError> {
        let _guard = self.begin()?;
        self.store.reset_all();
        self.publish(LaunchState::Loading);
        Ok(())
    }

    fn begin(&self) -> Result<InFlight<'_>, LaunchError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LaunchError::AlreadyRunning)?;
        Ok(InFlight(&self.in_flight))
    }

    fn publish(&self, state: LaunchState) {
        self.state.send_replace(state);
    }

    async fn first_launch(&self) -> LaunchState {
        let snapshot = self.attribution.collect(self.policy.attribution_timeout).await;

        let result = self
            .fetch(&snapshot.conversion_data, snapshot.deep_link_data.as_ref())
            .await;

        match result {
            Err(e) if e.is_connectivity() => {
                tracing::warn!("Config fetch failed, device looks offline: {}", e);
                LaunchState::NoConnectivity
            }
            Err(e) => {
                tracing::warn!("Config fetch failed, using native experience: {}", e);
                self.store.set_mode(OperatingMode::NativeExperience);
                LaunchState::ResolvedNative
            }
            Ok(result) => match result.destination() {
                Some(destination) => {
                    self.store.set_mode(OperatingMode::WebExperience);
                    self.store
                        .save_destination(&destination.url, destination.expires_at);
                    LaunchState::ResolvedWeb(destination.url)
                }
                None => {
                    tracing::info!(
                        "No web destination offered ({}), using native experience",
                        result.message.as_deref().unwrap_or("no message")
                    );
                    self.store.set_mode(OperatingMode::NativeExperience);
                    LaunchState::ResolvedNative
                }
            },
        }
    }

    async fn subsequent_launch(&self, mode: OperatingMode) -> LaunchState {
        match mode {
            OperatingMode::NativeExperience => LaunchState::ResolvedNative,
            OperatingMode::WebExperience => self.resume_web().await,
            OperatingMode::Undetermined => self.first_launch().await,
        }
    }

    async fn resume_web(&self) -> LaunchState {
        let cached = self.store.get_destination();

        match &cached {
            Some(destination) if !destination.is_expired_at(self.store.now()) => {
                tracing::info!("Using cached destination");
                return LaunchState::ResolvedWeb(destination.url.clone());
            }
            Some(_) => tracing::info!("Cached destination expired, refreshing"),
            None => tracing::info!("No cached destination, refreshing"),
        }

        match self.fetch(&AttributionData::new(), None).await {
            Ok(result) => {
                if let Some(fresh) = result.destination() {
                    self.store.save_destination(&fresh.url, fresh.expires_at);
                    return LaunchState::ResolvedWeb(fresh.url);
                }
                tracing::warn!("Refresh returned no destination");
            }
            Err(e) => tracing::warn!("Refresh failed: {}", e),
        }

        match cached {
            Some(stale) => {
                tracing::info!("Falling back to cached destination");
                LaunchState::ResolvedWeb(stale.url)
            }
            None => LaunchState::NoConnectivity,
        }
    }

    async fn fetch(
        &self,
        conversion_data: &AttributionData,
        deep_link_data: Option<&AttributionData>,
    ) -> Result<ConfigResult, FetchError> {
        // The token lookup counts against the fetch limit.
        let request = async {
            let context = RequestContext {
                attribution_id: self.attribution.attribution_id(),
                device: self.device.clone(),
                push_token: self.push.current_token().await,
                project_id: self.push.project_id(),
            };
            self.config
                .fetch_config(conversion_data, deep_link_data, &context)
                .await
        };

        match self.policy.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                FetchError::Connectivity(format!("config fetch timed out after {:?}", limit))
            })?,
            None => request.await,
        }
    }
}
