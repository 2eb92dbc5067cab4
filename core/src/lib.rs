// Launchgate core — launch decision spine
//
// Decides on every launch whether the app shows its remote web experience or
// its native feature set, and remembers that decision across launches.

pub mod attribution;
pub mod clock;
pub mod device;
pub mod launch;
pub mod push;
pub mod remote;
pub mod settings;
pub mod store;

pub use attribution::{
    AttributionAggregator, AttributionData, AttributionListeners, AttributionProvider,
    AttributionSnapshot, DeepLink, DeepLinkResult,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use device::DeviceProfile;
pub use launch::{LaunchError, LaunchOrchestrator, LaunchPolicy, LaunchState};
pub use push::{NoPush, PushProvider, StaticPush};
pub use remote::{ConfigResult, ConfigTransport, FetchError, RemoteConfigClient};
pub use settings::{LaunchSettings, SettingsError};
pub use store::{CachedDestination, ModeStore, OperatingMode};
