// Store module — durable launch state

pub mod backend;
pub mod mode;

pub use backend::{MemoryStorage, SledStorage, StorageBackend};
pub use mode::{CachedDestination, ModeStore, OperatingMode, PUSH_PROMPT_COOLDOWN_SECS};
