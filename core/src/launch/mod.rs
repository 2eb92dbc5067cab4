//! Launch decision state machine

pub mod orchestrator;

pub use orchestrator::{LaunchOrchestrator, LaunchPolicy};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchState {
    Loading,
    NoConnectivity,
    ResolvedWeb(String),
    ResolvedNative,
}

impl LaunchState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LaunchState::ResolvedWeb(_) | LaunchState::ResolvedNative)
    }
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchState::Loading => write!(f, "Loading"),
            LaunchState::NoConnectivity => write!(f, "NoConnectivity"),
            LaunchState::ResolvedWeb(url) => write!(f, "ResolvedWeb({})", url),
            LaunchState::ResolvedNative => write!(f, "ResolvedNative"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("A launch sequence is already running")]
    AlreadyRunning,
    #[error("Invalid state transition from {0}")]
    InvalidStateTransition(LaunchState),
}
