//! Remote configuration: request parameter assembly, transport and the
//! parsed response.

pub mod client;
pub mod params;
pub mod response;

pub use client::{ConfigTransport, HttpConfigTransport, RemoteConfigClient};
pub use params::{build_params, RequestContext};
pub use response::ConfigResult;

use thiserror::Error;

/// Failure of a config request, split by whether the device is likely offline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure: DNS, connect, socket I/O, timeout
    #[error("Connectivity failure: {0}")]
    Connectivity(String),
    /// The server answered but not with a usable config
    #[error("Request failed: {0}")]
    Server(String),
}

impl FetchError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, FetchError::Connectivity(_))
    }
}
