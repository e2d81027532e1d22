//! Request identity extraction for rate-limit partitioning.

use axum::extract::{ConnectInfo, Request};
use axum::http::header;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{Result, TurnstileError};

/// Strategy for deriving the partition key from a request.
///
/// The strategy is a static configuration choice made once at construction.
/// The set is closed: requests are partitioned either by the network origin
/// or by the declared host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Partition by the remote origin address, port stripped (default)
    #[default]
    OriginAddress,
    /// Partition by the Host header value, verbatim
    HostHeader,
}

impl KeyStrategy {
    /// Derive the rate-limit key for `req`.
    ///
    /// Origin-address extraction fails with `MalformedAddress` when the
    /// remote address has no parseable host portion. Host-header extraction
    /// never fails; a missing header yields the empty-string key.
    pub fn extract(&self, req: &Request) -> Result<String> {
        match self {
            KeyStrategy::OriginAddress => {
                let remote = req
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.to_string())
                    .unwrap_or_default();
                origin_key(&remote)
            }
            KeyStrategy::HostHeader => Ok(req
                .headers()
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()),
        }
    }
}

/// Split the host portion off a `host:port` remote address.
fn origin_key(remote: &str) -> Result<String> {
    let host = remote.split(':').next().unwrap_or_default();
    if host.is_empty() {
        return Err(TurnstileError::MalformedAddress(remote.to_string()));
    }
    Ok(host.to_string())
}
