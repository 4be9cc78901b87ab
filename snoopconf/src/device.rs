use std::fmt;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::CommandList;
use crate::params::ParameterSet;
use crate::{Error, Result};

/// Transport used to reach the device API.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

/// A device whose address has already been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or address as given by the operator.
    pub host: String,
    pub protocol: Protocol,
    pub addr: SocketAddr,
}

impl Target {
    /// Resolve `host` before any request is made.
    pub async fn resolve(host: &str, protocol: Protocol, port: Option<u16>) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::Resolution {
                host: host.to_string(),
                reason: "empty host name".to_string(),
            });
        }

        let port = port.unwrap_or_else(|| protocol.default_port());
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::Resolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let addr = addrs.next().ok_or_else(|| Error::Resolution {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })?;
        debug!("resolved {} to {}", host, addr);

        Ok(Self {
            host: host.to_string(),
            protocol,
            addr,
        })
    }

    /// Whether the operator gave an address rather than a name.
    pub fn is_ip_literal(&self) -> bool {
        self.host.parse::<IpAddr>().is_ok()
    }

    /// Base URL of the device API. A host name is kept as given so TLS
    /// checks the certificate against it; clients pin it to `addr`.
    pub fn base_url(&self) -> String {
        if self.is_ip_literal() {
            format!("{}://{}", self.protocol, self.addr)
        } else {
            format!("{}://{}:{}", self.protocol, self.host, self.addr.port())
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.addr)
    }
}

/// Reads the current IGMP snooping configuration of a device.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    /// Returns a value for every known parameter.
    async fn fetch(&self, target: &Target) -> Result<ParameterSet>;
}

/// Writes configuration to a device. The only mutating network operation.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fails with [`Error::Apply`] carrying the device's message when the
    /// device rejects any command.
    async fn apply(&self, target: &Target, commands: &CommandList) -> Result<()>;
}
