//! Tunnel operating modes offered by the configurator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the data plane attaches to the host network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelMode {
    /// System-wide virtual interface; all traffic is routed through the tunnel.
    Tun,
    /// Local SOCKS5/HTTP listener; only configured applications use the tunnel.
    Proxy,
}

impl TunnelMode {
    /// Every mode in menu order.
    pub const ALL: [Self; 2] = [Self::Tun, Self::Proxy];

    /// Stable short identifier (config files, CLI, logs).
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Tun => "tun",
            Self::Proxy => "proxy",
        }
    }

    /// Menu title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Tun => "TUN (system-wide)",
            Self::Proxy => "Proxy (SOCKS5/HTTP)",
        }
    }

    /// One-sentence description shown under the menu.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Tun => {
                "Creates a virtual network interface and routes all host traffic through the tunnel. Requires elevated privileges."
            }
            Self::Proxy => {
                "Starts a local SOCKS5 and HTTP listener. Only applications configured to use the proxy are tunneled."
            }
        }
    }
}

impl fmt::Display for TunnelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TunnelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tun" => Ok(Self::Tun),
            "proxy" | "socks" => Ok(Self::Proxy),
            other => Err(format!("unknown tunnel mode {other:?}")),
        }
    }
}
