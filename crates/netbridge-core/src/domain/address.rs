//! Textual peer addressing: `host:port` network addresses and numeric peer
//! identities.
//!
//! Both types are parsed with [`std::str::FromStr`], so callers write
//! `"127.0.0.1:27015".parse::<NetworkAddress>()`.  A malformed string is an
//! ordinary error value, never a panic.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a [`NetworkAddress`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address {0:?} has no port")]
    MissingPort(String),
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    #[error("invalid host {0:?}; expected an IPv4 or bracketed IPv6 literal")]
    InvalidHost(String),
}

/// Errors produced when parsing a [`PeerIdentity`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity {0:?} is not a decimal 64-bit number")]
    NotNumeric(String),
    #[error("identity 0 is reserved")]
    Zero,
}

/// An IP address and port.
///
/// The default value is the unspecified address `0.0.0.0:0`, which is what a
/// [`crate::ConnectionInfo`] carries when the transport does not know the
/// remote address (e.g. a relayed peer-to-peer connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAddress(SocketAddr);

impl NetworkAddress {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(ip, port))
    }

    /// All interfaces on `port`, the address a listen socket binds to.
    pub fn any(port: u16) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    /// `true` when both the IP and the port are unset.
    pub fn is_unspecified(&self) -> bool {
        self.0.ip().is_unspecified() && self.0.port() == 0
    }
}

impl Default for NetworkAddress {
    fn default() -> Self {
        Self::any(0)
    }
}

impl From<SocketAddr> for NetworkAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NetworkAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            // [v6]:port
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| AddressError::InvalidHost(s.to_string()))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
            (host, port)
        } else {
            let (host, port) = s
                .rsplit_once(':')
                .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
            if host.contains(':') {
                return Err(AddressError::InvalidHost(host.to_string()));
            }
            (host, port)
        };

        let ip: IpAddr = host
            .parse()
            .map_err(|_| AddressError::InvalidHost(host.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| AddressError::InvalidPort(port.to_string()))?;
        Ok(Self::new(ip, port))
    }
}

/// A 64-bit peer identity used for identity-addressed (peer-to-peer)
/// rendezvous.  Written and parsed as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(u64);

impl PeerIdentity {
    /// Identity an in-process transport answers to unless configured otherwise.
    pub const DEFAULT_LOCAL: Self = Self(76_561_197_960_265_729);

    /// Returns `None` for the reserved value `0`.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PeerIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // `u64::from_str` accepts a leading '+', which is not a decimal identity.
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentityError::NotNumeric(s.to_string()));
        }
        let raw: u64 = trimmed
            .parse()
            .map_err(|_| IdentityError::NotNumeric(s.to_string()))?;
        Self::new(raw).ok_or(IdentityError::Zero)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
