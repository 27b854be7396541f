//! Route entries and their snapshots.

use std::net::Ipv4Addr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_OIF_LEN;
use crate::error::{Result, RouteError};
use crate::types::key::parse_addr;
use crate::types::{RouteKey, TimerHandle};

/// A routing entry as owned by the store.
///
/// `key` is immutable once the entry exists. `gateway` and `oif` may be
/// changed in place by an update. `timer` is present while an expiration
/// is armed and cleared once it is cancelled or has fired.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    key: RouteKey,
    /// Next-hop address, `None` for directly connected routes
    pub gateway: Option<Ipv4Addr>,
    /// Outgoing interface label
    pub oif: Option<String>,
    /// Configured time-to-live
    pub ttl: Duration,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    timer: Option<TimerHandle>,
}

impl RouteEntry {
    /// Creates an unarmed entry after validating the interface label.
    pub fn new(
        key: RouteKey,
        gateway: Option<Ipv4Addr>,
        oif: Option<String>,
        ttl: Duration,
    ) -> Result<Self> {
        let oif = match oif {
            Some(label) => normalize_oif(&label)?,
            None => None,
        };
        Ok(Self {
            key,
            gateway,
            oif,
            ttl,
            created_at: Utc::now(),
            timer: None,
        })
    }

    /// The entry's key.
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    /// The armed expiration timer, if any.
    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Records a newly armed timer, returning the one it replaces.
    pub fn set_timer(&mut self, timer: TimerHandle) -> Option<TimerHandle> {
        self.timer.replace(timer)
    }

    /// Clears and returns the armed timer.
    pub fn take_timer(&mut self) -> Option<TimerHandle> {
        self.timer.take()
    }

    /// Replaces gateway and interface label. Key, TTL and timer are untouched.
    pub fn update(&mut self, gateway: Option<Ipv4Addr>, oif: Option<String>) -> Result<()> {
        let oif = match oif {
            Some(label) => normalize_oif(&label)?,
            None => None,
        };
        self.gateway = gateway;
        self.oif = oif;
        Ok(())
    }

    /// Copies the entry out for enumeration consumers.
    pub fn snapshot(&self, remaining: Option<Duration>) -> RouteSnapshot {
        RouteSnapshot {
            destination: self.key.destination,
            mask_len: self.key.mask_len,
            gateway: self.gateway,
            oif: self.oif.clone(),
            ttl_seconds: self.ttl.as_secs(),
            remaining_ms: remaining
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
            created_at: self.created_at,
        }
    }
}

/// Read-only copy of an entry, as seen by dump/enumeration consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    /// Destination network address
    pub destination: Ipv4Addr,
    /// Prefix length
    pub mask_len: u8,
    /// Next-hop address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Ipv4Addr>,
    /// Outgoing interface label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oif: Option<String>,
    /// Configured TTL in seconds
    pub ttl_seconds: u64,
    /// Milliseconds until expiration (0 once no timer is armed)
    pub remaining_ms: u64,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl RouteSnapshot {
    /// Key of the entry this snapshot was taken from.
    pub fn key(&self) -> RouteKey {
        RouteKey {
            destination: self.destination,
            mask_len: self.mask_len,
        }
    }
}

/// Parses an optional gateway. Empty input means "no gateway".
pub fn parse_gateway(raw: &str) -> Result<Option<Ipv4Addr>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_addr("gateway", raw).map(Some)
}

/// Validates an optional interface label. Empty input means "no interface".
pub fn parse_oif(raw: &str) -> Result<Option<String>> {
    normalize_oif(raw)
}

fn normalize_oif(raw: &str) -> Result<Option<String>> {
    let label = raw.trim();
    if label.is_empty() {
        return Ok(None);
    }
    if label.len() > MAX_OIF_LEN {
        return Err(RouteError::InvalidRoute(format!(
            "interface label longer than {MAX_OIF_LEN} bytes: '{label}'"
        )));
    }
    if label.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RouteError::InvalidRoute(format!(
            "interface label contains whitespace: '{label}'"
        )));
    }
    Ok(Some(label.to_string()))
}
