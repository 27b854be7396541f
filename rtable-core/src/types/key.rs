//! Route keys.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ADDR_LEN, MAX_MASK_LEN};
use crate::error::{Result, RouteError};

/// Unique identity of a route entry.
///
/// Two live entries never share a key. The key is fixed for the lifetime
/// of the entry; changing it means deleting and reinserting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    /// Destination network address
    pub destination: Ipv4Addr,
    /// Prefix length, 0..=32
    pub mask_len: u8,
}

impl RouteKey {
    /// Creates a key, rejecting prefix lengths above 32.
    pub fn new(destination: Ipv4Addr, mask_len: u8) -> Result<Self> {
        if mask_len > MAX_MASK_LEN {
            return Err(RouteError::InvalidRoute(format!(
                "mask length must be 0..={MAX_MASK_LEN}, got {mask_len}"
            )));
        }
        Ok(Self { destination, mask_len })
    }

    /// Parses a key from a dotted-quad destination and a prefix length.
    pub fn parse(destination: &str, mask_len: u8) -> Result<Self> {
        Self::new(parse_addr("destination", destination)?, mask_len)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.destination, self.mask_len)
    }
}

impl FromStr for RouteKey {
    type Err = RouteError;

    /// Parses `a.b.c.d/len`. A bare address is treated as a host route (/32).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, mask)) => {
                let mask_len = mask.trim().parse::<u8>().map_err(|_| {
                    RouteError::InvalidRoute(format!("invalid mask length '{mask}'"))
                })?;
                Self::parse(addr.trim(), mask_len)
            }
            None => Self::parse(s, MAX_MASK_LEN),
        }
    }
}

/// Parses a textual IPv4 address, enforcing the 15-byte field limit.
pub(crate) fn parse_addr(field: &str, raw: &str) -> Result<Ipv4Addr> {
    let raw = raw.trim();
    if raw.len() > MAX_ADDR_LEN {
        return Err(RouteError::InvalidRoute(format!(
            "{field} longer than {MAX_ADDR_LEN} bytes: '{raw}'"
        )));
    }
    raw.parse()
        .map_err(|_| RouteError::InvalidRoute(format!("{field} is not an IPv4 address: '{raw}'")))
}
