//! Address and prefix handling
//!
//! Configuration text writes IPv4 prefixes as `address mask` pairs and IPv6
//! (and block-style IPv4) prefixes as `address/length`. Both normalize to an
//! [`IpPrefix`], whose network form is the subnet natural key.

use crate::entity::AddressFamily;
use crate::{Error, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An interface-style address: host address plus prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl IpPrefix {
    pub fn new(addr: IpAddr, len: u8) -> Result<Self> {
        let max = max_len(&addr);
        if len > max {
            return Err(Error::InvalidAddress(format!("{}/{} exceeds /{}", addr, len, max)));
        }
        Ok(Self { addr, len })
    }

    /// Host route for a single address (`/32` or `/128`)
    pub fn host(addr: IpAddr) -> Self {
        let len = max_len(&addr);
        Self { addr, len }
    }

    /// Parse `a.b.c.d m.m.m.m`
    pub fn from_addr_mask(addr: &str, mask: &str) -> Result<Self> {
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::InvalidAddress(addr.to_string()))?;
        let len = mask_to_len(mask)?;
        Self::new(IpAddr::V4(addr), len)
    }

    pub fn family(&self) -> AddressFamily {
        match self.addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// The prefix with host bits cleared
    pub fn network(&self) -> IpPrefix {
        let addr = match self.addr {
            IpAddr::V4(v4) => {
                let bits = u32::from(v4);
                let mask = if self.len == 0 { 0 } else { u32::MAX << (32 - self.len) };
                IpAddr::V4(Ipv4Addr::from(bits & mask))
            }
            IpAddr::V6(v6) => {
                let bits = u128::from(v6);
                let mask = if self.len == 0 { 0 } else { u128::MAX << (128 - self.len) };
                IpAddr::V6(Ipv6Addr::from(bits & mask))
            }
        };
        IpPrefix { addr, len: self.len }
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        let other = IpPrefix { addr: *addr, len: self.len };
        self.family() == other.family() && self.network() == other.network()
    }

    /// `address/len` with host bits preserved
    pub fn with_prefixlen(&self) -> String {
        format!("{}/{}", self.addr, self.len)
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl FromStr for IpPrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        let addr: IpAddr = addr.parse().map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let len: u8 = len.parse().map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Self::new(addr, len)
    }
}

/// Host part of a stored `address/len` string
pub fn host_part(address: &str) -> &str {
    address.split_once('/').map(|(host, _)| host).unwrap_or(address)
}

/// Convert a contiguous dotted netmask into a prefix length
pub fn mask_to_len(mask: &str) -> Result<u8> {
    let mask: Ipv4Addr = mask
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("bad netmask {}", mask)))?;
    let bits = u32::from(mask);
    let len = bits.leading_ones();
    if bits.checked_shl(len).unwrap_or(0) != 0 {
        return Err(Error::InvalidAddress(format!("non-contiguous netmask {}", mask)));
    }
    Ok(len as u8)
}

fn max_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}
