//! Entity vocabulary shared by the parsers, the store and the resolver
//!
//! Every enum here has a stable lowercase text form which is what the store
//! persists. The text forms are part of the dump format, so they only grow.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Declares a closed enum with a persisted text form.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Get the persisted text form
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Get all variants
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(Error::InvalidValue(format!(
                        "Unknown {}: {}", stringify!($name), s
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// IP address family
    AddressFamily {
        V4 => "ipv4",
        V6 => "ipv6",
    }
}

text_enum! {
    /// Switching mode of an interface. Unclassified interfaces carry no mode.
    InterfaceMode {
        /// Layer-2 access port
        Access => "access",
        /// Layer-2 802.1Q trunk
        Trunk => "trunk",
        /// Routed physical interface or sub-interface
        Routed => "l3",
        /// VLAN (SVI) and tunnel interfaces
        Virtual => "virtual",
    }
}

text_enum! {
    /// Administrative status
    InterfaceStatus {
        Up => "up",
        Shutdown => "shutdown",
    }
}

text_enum! {
    /// How a VLAN is carried on an interface
    VlanTagMode {
        Tagged => "tagged",
        /// Trunk native VLAN
        Untagged => "untagged",
        UntaggedAccess => "untagged-access",
        UntaggedVoice => "untagged-voice",
    }
}

text_enum! {
    /// Role of an IP address entity
    AddressType {
        Primary => "primary",
        Secondary => "secondary",
        Vip => "vip",
        TunnelDestination => "tunnel-destination",
        NextHop => "next-hop",
    }
}

text_enum! {
    /// A reference that kept an entity in the pending space
    PendReason {
        VrfId => "vrf_id",
        PortChannel => "port-channel",
        TunnelSource => "tunnel_source",
        /// Static route next hop awaiting normalization
        NextHop => "next_hop",
    }
}

text_enum! {
    /// Route-target or route-map direction
    RtDirection {
        Import => "import",
        Export => "export",
    }
}

text_enum! {
    /// Which dialect declared a VRF
    VrfDialect {
        /// `ip vrf NAME`, single address family
        Legacy => "ip-vrf",
        /// `vrf definition NAME` with address-family sub-blocks
        MultiFamily => "vrf-definition",
        /// `vrf NAME` with route-target list blocks
        RouteTargetBlock => "vrf-rt-block",
    }
}

text_enum! {
    /// Which syntax a static route came from
    RouteForm {
        Classic => "classic",
        Block => "block",
    }
}

/// Sorted, duplicate-free set of pending reasons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendReasons(Vec<PendReason>);

impl PendReasons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(reason: PendReason) -> Self {
        Self(vec![reason])
    }

    pub fn insert(&mut self, reason: PendReason) {
        if let Err(pos) = self.0.binary_search(&reason) {
            self.0.insert(pos, reason);
        }
    }

    pub fn remove(&mut self, reason: PendReason) {
        self.0.retain(|r| *r != reason);
    }

    pub fn contains(&self, reason: PendReason) -> bool {
        self.0.binary_search(&reason).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PendReason> + '_ {
        self.0.iter().copied()
    }

    /// Parse the comma separated persisted form
    pub fn parse(text: &str) -> Result<Self> {
        let mut reasons = Self::new();
        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            reasons.insert(part.parse()?);
        }
        Ok(reasons)
    }
}

impl fmt::Display for PendReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.0.iter().map(PendReason::as_str).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromIterator<PendReason> for PendReasons {
    fn from_iter<I: IntoIterator<Item = PendReason>>(iter: I) -> Self {
        let mut reasons = Self::new();
        for reason in iter {
            reasons.insert(reason);
        }
        reasons
    }
}

/// Whether an entity's references are fully resolved.
///
/// Entities live in one table per kind; the state column replaces the
/// parallel pending tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Resolved,
    Pending(PendReasons),
}

impl ResolutionState {
    pub fn pending(reason: PendReason) -> Self {
        Self::Pending(PendReasons::single(reason))
    }

    /// Pending with the given reasons, or resolved when there are none
    pub fn from_reasons(reasons: PendReasons) -> Self {
        if reasons.is_empty() {
            Self::Resolved
        } else {
            Self::Pending(reasons)
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Pending(_) => "pending",
        }
    }

    /// Persisted `pend_reason` column value
    pub fn reason_column(&self) -> Option<String> {
        match self {
            Self::Resolved => None,
            Self::Pending(reasons) => Some(reasons.to_string()),
        }
    }

    /// Rebuild from the `state` and `pend_reason` columns
    pub fn from_columns(state: &str, reason: Option<&str>) -> Result<Self> {
        match state {
            "resolved" => Ok(Self::Resolved),
            "pending" => Ok(Self::Pending(PendReasons::parse(reason.unwrap_or(""))?)),
            other => Err(Error::InvalidValue(format!("Unknown resolution state: {}", other))),
        }
    }
}

static INTERFACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z][A-Za-z-]*?)\s*(?P<number>\d[\d/:]*)(?:\.(?P<sub>\d+))?$")
        .expect("interface name pattern")
});

/// Natural key of an interface within one appliance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceName {
    /// Interface type as written (`GigabitEthernet`, `Vlan`, `Port-channel`)
    pub kind: String,
    /// Slot/port numbering (`0/1`, `100`)
    pub number: String,
    /// Sub-interface suffix, empty for main interfaces
    pub subif: String,
}

impl InterfaceName {
    pub fn new(kind: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            number: number.into(),
            subif: String::new(),
        }
    }

    pub fn is_subinterface(&self) -> bool {
        !self.subif.is_empty()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }
}

impl FromStr for InterfaceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = INTERFACE_NAME
            .captures(s.trim())
            .ok_or_else(|| Error::Parse(format!("Invalid interface name: {}", s)))?;
        Ok(Self {
            kind: caps["type"].to_string(),
            number: caps["number"].to_string(),
            subif: caps.name("sub").map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.number)?;
        if self.is_subinterface() {
            write!(f, ".{}", self.subif)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_roundtrip() {
        for reason in PendReason::all() {
            let parsed: PendReason = reason.as_str().parse().unwrap();
            assert_eq!(*reason, parsed);
        }
        assert!("bogus".parse::<InterfaceMode>().is_err());
    }

    #[test]
    fn test_pend_reasons_sorted_and_unique() {
        let mut reasons = PendReasons::single(PendReason::VrfId);
        reasons.insert(PendReason::PortChannel);
        reasons.insert(PendReason::VrfId);
        assert_eq!(reasons.to_string(), "vrf_id,port-channel");

        let parsed = PendReasons::parse("port-channel, vrf_id").unwrap();
        assert_eq!(parsed, reasons);

        reasons.remove(PendReason::VrfId);
        assert_eq!(reasons.to_string(), "port-channel");
    }

    #[test]
    fn test_resolution_state_columns() {
        let state = ResolutionState::pending(PendReason::TunnelSource);
        assert_eq!(state.as_str(), "pending");
        let back = ResolutionState::from_columns("pending", state.reason_column().as_deref()).unwrap();
        assert_eq!(back, state);
        assert!(ResolutionState::from_reasons(PendReasons::new()).is_resolved());
    }

    #[test]
    fn test_interface_name_parse() {
        let name: InterfaceName = "GigabitEthernet0/1.100".parse().unwrap();
        assert_eq!(name.kind, "GigabitEthernet");
        assert_eq!(name.number, "0/1");
        assert_eq!(name.subif, "100");
        assert_eq!(name.to_string(), "GigabitEthernet0/1.100");

        let pc: InterfaceName = "Port-channel12".parse().unwrap();
        assert!(pc.is_kind("port-channel"));
        assert_eq!(pc.number, "12");
        assert!(!pc.is_subinterface());

        let spaced: InterfaceName = "Serial 0/0/0:1".parse().unwrap();
        assert_eq!(spaced.to_string(), "Serial0/0/0:1");

        assert!("Null".parse::<InterfaceName>().is_err());
    }
}
