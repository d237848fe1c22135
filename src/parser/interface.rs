//! Interface block parser
//!
//! One state machine serves every interface flavour. The header decides the
//! [`InterfaceKind`]; body lines fill in description, status, layer-3
//! addressing, switchport state, port-channel membership and tunnel endpoints.
//!
//! The first line that implies a layer (an address or VRF binding for layer
//! 3, any `switchport` statement for layer 2) classifies the block. Lines
//! implying the other layer afterwards are contradictions: logged, counted
//! and not applied.

use super::{expand_vlan_list, is_body_line, is_filler, tokens, ParseContext};
use crate::entity::{AddressType, InterfaceMode, InterfaceName};
use crate::net::IpPrefix;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Switched virtual interface (`interface VlanN`)
    Vlan,
    Tunnel,
    PortChannel,
    Generic,
}

impl InterfaceKind {
    pub fn classify(name: &InterfaceName) -> Self {
        if name.is_kind("vlan") {
            InterfaceKind::Vlan
        } else if name.is_kind("tunnel") {
            InterfaceKind::Tunnel
        } else if name.is_kind("port-channel") || name.is_kind("bundle-ether") {
            InterfaceKind::PortChannel
        } else {
            InterfaceKind::Generic
        }
    }

    /// Virtual kinds are always routed and carry no switchport state
    pub fn is_virtual(&self) -> bool {
        matches!(self, InterfaceKind::Vlan | InterfaceKind::Tunnel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    L2,
    L3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress {
    pub prefix: IpPrefix,
    pub kind: AddressType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switchport {
    /// Mode written with `switchport mode`; `dynamic` modes leave it unset
    pub mode: Option<InterfaceMode>,
    pub access_vlan: Option<u16>,
    pub voice_vlan: Option<u16>,
    pub allowed: Vec<u16>,
    pub native_vlan: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelSource {
    Address(IpAddr),
    Interface(InterfaceName),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelSpec {
    pub source: Option<TunnelSource>,
    pub destination: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceBlock {
    pub name: InterfaceName,
    pub kind: InterfaceKind,
    /// Header line index
    pub line: usize,
    pub description: Option<String>,
    pub shutdown: bool,
    pub layer: Option<Layer>,
    pub vrf: Option<String>,
    pub addresses: Vec<ParsedAddress>,
    pub switchport: Switchport,
    /// Port-channel group number from `channel-group N`
    pub channel_group: Option<String>,
    /// 802.1Q tag from `encapsulation dot1Q N`
    pub encapsulation_vlan: Option<u16>,
    pub tunnel: Option<TunnelSpec>,
}

impl InterfaceBlock {
    pub fn new(name: InterfaceName, line: usize) -> Self {
        let kind = InterfaceKind::classify(&name);
        Self {
            name,
            kind,
            line,
            description: None,
            shutdown: false,
            layer: if kind.is_virtual() { Some(Layer::L3) } else { None },
            vrf: None,
            addresses: Vec::new(),
            switchport: Switchport::default(),
            channel_group: None,
            encapsulation_vlan: None,
            tunnel: if kind == InterfaceKind::Tunnel { Some(TunnelSpec::default()) } else { None },
        }
    }

    pub fn is_layer3(&self) -> bool {
        self.layer == Some(Layer::L3)
    }

    /// Mode persisted on the interface entity
    pub fn mode(&self) -> Option<InterfaceMode> {
        if self.kind.is_virtual() {
            return Some(InterfaceMode::Virtual);
        }
        match self.layer {
            Some(Layer::L3) => Some(InterfaceMode::Routed),
            Some(Layer::L2) => Some(self.switchport.mode.unwrap_or(
                if self.switchport.access_vlan.is_some() || self.switchport.voice_vlan.is_some() {
                    InterfaceMode::Access
                } else {
                    InterfaceMode::Trunk
                },
            )),
            None => None,
        }
    }

    /// VLAN implied by a sub-interface: the dot1Q tag, else the suffix
    pub fn implied_vlan(&self) -> Option<u16> {
        if !self.name.is_subinterface() {
            return None;
        }
        self.encapsulation_vlan.or_else(|| self.name.subif.parse().ok())
    }

    pub fn primary_address(&self) -> Option<&ParsedAddress> {
        self.addresses.iter().find(|a| a.kind == AddressType::Primary)
    }

    /// Apply layer evidence; returns false when it contradicts the block
    fn classify(&mut self, layer: Layer, index: usize, line: &str, ctx: &mut ParseContext) -> bool {
        match self.layer {
            None => {
                self.layer = Some(layer);
                true
            }
            Some(current) if current == layer => true,
            Some(_) => {
                ctx.contradiction(index, &self.name.to_string(), line);
                false
            }
        }
    }
}

/// Recognise `interface NAME [qualifier]`, e.g. `Serial0/0.1 point-to-point`
pub fn match_header(line: &str) -> Option<InterfaceName> {
    let rest = line.strip_prefix("interface ")?.trim();
    rest.parse()
        .ok()
        .or_else(|| rest.split_whitespace().next()?.parse().ok())
}

/// Trailing words after the interface name on a header line
fn header_qualifier(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("interface ")?.trim();
    if rest.parse::<InterfaceName>().is_ok() {
        return None;
    }
    rest.split_once(char::is_whitespace).map(|(_, tail)| tail.trim())
}

/// Parse the interface block whose header is at `index`
pub fn parse_interface(
    lines: &[&str],
    index: usize,
    name: InterfaceName,
    ctx: &mut ParseContext,
) -> (InterfaceBlock, usize) {
    let mut block = InterfaceBlock::new(name, index);
    // VIPs take the primary prefix length, which may appear later
    let mut vips: Vec<IpAddr> = Vec::new();

    if let Some(qualifier) = header_qualifier(lines[index]) {
        ctx.ignored(index, qualifier);
    }

    let mut i = index + 1;
    while i < lines.len() && is_body_line(lines[i]) {
        let line = lines[i];
        if is_filler(line) {
            i += 1;
            continue;
        }
        let toks = tokens(line);
        match toks.as_slice() {
            ["description", ..] => {
                let text = line.trim().trim_start_matches("description").trim();
                block.description = Some(text.to_string());
            }
            ["shutdown"] => block.shutdown = true,
            ["no", "shutdown"] => block.shutdown = false,
            ["vrf", "forwarding", vrf, ..] | ["ip", "vrf", "forwarding", vrf, ..] | ["vrf", vrf] => {
                if block.classify(Layer::L3, i, line, ctx) {
                    block.vrf = Some(vrf.to_string());
                }
            }
            ["ip" | "ipv4", "address", "dhcp" | "negotiated", ..] => {
                block.classify(Layer::L3, i, line, ctx);
            }
            ["ip" | "ipv4", "address", addr, rest @ ..] if addr.contains('/') => {
                if !block.classify(Layer::L3, i, line, ctx) {
                    i += 1;
                    continue;
                }
                match addr.parse::<IpPrefix>() {
                    Ok(prefix) => block.addresses.push(ParsedAddress {
                        prefix,
                        kind: address_kind(rest),
                    }),
                    Err(_) => ctx.invalid_address(i, line),
                }
            }
            ["ip" | "ipv4", "address", addr, mask, rest @ ..] => {
                if !block.classify(Layer::L3, i, line, ctx) {
                    i += 1;
                    continue;
                }
                match IpPrefix::from_addr_mask(addr, mask) {
                    Ok(prefix) => block.addresses.push(ParsedAddress {
                        prefix,
                        kind: address_kind(rest),
                    }),
                    Err(_) => ctx.invalid_address(i, line),
                }
            }
            ["ipv6", "address", prefix, ..] => {
                if !block.classify(Layer::L3, i, line, ctx) {
                    i += 1;
                    continue;
                }
                match prefix.parse::<IpPrefix>() {
                    Ok(prefix) => block.addresses.push(ParsedAddress {
                        prefix,
                        kind: AddressType::Primary,
                    }),
                    Err(_) => ctx.invalid_address(i, line),
                }
            }
            ["standby" | "vrrp", rest @ ..] => match virtual_address(rest) {
                Some(vip) => vips.push(vip),
                None => ctx.ignored(i, line),
            },
            ["no", "switchport"] => {
                block.classify(Layer::L3, i, line, ctx);
            }
            ["switchport", rest @ ..] if !block.kind.is_virtual() => {
                if !block.classify(Layer::L2, i, line, ctx) {
                    i += 1;
                    continue;
                }
                apply_switchport(&mut block.switchport, rest, i, line, ctx);
            }
            ["channel-group", group, ..] => block.channel_group = Some(group.to_string()),
            ["bundle", "id", group, ..] => block.channel_group = Some(group.to_string()),
            ["encapsulation", encap, vlan, ..] if encap.eq_ignore_ascii_case("dot1q") => {
                if !block.classify(Layer::L3, i, line, ctx) {
                    i += 1;
                    continue;
                }
                match vlan.parse() {
                    Ok(vlan) => block.encapsulation_vlan = Some(vlan),
                    Err(_) => ctx.unparseable(i, line),
                }
            }
            ["tunnel", "source", source] if block.kind == InterfaceKind::Tunnel => {
                let source = match source.parse::<IpAddr>() {
                    Ok(addr) => Some(TunnelSource::Address(addr)),
                    Err(_) => source.parse().ok().map(TunnelSource::Interface),
                };
                match source {
                    Some(source) => {
                        if let Some(tunnel) = block.tunnel.as_mut() {
                            tunnel.source = Some(source);
                        }
                    }
                    None => ctx.unparseable(i, line),
                }
            }
            ["tunnel", "destination", dest] if block.kind == InterfaceKind::Tunnel => {
                match dest.parse::<IpAddr>() {
                    Ok(addr) => {
                        if let Some(tunnel) = block.tunnel.as_mut() {
                            tunnel.destination = Some(addr);
                        }
                    }
                    Err(_) => ctx.invalid_address(i, line),
                }
            }
            _ => ctx.ignored(i, line),
        }
        i += 1;
    }

    let vip_len = block.primary_address().map(|a| a.prefix.len);
    for vip in vips {
        let prefix = match vip_len {
            Some(len) => IpPrefix::new(vip, len).unwrap_or_else(|_| IpPrefix::host(vip)),
            None => IpPrefix::host(vip),
        };
        block.addresses.push(ParsedAddress {
            prefix,
            kind: AddressType::Vip,
        });
    }

    (block, i)
}

fn address_kind(rest: &[&str]) -> AddressType {
    if rest.first().is_some_and(|w| w.eq_ignore_ascii_case("secondary")) {
        AddressType::Secondary
    } else {
        AddressType::Primary
    }
}

/// `standby [N] ip A` / `vrrp N ip A` (also `address A`)
fn virtual_address(rest: &[&str]) -> Option<IpAddr> {
    let pos = rest.iter().position(|w| *w == "ip" || *w == "address")?;
    rest.get(pos + 1)?.parse().ok()
}

fn apply_switchport(sp: &mut Switchport, rest: &[&str], index: usize, line: &str, ctx: &mut ParseContext) {
    match rest {
        ["mode", "access", ..] => sp.mode = Some(InterfaceMode::Access),
        ["mode", "trunk", ..] => sp.mode = Some(InterfaceMode::Trunk),
        ["mode", ..] => ctx.ignored(index, line),
        ["access", "vlan", vlan] => match vlan.parse() {
            Ok(vlan) => sp.access_vlan = Some(vlan),
            Err(_) => ctx.unparseable(index, line),
        },
        ["voice", "vlan", vlan] => match vlan.parse() {
            Ok(vlan) => sp.voice_vlan = Some(vlan),
            Err(_) => ctx.ignored(index, line),
        },
        ["trunk", "native", "vlan", vlan] => match vlan.parse() {
            Ok(vlan) => sp.native_vlan = Some(vlan),
            Err(_) => ctx.unparseable(index, line),
        },
        ["trunk", "allowed", "vlan", "none"] => sp.allowed.clear(),
        ["trunk", "allowed", "vlan", "add", list] => match expand_vlan_list(list) {
            Some(ids) => {
                for id in ids {
                    if !sp.allowed.contains(&id) {
                        sp.allowed.push(id);
                    }
                }
            }
            None => ctx.unparseable(index, line),
        },
        ["trunk", "allowed", "vlan", "remove", list] => match expand_vlan_list(list) {
            Some(ids) => sp.allowed.retain(|v| !ids.contains(v)),
            None => ctx.unparseable(index, line),
        },
        ["trunk", "allowed", "vlan", list] => match expand_vlan_list(list) {
            Some(ids) => sp.allowed = ids,
            None => ctx.ignored(index, line),
        },
        _ => ctx.ignored(index, line),
    }
}
