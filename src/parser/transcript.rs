//! Transcript dispatcher
//!
//! Walks the sections of one transcript and hands running-config statements
//! to the block parsers, collecting their output in transcript order.

use super::section::{discover_hostname, scan_sections, SectionKind};
use super::{cdp, interface, inventory, is_body_line, route, vlan, vrf};
use super::{Diagnostics, ParseContext, ParseOptions, ParsedBlock};
use tracing::debug;

/// Everything parsed out of one transcript
#[derive(Debug, Clone, Default)]
pub struct ParsedTranscript {
    pub hostname: Option<String>,
    pub blocks: Vec<ParsedBlock>,
    pub diagnostics: Diagnostics,
    pub line_count: usize,
}

impl ParsedTranscript {
    pub fn count(&self, kind: &str) -> usize {
        self.blocks.iter().filter(|b| b.kind_name() == kind).count()
    }
}

/// Parse a whole transcript. A leading byte-order mark is tolerated.
pub fn parse_transcript(text: &str, source: &str, options: &ParseOptions) -> ParsedTranscript {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();
    let mut ctx = ParseContext::new(options, source);
    let mut blocks = Vec::new();

    for section in scan_sections(&lines) {
        debug!(source, kind = ?section.kind, start = section.start, end = section.end, "Section");
        match section.kind {
            SectionKind::RunningConfig => {
                parse_running_config(&lines[..section.end], section.start, &mut ctx, &mut blocks);
            }
            SectionKind::ShowVlan => {
                let vlans = vlan::parse_show_vlan(&lines, section.start, section.end, &mut ctx);
                if !vlans.is_empty() {
                    blocks.push(ParsedBlock::Vlans(vlans));
                }
            }
            SectionKind::CdpNeighbors => {
                let neighbors = cdp::parse_cdp_neighbors(&lines, section.start, section.end, &mut ctx);
                if !neighbors.is_empty() {
                    blocks.push(ParsedBlock::Neighbors(neighbors));
                }
            }
            SectionKind::Inventory => {
                let items = inventory::parse_inventory(&lines, section.start, section.end, &mut ctx);
                if !items.is_empty() {
                    blocks.push(ParsedBlock::Inventory(items));
                }
            }
            SectionKind::Other => {}
        }
    }

    ParsedTranscript {
        hostname: discover_hostname(&lines).map(|(_, host)| host),
        blocks,
        diagnostics: ctx.diagnostics,
        line_count: lines.len(),
    }
}

/// Dispatch the top-level statements of a running configuration
fn parse_running_config(lines: &[&str], start: usize, ctx: &mut ParseContext, blocks: &mut Vec<ParsedBlock>) {
    let mut routes = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i];
        // Bodies of statements nobody parses
        if is_body_line(line) {
            i += 1;
            continue;
        }
        let trimmed = line.trim_end();
        if trimmed == "end" {
            break;
        }

        if let Some((dialect, name)) = vrf::match_header(trimmed) {
            let (block, next) = vrf::parse_vrf(lines, i, dialect, name, ctx);
            blocks.push(ParsedBlock::Vrf(block));
            i = next;
        } else if let Some(name) = interface::match_header(trimmed) {
            let (block, next) = interface::parse_interface(lines, i, name, ctx);
            blocks.push(ParsedBlock::Interface(block));
            i = next;
        } else if let Some(numbers) = vlan::match_header(trimmed) {
            let (vlans, next) = vlan::parse_vlan_block(lines, i, &numbers, ctx);
            blocks.push(ParsedBlock::Vlans(vlans));
            i = next;
        } else if trimmed.starts_with("ip route ") || trimmed.starts_with("ipv6 route ") {
            let (entry, next) = route::parse_classic_route(lines, i, ctx);
            routes.extend(entry);
            i = next;
        } else if trimmed == "router static" {
            let (entries, next) = route::parse_route_block(lines, i, ctx);
            routes.extend(entries);
            i = next;
        } else {
            if trimmed.starts_with("interface ") {
                ctx.unparseable(i, line);
            } else if !trimmed.starts_with('!') {
                ctx.ignored(i, line);
            }
            i += 1;
        }
    }

    if !routes.is_empty() {
        blocks.push(ParsedBlock::StaticRoutes(routes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::VrfDialect;

    const TRANSCRIPT: &str = "\u{feff}PE1#show running-config
Building configuration...

Current configuration : 1024 bytes
!
hostname PE1
!
ip vrf RED
 rd 65000:1
 route-target export 65000:1
!
interface Loopback0
 ip address 10.255.0.1 255.255.255.255
!
interface GigabitEthernet0/1
 ip vrf forwarding RED
 ip address 10.1.1.1 255.255.255.0
!
router bgp 65000
 neighbor 10.255.0.2 remote-as 65000
!
ip route 0.0.0.0 0.0.0.0 10.1.1.254
ip route vrf RED 10.9.0.0 255.255.0.0 GigabitEthernet0/1
!
end

PE1#show inventory
NAME: \"Chassis\", DESCR: \"Cisco ISR4331 Chassis\"
PID: ISR4331/K9        , VID: V04  , SN: FDO21234567
PE1#";

    #[test]
    fn test_parse_transcript() {
        let options = ParseOptions::default();
        let parsed = parse_transcript(TRANSCRIPT, "1 Branch.log", &options);
        assert_eq!(parsed.hostname.as_deref(), Some("PE1"));
        assert_eq!(parsed.count("vrf"), 1);
        assert_eq!(parsed.count("interface"), 2);
        assert_eq!(parsed.count("static-routes"), 1);
        assert_eq!(parsed.count("inventory"), 1);

        let ParsedBlock::Vrf(vrf) = &parsed.blocks[0] else {
            panic!("expected a VRF block first");
        };
        assert_eq!(vrf.dialect, VrfDialect::Legacy);

        let routes = parsed
            .blocks
            .iter()
            .find_map(|b| match b {
                ParsedBlock::StaticRoutes(r) => Some(r),
                _ => None,
            })
            .unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].vrf.as_deref(), Some("RED"));
    }

    #[test]
    fn test_transcript_without_hostname() {
        let options = ParseOptions::default();
        let parsed = parse_transcript("just some text\nno prompts\n", "x.log", &options);
        assert_eq!(parsed.hostname, None);
        assert!(parsed.blocks.is_empty());
        assert_eq!(parsed.line_count, 2);
    }

    #[test]
    fn test_point_to_point_subinterface_kept() {
        let options = ParseOptions::default();
        let text = "R7#show running-config\ninterface Serial0/0/0.100 point-to-point\n ip vrf forwarding RED\n ip address 10.9.9.1 255.255.255.252\n!\nend\n";
        let parsed = parse_transcript(text, "Lab.log", &options);
        assert_eq!(parsed.count("interface"), 1);
        assert_eq!(parsed.diagnostics.unparseable_lines, 0);
    }
}
