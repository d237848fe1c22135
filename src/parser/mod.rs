//! Transcript parsing
//!
//! A transcript is split into command-output sections by [`section`], and the
//! running-config sections are dispatched line by line to the block parsers.
//! Every block parser takes the line slice and the index of its header line
//! and returns the parsed block together with the next unconsumed index.
//!
//! Parsers never fail on content: lines they cannot use are counted in
//! [`Diagnostics`] and skipped.

pub mod section;
pub mod transcript;
pub mod vrf;
pub mod interface;
pub mod route;
pub mod vlan;
pub mod cdp;
pub mod inventory;

pub use section::{Section, SectionKind};
pub use transcript::{parse_transcript, ParsedTranscript};
pub use vrf::{RouteMapEntry, RouteTargetEntry, VrfBlock};
pub use interface::{InterfaceBlock, InterfaceKind, Layer, ParsedAddress, Switchport, TunnelSource, TunnelSpec};
pub use route::StaticRouteEntry;
pub use vlan::DeclaredVlan;
pub use cdp::CdpNeighbor;
pub use inventory::InventoryItem;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings that influence parsing
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Emit a debug event for every line a parser skips
    pub log_ignored_lines: bool,
}

/// Per-transcript counters of everything the parsers skipped or doubted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ignored_lines: usize,
    pub unparseable_lines: usize,
    pub contradictions: usize,
    pub discarded_route_targets: usize,
    pub invalid_addresses: usize,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.ignored_lines += other.ignored_lines;
        self.unparseable_lines += other.unparseable_lines;
        self.contradictions += other.contradictions;
        self.discarded_route_targets += other.discarded_route_targets;
        self.invalid_addresses += other.invalid_addresses;
    }
}

/// Parser state for one transcript
#[derive(Debug)]
pub struct ParseContext<'a> {
    pub options: &'a ParseOptions,
    /// Transcript name used in log events
    pub source: String,
    pub diagnostics: Diagnostics,
}

impl<'a> ParseContext<'a> {
    pub fn new(options: &'a ParseOptions, source: impl Into<String>) -> Self {
        Self {
            options,
            source: source.into(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// A recognised-but-unused line inside a block
    pub fn ignored(&mut self, index: usize, line: &str) {
        self.diagnostics.ignored_lines += 1;
        if self.options.log_ignored_lines {
            debug!(source = %self.source, line = index + 1, "Ignored: {}", line.trim());
        }
    }

    /// A line a parser recognised by keyword but could not read
    pub fn unparseable(&mut self, index: usize, line: &str) {
        self.diagnostics.unparseable_lines += 1;
        debug!(source = %self.source, line = index + 1, "Unparseable: {}", line.trim());
    }

    /// Evidence that disagrees with the first classification of a block
    pub fn contradiction(&mut self, index: usize, block: &str, line: &str) {
        self.diagnostics.contradictions += 1;
        warn!(source = %self.source, line = index + 1, "{}: ignoring contradicting line '{}'", block, line.trim());
    }

    pub fn discarded_route_target(&mut self, index: usize, vrf: &str, value: &str) {
        self.diagnostics.discarded_route_targets += 1;
        warn!(
            source = %self.source,
            line = index + 1,
            "VRF {}: route-target {} outside an address-family, discarded",
            vrf,
            value
        );
    }

    pub fn invalid_address(&mut self, index: usize, line: &str) {
        self.diagnostics.invalid_addresses += 1;
        debug!(source = %self.source, line = index + 1, "Invalid address: {}", line.trim());
    }
}

/// Tagged union of everything a block parser can produce
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBlock {
    Vrf(VrfBlock),
    Interface(InterfaceBlock),
    Vlans(Vec<DeclaredVlan>),
    StaticRoutes(Vec<StaticRouteEntry>),
    Neighbors(Vec<CdpNeighbor>),
    Inventory(Vec<InventoryItem>),
}

impl ParsedBlock {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParsedBlock::Vrf(_) => "vrf",
            ParsedBlock::Interface(_) => "interface",
            ParsedBlock::Vlans(_) => "vlans",
            ParsedBlock::StaticRoutes(_) => "static-routes",
            ParsedBlock::Neighbors(_) => "neighbors",
            ParsedBlock::Inventory(_) => "inventory",
        }
    }
}

/// Whether a line belongs to the body of the block above it
///
/// Bodies are indented; blank lines are tolerated inside them.
pub(crate) fn is_body_line(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(char::is_whitespace)
}

/// Whether a body line carries nothing (blank or a `!` separator)
pub(crate) fn is_filler(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.chars().all(|c| c == '!')
}

/// Split a trimmed line into whitespace separated tokens
pub(crate) fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Expand a VLAN list such as `1-3,10,20-21`
pub fn expand_vlan_list(text: &str) -> Option<Vec<u16>> {
    let mut ids = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u16 = lo.trim().parse().ok()?;
                let hi: u16 = hi.trim().parse().ok()?;
                if lo > hi {
                    return None;
                }
                ids.extend(lo..=hi);
            }
            None => ids.push(part.parse().ok()?),
        }
    }
    if ids.is_empty() { None } else { Some(ids) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_vlan_list() {
        assert_eq!(expand_vlan_list("10").unwrap(), vec![10]);
        assert_eq!(expand_vlan_list("1-3,10,20-21").unwrap(), vec![1, 2, 3, 10, 20, 21]);
        assert!(expand_vlan_list("5-2").is_none());
        assert!(expand_vlan_list("all").is_none());
    }

    #[test]
    fn test_body_lines() {
        assert!(is_body_line(" description uplink"));
        assert!(is_body_line(""));
        assert!(!is_body_line("!"));
        assert!(!is_body_line("interface Vlan10"));
        assert!(is_filler(" !"));
        assert!(!is_filler(" shutdown"));
    }

    #[test]
    fn test_diagnostics_merge() {
        let options = ParseOptions::default();
        let mut ctx = ParseContext::new(&options, "test");
        ctx.ignored(0, " spanning-tree portfast");
        ctx.contradiction(1, "GigabitEthernet0/1", " switchport");

        let mut total = Diagnostics::default();
        total.merge(&ctx.diagnostics);
        total.merge(&ctx.diagnostics);
        assert_eq!(total.ignored_lines, 2);
        assert_eq!(total.contradictions, 2);
    }
}
