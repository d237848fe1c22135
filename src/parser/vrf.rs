//! VRF block parser
//!
//! Three dialects are accepted:
//! - `ip vrf NAME`: one implicit IPv4 family, `route-target import|export|both V`
//! - `vrf definition NAME`: `address-family ipv4|ipv6` sub-blocks; route
//!   targets written before the first address family are discarded
//! - `vrf NAME`: `import route-target` / `export route-target` marker lines
//!   followed by target values, separated by commas or newlines

use super::{is_body_line, is_filler, tokens, ParseContext};
use crate::entity::{AddressFamily, RtDirection, VrfDialect};
use regex::Regex;
use std::sync::LazyLock;

static RT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<rt>(?:\d{1,3}(?:\.\d{1,3}){3}|\d+(?:\.\d+)?):\d+)(?:\s+stitching)?\s*$")
        .expect("route-target value pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTargetEntry {
    pub family: AddressFamily,
    pub direction: RtDirection,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapEntry {
    pub family: AddressFamily,
    pub direction: RtDirection,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfBlock {
    pub name: String,
    pub dialect: VrfDialect,
    /// Header line index
    pub line: usize,
    pub rd: Option<String>,
    pub description: Option<String>,
    pub route_targets: Vec<RouteTargetEntry>,
    pub route_maps: Vec<RouteMapEntry>,
}

impl VrfBlock {
    pub fn new(name: impl Into<String>, dialect: VrfDialect, line: usize) -> Self {
        Self {
            name: name.into(),
            dialect,
            line,
            rd: None,
            description: None,
            route_targets: Vec::new(),
            route_maps: Vec::new(),
        }
    }

    pub fn route_targets_for(
        &self,
        family: AddressFamily,
        direction: RtDirection,
    ) -> impl Iterator<Item = &str> {
        self.route_targets
            .iter()
            .filter(move |rt| rt.family == family && rt.direction == direction)
            .map(|rt| rt.value.as_str())
    }

    fn add_route_target(&mut self, family: AddressFamily, direction: RtDirection, value: &str) {
        let entry = RouteTargetEntry {
            family,
            direction,
            value: value.to_string(),
        };
        if !self.route_targets.contains(&entry) {
            self.route_targets.push(entry);
        }
    }

    fn add_route_map(&mut self, family: AddressFamily, direction: RtDirection, name: &str) {
        self.route_maps.retain(|m| !(m.family == family && m.direction == direction));
        self.route_maps.push(RouteMapEntry {
            family,
            direction,
            name: name.to_string(),
        });
    }
}

/// Recognise a VRF header line, returning the dialect and VRF name
pub fn match_header(line: &str) -> Option<(VrfDialect, &str)> {
    let toks = tokens(line);
    match toks.as_slice() {
        ["ip", "vrf", name] => Some((VrfDialect::Legacy, *name)),
        ["vrf", "definition", name] => Some((VrfDialect::MultiFamily, *name)),
        ["vrf", name] if *name != "definition" => Some((VrfDialect::RouteTargetBlock, *name)),
        _ => None,
    }
}

/// Target values on one line of a route-target list, or `None` when the
/// line is not entirely made of values
fn route_target_values(line: &str) -> Option<Vec<&str>> {
    let mut values = Vec::new();
    for token in line.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let caps = RT_VALUE.captures(token)?;
        values.push(caps.name("rt")?.as_str());
    }
    if values.is_empty() { None } else { Some(values) }
}

fn parse_directions(word: &str) -> Option<&'static [RtDirection]> {
    match word {
        "import" => Some(&[RtDirection::Import]),
        "export" => Some(&[RtDirection::Export]),
        "both" => Some(&[RtDirection::Import, RtDirection::Export]),
        _ => None,
    }
}

fn parse_family(word: &str) -> Option<AddressFamily> {
    match word.to_ascii_lowercase().as_str() {
        "ipv4" => Some(AddressFamily::V4),
        "ipv6" => Some(AddressFamily::V6),
        _ => None,
    }
}

fn parse_direction(word: &str) -> Option<RtDirection> {
    match word {
        "import" => Some(RtDirection::Import),
        "export" => Some(RtDirection::Export),
        _ => None,
    }
}

/// Parse the VRF block whose header is at `index`.
///
/// Returns the block and the index of the first line after it.
pub fn parse_vrf(
    lines: &[&str],
    index: usize,
    dialect: VrfDialect,
    name: &str,
    ctx: &mut ParseContext,
) -> (VrfBlock, usize) {
    let mut block = VrfBlock::new(name, dialect, index);
    // Legacy VRFs are single-family; the others start outside any family
    let mut family = match dialect {
        VrfDialect::Legacy => Some(AddressFamily::V4),
        _ => None,
    };

    let mut i = index + 1;
    while i < lines.len() && is_body_line(lines[i]) {
        let line = lines[i];
        if is_filler(line) {
            i += 1;
            continue;
        }
        let toks = tokens(line);
        match toks.as_slice() {
            ["rd", rd, ..] => block.rd = Some(rd.to_string()),
            ["description", ..] => {
                let text = line.trim().trim_start_matches("description").trim();
                block.description = Some(text.to_string());
            }
            ["address-family", af, ..] if dialect != VrfDialect::Legacy => match parse_family(af) {
                Some(af) => family = Some(af),
                None => ctx.ignored(i, line),
            },
            ["exit-address-family"] => family = None,
            ["route-target", direction, value, ..] if dialect != VrfDialect::RouteTargetBlock => {
                let Some(directions) = parse_directions(direction) else {
                    ctx.unparseable(i, line);
                    i += 1;
                    continue;
                };
                match family {
                    Some(af) => {
                        for dir in directions {
                            block.add_route_target(af, *dir, value);
                        }
                    }
                    None => ctx.discarded_route_target(i, name, value),
                }
            }
            [direction, "route-target"] if dialect == VrfDialect::RouteTargetBlock => {
                // Marker line; the values follow until a line that is not a value list
                let directions = parse_directions(direction).unwrap_or(&[]);
                let af = family.unwrap_or(AddressFamily::V4);
                let mut j = i + 1;
                while j < lines.len() {
                    let Some(values) = route_target_values(lines[j]) else {
                        break;
                    };
                    for value in values {
                        for dir in directions {
                            block.add_route_target(af, *dir, value);
                        }
                    }
                    j += 1;
                }
                i = j;
                continue;
            }
            [direction, "map" | "route-policy", map, ..] => match parse_direction(direction) {
                Some(dir) => block.add_route_map(family.unwrap_or(AddressFamily::V4), dir, map),
                None => ctx.ignored(i, line),
            },
            _ => ctx.ignored(i, line),
        }
        i += 1;
    }

    (block, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn parse(text: &str) -> (VrfBlock, usize, ParseContext<'static>) {
        static OPTIONS: ParseOptions = ParseOptions { log_ignored_lines: false };
        let lines: Vec<&str> = text.lines().collect();
        let (dialect, name) = match_header(lines[0]).unwrap();
        let name = name.to_string();
        let mut ctx = ParseContext::new(&OPTIONS, "test");
        let (block, next) = parse_vrf(&lines, 0, dialect, &name, &mut ctx);
        (block, next, ctx)
    }

    #[test]
    fn test_match_header() {
        assert_eq!(match_header("ip vrf RED"), Some((VrfDialect::Legacy, "RED")));
        assert_eq!(match_header("vrf definition BLUE"), Some((VrfDialect::MultiFamily, "BLUE")));
        assert_eq!(match_header("vrf GREEN"), Some((VrfDialect::RouteTargetBlock, "GREEN")));
        assert_eq!(match_header("ip vrf forwarding RED extra"), None);
        assert_eq!(match_header("vrf definition"), None);
    }

    #[test]
    fn test_legacy_vrf() {
        let text = "ip vrf RED\n description Red customer\n rd 65000:1\n route-target export 65000:1\n route-target import 65000:2\n route-target both 65000:9\n import map RED-IN\n!\ninterface Loopback0";
        let (block, next, ctx) = parse(text);
        assert_eq!(next, 7);
        assert_eq!(block.rd.as_deref(), Some("65000:1"));
        assert_eq!(block.description.as_deref(), Some("Red customer"));
        let exports: Vec<_> = block.route_targets_for(AddressFamily::V4, RtDirection::Export).collect();
        let imports: Vec<_> = block.route_targets_for(AddressFamily::V4, RtDirection::Import).collect();
        assert_eq!(exports, vec!["65000:1", "65000:9"]);
        assert_eq!(imports, vec!["65000:2", "65000:9"]);
        assert_eq!(block.route_maps[0].name, "RED-IN");
        assert_eq!(ctx.diagnostics.ignored_lines, 0);
    }

    #[test]
    fn test_multi_family_discards_early_route_targets() {
        let text = "vrf definition CUSTOMER_A\n rd 100:1\n route-target export 999:9\n !\n address-family ipv4\n  route-target export 100:1\n  route-target import 200:2\n exit-address-family\n !\n address-family ipv6\n  route-target export 100:6\n  export map V6-OUT\n exit-address-family\n!";
        let (block, next, ctx) = parse(text);
        assert_eq!(next, 13);
        assert_eq!(ctx.diagnostics.discarded_route_targets, 1);
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Export).collect::<Vec<_>>(),
            vec!["100:1"]
        );
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Import).collect::<Vec<_>>(),
            vec!["200:2"]
        );
        assert_eq!(
            block.route_targets_for(AddressFamily::V6, RtDirection::Export).collect::<Vec<_>>(),
            vec!["100:6"]
        );
        assert_eq!(block.route_maps[0].family, AddressFamily::V6);
    }

    #[test]
    fn test_route_target_block_leaves_next_line_unconsumed() {
        let text = "vrf GREEN\n address-family ipv4 unicast\n  import route-target\n   300:1\n   300:2\n  !\n  export route-target\n   300:1\n  !\n  import route-policy GREEN-IN\n !\n!";
        let (block, next, _ctx) = parse(text);
        assert_eq!(next, 11);
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Import).collect::<Vec<_>>(),
            vec!["300:1", "300:2"]
        );
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Export).collect::<Vec<_>>(),
            vec!["300:1"]
        );
        assert_eq!(block.route_maps[0].name, "GREEN-IN");
    }

    #[test]
    fn test_block_closed_at_eof() {
        let (block, next, _ctx) = parse("ip vrf LAST\n rd 1:1\n route-target export 1:1");
        assert_eq!(next, 3);
        assert_eq!(block.route_targets.len(), 1);
    }

    #[test]
    fn test_route_target_block_comma_and_newline_lists() {
        let text = "vrf GREEN\n address-family ipv4 unicast\n  import route-target\n   100:1, 100:2\n   100:3\n  !\n  export route-target\n   10.0.0.1:7,\n   200:1 , 200:2\n  !\n !\n!";
        let (block, _next, _ctx) = parse(text);
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Import).collect::<Vec<_>>(),
            vec!["100:1", "100:2", "100:3"]
        );
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Export).collect::<Vec<_>>(),
            vec!["10.0.0.1:7", "200:1", "200:2"]
        );
    }

    #[test]
    fn test_route_target_block_both_with_several_values() {
        let text = "vrf SHARED\n address-family ipv6 unicast\n  both route-target\n   65000:1, 65000:2\n  import route-policy X\n !\n!";
        let (block, _next, _ctx) = parse(text);
        for direction in [RtDirection::Import, RtDirection::Export] {
            assert_eq!(
                block.route_targets_for(AddressFamily::V6, direction).collect::<Vec<_>>(),
                vec!["65000:1", "65000:2"]
            );
        }
        assert_eq!(block.route_maps.len(), 1);
    }

    #[test]
    fn test_route_target_list_stops_at_mixed_line() {
        let text = "vrf MIXED\n address-family ipv4 unicast\n  import route-target\n   1:1, not-a-target\n !\n!";
        let (block, _next, ctx) = parse(text);
        assert!(block.route_targets.is_empty());
        assert_eq!(ctx.diagnostics.ignored_lines, 1);
    }

    #[test]
    fn test_several_targets_per_direction_in_each_dialect() {
        let legacy = "ip vrf RED\n route-target export 1:1\n route-target export 1:2\n route-target import 2:1\n route-target import 2:2\n!";
        let (block, _, _) = parse(legacy);
        assert_eq!(block.route_targets_for(AddressFamily::V4, RtDirection::Export).count(), 2);
        assert_eq!(block.route_targets_for(AddressFamily::V4, RtDirection::Import).count(), 2);

        let definition = "vrf definition BLUE\n address-family ipv4\n  route-target export 3:1\n  route-target export 3:2\n  route-target both 3:3\n  route-target import 4:1\n exit-address-family\n!";
        let (block, _, _) = parse(definition);
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Export).collect::<Vec<_>>(),
            vec!["3:1", "3:2", "3:3"]
        );
        assert_eq!(
            block.route_targets_for(AddressFamily::V4, RtDirection::Import).collect::<Vec<_>>(),
            vec!["3:3", "4:1"]
        );
    }
}
