//! VLAN declarations: `vlan LIST` configuration blocks and `show vlan` tables

use super::{expand_vlan_list, is_body_line, is_filler, tokens, ParseContext};
use regex::Regex;
use std::sync::LazyLock;

static VLAN_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<id>\d{1,4})\s+(?P<name>\S+)\s+(?P<status>[a-z]+(?:/[a-z]+)?)\b")
        .expect("show vlan row pattern")
});

/// Headers of the tables `show vlan` prints after the port table
static SECONDARY_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(VLAN\s+Type\s+SAID|VLAN\s+AREHops|Remote\s+SPAN\s+VLANs|Primary\s+Secondary\s+Type)")
        .expect("show vlan table header pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredVlan {
    pub number: u16,
    pub name: Option<String>,
    pub line: usize,
}

/// Recognise `vlan LIST`, returning the expanded VLAN numbers
pub fn match_header(line: &str) -> Option<Vec<u16>> {
    match tokens(line).as_slice() {
        ["vlan", list] => expand_vlan_list(list),
        _ => None,
    }
}

/// Parse a `vlan LIST` block; every listed VLAN gets the block's name
pub fn parse_vlan_block(
    lines: &[&str],
    index: usize,
    numbers: &[u16],
    ctx: &mut ParseContext,
) -> (Vec<DeclaredVlan>, usize) {
    let mut name = None;
    let mut i = index + 1;
    while i < lines.len() && is_body_line(lines[i]) {
        let line = lines[i];
        if !is_filler(line) {
            match tokens(line).as_slice() {
                ["name", ..] => {
                    name = Some(line.trim().trim_start_matches("name").trim().to_string());
                }
                _ => ctx.ignored(i, line),
            }
        }
        i += 1;
    }

    let vlans = numbers
        .iter()
        .map(|number| DeclaredVlan {
            number: *number,
            name: name.clone(),
            line: index,
        })
        .collect();
    (vlans, i)
}

/// Parse the rows of a `show vlan` / `show vlan brief` section.
///
/// Port lists wrapped onto indented continuation lines are skipped, and the
/// table ends at the first secondary table header.
pub fn parse_show_vlan(lines: &[&str], start: usize, end: usize, ctx: &mut ParseContext) -> Vec<DeclaredVlan> {
    let mut vlans = Vec::new();
    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        if SECONDARY_TABLE.is_match(line) {
            break;
        }
        if let Some(caps) = VLAN_ROW.captures(line) {
            match caps["id"].parse() {
                Ok(number) => vlans.push(DeclaredVlan {
                    number,
                    name: Some(caps["name"].to_string()),
                    line: i,
                }),
                Err(_) => ctx.unparseable(i, line),
            }
        }
    }
    vlans
}
