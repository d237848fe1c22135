//! `show cdp neighbors` parser, summary table and `detail` output

use super::ParseContext;
use regex::Regex;
use std::sync::LazyLock;

static NEIGHBOR_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<device>\S+)\s+(?P<local>[A-Za-z][A-Za-z-]*\s*\d[\d/.:]*)\s+(?P<hold>\d+)\s+(?P<caps>(?:[A-Za-z]\s+)+)(?P<platform>.*?)\s*(?P<port>[A-Za-z][A-Za-z-]*\s*\d[\d/.:]*)\s*$",
    )
    .expect("cdp neighbor row pattern")
});

static DETAIL_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Device ID:\s*(?P<device>\S+)").expect("cdp device pattern"));
static DETAIL_PLATFORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Platform:\s*(?P<platform>[^,]+?)\s*,\s*Capabilities:\s*(?P<caps>.*?)\s*$")
        .expect("cdp platform pattern")
});
static DETAIL_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Interface:\s*(?P<local>[^,]+?)\s*,\s*Port ID \(outgoing port\):\s*(?P<port>.+?)\s*$")
        .expect("cdp interface pattern")
});
static DETAIL_HOLDTIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Holdtime\s*:\s*(?P<hold>\d+)").expect("cdp holdtime pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdpNeighbor {
    pub device_id: String,
    pub local_interface: String,
    pub holdtime: Option<u32>,
    pub capabilities: String,
    pub platform: String,
    pub remote_interface: String,
    pub line: usize,
}

fn from_row(caps: &regex::Captures, line: usize) -> CdpNeighbor {
    CdpNeighbor {
        device_id: caps["device"].to_string(),
        local_interface: caps["local"].to_string(),
        holdtime: caps["hold"].parse().ok(),
        capabilities: caps["caps"].split_whitespace().collect::<Vec<_>>().join(" "),
        platform: caps["platform"].trim().to_string(),
        remote_interface: caps["port"].to_string(),
        line,
    }
}

/// Parse a neighbor section between `start` and `end`
pub fn parse_cdp_neighbors(lines: &[&str], start: usize, end: usize, ctx: &mut ParseContext) -> Vec<CdpNeighbor> {
    let end = end.min(lines.len());
    if lines[start.min(end)..end].iter().any(|l| DETAIL_DEVICE.is_match(l)) {
        return parse_detail(lines, start, end);
    }

    let mut neighbors = Vec::new();
    let mut i = start;
    while i < end {
        let line = lines[i];
        if let Some(caps) = NEIGHBOR_ROW.captures(line) {
            neighbors.push(from_row(&caps, i));
            i += 1;
            continue;
        }
        // Long device ids are printed alone, the row continues indented below
        let device = line.trim();
        if !device.is_empty() && !line.starts_with(char::is_whitespace) && !device.contains(char::is_whitespace) && i + 1 < end {
            let joined = format!("{} {}", device, lines[i + 1].trim());
            if let Some(caps) = NEIGHBOR_ROW.captures(&joined) {
                neighbors.push(from_row(&caps, i));
                i += 2;
                continue;
            }
        }
        if !line.trim().is_empty() {
            ctx.ignored(i, line);
        }
        i += 1;
    }
    neighbors
}

fn parse_detail(lines: &[&str], start: usize, end: usize) -> Vec<CdpNeighbor> {
    let mut neighbors: Vec<CdpNeighbor> = Vec::new();
    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        let line = line.trim();
        if let Some(caps) = DETAIL_DEVICE.captures(line) {
            neighbors.push(CdpNeighbor {
                device_id: caps["device"].to_string(),
                line: i,
                ..Default::default()
            });
            continue;
        }
        let Some(current) = neighbors.last_mut() else {
            continue;
        };
        if let Some(caps) = DETAIL_PLATFORM.captures(line) {
            current.platform = caps["platform"].to_string();
            current.capabilities = caps["caps"].to_string();
        } else if let Some(caps) = DETAIL_INTERFACE.captures(line) {
            current.local_interface = caps["local"].to_string();
            current.remote_interface = caps["port"].to_string();
        } else if let Some(caps) = DETAIL_HOLDTIME.captures(line) {
            current.holdtime = caps["hold"].parse().ok();
        }
    }
    neighbors
}
