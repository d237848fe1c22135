//! `show inventory` parser

use super::ParseContext;
use regex::Regex;
use std::sync::LazyLock;

static NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*NAME:\s*"(?P<name>[^"]*)"\s*,\s*DESCR:\s*"(?P<descr>[^"]*)""#).expect("inventory name pattern")
});

static PID_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*PID:\s*(?P<pid>[^,]*?)\s*,\s*VID:\s*(?P<vid>[^,]*?)\s*,\s*SN:\s*(?P<sn>\S*)")
        .expect("inventory pid pattern")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryItem {
    pub name: String,
    pub description: String,
    pub pid: String,
    pub vid: String,
    pub serial: String,
    pub line: usize,
}

/// Parse NAME/DESCR lines each followed by a PID/VID/SN line
pub fn parse_inventory(lines: &[&str], start: usize, end: usize, ctx: &mut ParseContext) -> Vec<InventoryItem> {
    let mut items: Vec<InventoryItem> = Vec::new();
    let mut pending: Option<InventoryItem> = None;

    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        if let Some(caps) = NAME_LINE.captures(line) {
            if let Some(item) = pending.take() {
                items.push(item);
            }
            pending = Some(InventoryItem {
                name: caps["name"].to_string(),
                description: caps["descr"].to_string(),
                line: i,
                ..Default::default()
            });
        } else if let Some(caps) = PID_LINE.captures(line) {
            match pending.take() {
                Some(mut item) => {
                    item.pid = caps["pid"].to_string();
                    item.vid = caps["vid"].to_string();
                    item.serial = caps["sn"].to_string();
                    items.push(item);
                }
                None => ctx.unparseable(i, line),
            }
        }
    }
    if let Some(item) = pending {
        items.push(item);
    }
    items
}
