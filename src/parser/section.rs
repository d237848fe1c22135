//! Section scanner
//!
//! Splits a transcript into command-output sections at each command prompt.
//! The command typed after the prompt decides the section kind.

use regex::Regex;
use std::sync::LazyLock;

static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:RP/\d+/[^/\s]+/CPU\d+:)?(?P<host>[^\s#()]+)(?:\([^)]*\))?#\s*(?P<cmd>.*?)\s*$")
        .expect("prompt pattern")
});

static HOSTNAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hostname\s+(?P<host>\S+)").expect("hostname pattern"));

static CONFIG_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Building configuration|Current configuration\s*:)").expect("config banner pattern")
});

static SHOW_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sh\w*\s+run\w*(-config)?\b").expect("show run pattern"));
static SHOW_VLAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sh\w*\s+vlan\b").expect("show vlan pattern"));
static SHOW_CDP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sh\w*\s+cdp\s+ne\w*").expect("show cdp pattern"));
static SHOW_INVENTORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sh\w*\s+inv\w*").expect("show inventory pattern"));

/// What a section of output contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    RunningConfig,
    ShowVlan,
    CdpNeighbors,
    Inventory,
    /// Any other command, or output before the first prompt
    Other,
}

impl SectionKind {
    /// Classify the command typed after a prompt
    pub fn from_command(command: &str) -> Self {
        let command = command.trim();
        if SHOW_RUN.is_match(command) {
            SectionKind::RunningConfig
        } else if SHOW_VLAN.is_match(command) {
            SectionKind::ShowVlan
        } else if SHOW_CDP.is_match(command) {
            SectionKind::CdpNeighbors
        } else if SHOW_INVENTORY.is_match(command) {
            SectionKind::Inventory
        } else {
            SectionKind::Other
        }
    }
}

/// A command prompt line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub hostname: String,
    pub command: String,
}

/// Recognise `HOST#command`, including XR `RP/0/RSP0/CPU0:HOST#` prompts
pub fn parse_prompt(line: &str) -> Option<Prompt> {
    let caps = PROMPT.captures(line)?;
    Some(Prompt {
        hostname: caps["host"].to_string(),
        command: caps["cmd"].to_string(),
    })
}

/// A run of lines produced by one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Index of the prompt line, if the section was opened by one
    pub header: Option<usize>,
    /// First output line
    pub start: usize,
    /// One past the last output line
    pub end: usize,
    pub hostname: Option<String>,
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Split a transcript into ordered sections. Kinds may repeat.
pub fn scan_sections(lines: &[&str]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        kind: SectionKind::Other,
        header: None,
        start: 0,
        end: 0,
        hostname: None,
    };

    for (idx, line) in lines.iter().enumerate() {
        if let Some(prompt) = parse_prompt(line) {
            current.end = idx;
            sections.push(current);
            current = Section {
                kind: SectionKind::from_command(&prompt.command),
                header: Some(idx),
                start: idx + 1,
                end: idx + 1,
                hostname: Some(prompt.hostname),
            };
        } else if current.kind != SectionKind::RunningConfig && CONFIG_BANNER.is_match(line) {
            current.end = idx;
            let hostname = current.hostname.clone();
            sections.push(current);
            current = Section {
                kind: SectionKind::RunningConfig,
                header: None,
                start: idx + 1,
                end: idx + 1,
                hostname,
            };
        }
    }
    current.end = lines.len();
    sections.push(current);

    sections.retain(|s| !s.is_empty() || s.header.is_some());
    sections
}

/// The earliest hostname-bearing line: a prompt or a `hostname` statement
pub fn discover_hostname(lines: &[&str]) -> Option<(usize, String)> {
    lines.iter().enumerate().find_map(|(idx, line)| {
        if let Some(prompt) = parse_prompt(line) {
            return Some((idx, prompt.hostname));
        }
        HOSTNAME_LINE
            .captures(line)
            .map(|caps| (idx, caps["host"].to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let prompt = parse_prompt("PE-01#sh run").unwrap();
        assert_eq!(prompt.hostname, "PE-01");
        assert_eq!(prompt.command, "sh run");

        let xr = parse_prompt("RP/0/RSP0/CPU0:CORE-XR#show running-config").unwrap();
        assert_eq!(xr.hostname, "CORE-XR");

        let conf = parse_prompt("SW1(config-if)#").unwrap();
        assert_eq!(conf.hostname, "SW1");
        assert_eq!(conf.command, "");

        assert!(parse_prompt(" description PE-01#uplink").is_none());
        assert!(parse_prompt("interface GigabitEthernet0/1").is_none());
    }

    #[test]
    fn test_section_kinds() {
        assert_eq!(SectionKind::from_command("show running-config"), SectionKind::RunningConfig);
        assert_eq!(SectionKind::from_command("sh run"), SectionKind::RunningConfig);
        assert_eq!(SectionKind::from_command("sh vlan brief"), SectionKind::ShowVlan);
        assert_eq!(SectionKind::from_command("show cdp neighbors"), SectionKind::CdpNeighbors);
        assert_eq!(SectionKind::from_command("sh cdp nei detail"), SectionKind::CdpNeighbors);
        assert_eq!(SectionKind::from_command("show inventory"), SectionKind::Inventory);
        assert_eq!(SectionKind::from_command("show clock"), SectionKind::Other);
    }

    #[test]
    fn test_scan_sections() {
        let lines = vec![
            "login banner",
            "SW1#show vlan",
            "1    default   active",
            "SW1#sh run",
            "Building configuration...",
            "hostname SW1",
            "SW1#show vlan",
            "SW1#",
        ];
        let sections = scan_sections(&lines);
        let kinds: Vec<_> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Other,
                SectionKind::ShowVlan,
                SectionKind::RunningConfig,
                SectionKind::ShowVlan,
                SectionKind::Other,
            ]
        );
        assert_eq!(sections[1].start, 2);
        assert_eq!(sections[1].end, 3);
        assert_eq!(sections[2].end, 6);
    }

    #[test]
    fn test_banner_opens_running_config() {
        let lines = vec!["Building configuration...", "", "hostname R1", "interface Loopback0"];
        let sections = scan_sections(&lines);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::RunningConfig);
        assert_eq!(sections[0].start, 1);
    }

    #[test]
    fn test_discover_hostname() {
        let lines = vec!["", "hostname EDGE1", "EDGE1#show clock"];
        assert_eq!(discover_hostname(&lines), Some((1, "EDGE1".to_string())));
        assert_eq!(discover_hostname(&["no prompt here"]), None);
    }
}
