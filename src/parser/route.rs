//! Static route parser
//!
//! Classic form, one statement per line:
//! `ip route [vrf V] NET MASK [NEXTHOP-IP] [INTERFACE] [DISTANCE] [name X] ...`
//! and `ipv6 route [vrf V] PREFIX/LEN ...`.
//!
//! Block form under `router static`, scoped by optional `vrf V` and
//! `address-family` lines, with entries `PREFIX/LEN [vrf LEAK] [INTERFACE] [NEXTHOP-IP] [DISTANCE] ...`.

use super::{is_body_line, is_filler, tokens, ParseContext};
use crate::entity::{InterfaceName, RouteForm};
use crate::net::IpPrefix;
use std::net::IpAddr;

/// Default administrative distance of a static route
pub const DEFAULT_DISTANCE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRouteEntry {
    pub line: usize,
    pub form: RouteForm,
    pub destination: IpPrefix,
    /// Owning VRF; `None` is the global table
    pub vrf: Option<String>,
    /// Target VRF of a leaking route
    pub leak_vrf: Option<String>,
    pub next_hop_ip: Option<IpAddr>,
    pub next_hop_int: Option<InterfaceName>,
    pub distance: u8,
    pub name: Option<String>,
}

impl StaticRouteEntry {
    fn new(line: usize, form: RouteForm, destination: IpPrefix, vrf: Option<String>) -> Self {
        Self {
            line,
            form,
            destination,
            vrf,
            leak_vrf: None,
            next_hop_ip: None,
            next_hop_int: None,
            distance: DEFAULT_DISTANCE,
            name: None,
        }
    }

    /// Consume the tokens following the destination
    fn apply_options(&mut self, mut rest: &[&str]) {
        while let Some((word, tail)) = rest.split_first() {
            rest = tail;
            match *word {
                "name" | "description" => {
                    if let Some((value, tail)) = take_name(rest) {
                        self.name = Some(value);
                        rest = tail;
                    }
                }
                "tag" | "track" | "metric" => {
                    rest = rest.split_first().map(|(_, tail)| tail).unwrap_or(rest);
                }
                "vrf" if self.form == RouteForm::Block => {
                    if let Some((value, tail)) = rest.split_first() {
                        self.leak_vrf = Some(value.to_string());
                        rest = tail;
                    }
                }
                "permanent" | "global" | "multicast" | "dhcp" => {}
                "bfd" => break,
                other => {
                    if let Ok(addr) = other.parse::<IpAddr>() {
                        self.next_hop_ip.get_or_insert(addr);
                    } else if let Ok(distance) = other.parse::<u8>() {
                        self.distance = distance;
                    } else if let Ok(name) = other.parse::<InterfaceName>() {
                        self.next_hop_int.get_or_insert(name);
                    }
                }
            }
        }
    }
}

/// A route name: one word, or a double-quoted run of words
fn take_name<'a, 'b>(rest: &'b [&'a str]) -> Option<(String, &'b [&'a str])> {
    let (first, tail) = rest.split_first()?;
    let Some(opened) = first.strip_prefix('"') else {
        return Some((first.to_string(), tail));
    };
    if let Some(whole) = opened.strip_suffix('"') {
        return Some((whole.to_string(), tail));
    }
    let mut words = vec![opened];
    for (pos, &word) in tail.iter().enumerate() {
        if let Some(last) = word.strip_suffix('"') {
            words.push(last);
            return Some((words.join(" "), &tail[pos + 1..]));
        }
        words.push(word);
    }
    // Unterminated quote runs to the end of the line
    Some((words.join(" "), &[]))
}

/// Parse a single `ip route` / `ipv6 route` line
pub fn parse_classic_route(lines: &[&str], index: usize, ctx: &mut ParseContext) -> (Option<StaticRouteEntry>, usize) {
    let line = lines[index];
    let toks = tokens(line);
    let (v6, mut rest) = match toks.as_slice() {
        ["ip", "route", rest @ ..] => (false, rest),
        ["ipv6", "route", rest @ ..] => (true, rest),
        _ => return (None, index + 1),
    };

    let mut vrf = None;
    if let ["vrf", name, tail @ ..] = rest {
        vrf = Some(name.to_string());
        rest = tail;
    }

    let parsed = if v6 {
        rest.split_first()
            .and_then(|(prefix, tail)| prefix.parse::<IpPrefix>().ok().map(|p| (p, tail)))
    } else {
        match rest {
            [net, mask, tail @ ..] => IpPrefix::from_addr_mask(net, mask).ok().map(|p| (p, tail)),
            _ => None,
        }
    };

    let Some((destination, options)) = parsed else {
        ctx.invalid_address(index, line);
        return (None, index + 1);
    };

    let mut entry = StaticRouteEntry::new(index, RouteForm::Classic, destination, vrf);
    entry.apply_options(options);
    (Some(entry), index + 1)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Parse a `router static` block whose header is at `index`
pub fn parse_route_block(lines: &[&str], index: usize, ctx: &mut ParseContext) -> (Vec<StaticRouteEntry>, usize) {
    let mut routes = Vec::new();
    let mut vrf: Option<(String, usize)> = None;

    let mut i = index + 1;
    while i < lines.len() && is_body_line(lines[i]) {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let indent = indent_of(line);
        if vrf.as_ref().is_some_and(|(_, level)| indent <= *level) {
            vrf = None;
        }
        if is_filler(line) {
            i += 1;
            continue;
        }

        let toks = tokens(line);
        match toks.as_slice() {
            ["vrf", name] => vrf = Some((name.to_string(), indent)),
            ["address-family", ..] => {}
            [prefix, options @ ..] => match prefix.parse::<IpPrefix>() {
                Ok(destination) => {
                    let owner = vrf.as_ref().map(|(name, _)| name.clone());
                    let mut entry = StaticRouteEntry::new(i, RouteForm::Block, destination, owner);
                    entry.apply_options(options);
                    routes.push(entry);
                }
                Err(_) => ctx.ignored(i, line),
            },
            [] => {}
        }
        i += 1;
    }

    (routes, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn classic(line: &str) -> Option<StaticRouteEntry> {
        let options = ParseOptions::default();
        let mut ctx = ParseContext::new(&options, "test");
        parse_classic_route(&[line], 0, &mut ctx).0
    }

    #[test]
    fn test_classic_route_with_next_hop_ip() {
        let route = classic("ip route 0.0.0.0 0.0.0.0 10.0.0.1").unwrap();
        assert_eq!(route.destination.to_string(), "0.0.0.0/0");
        assert_eq!(route.next_hop_ip, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(route.next_hop_int, None);
        assert_eq!(route.distance, DEFAULT_DISTANCE);
        assert_eq!(route.vrf, None);
    }

    #[test]
    fn test_classic_route_options() {
        let route = classic("ip route vrf RED 10.20.0.0 255.255.0.0 GigabitEthernet0/1 10.1.1.1 250 name BACKUP track 3 permanent").unwrap();
        assert_eq!(route.vrf.as_deref(), Some("RED"));
        assert_eq!(route.next_hop_int, Some("GigabitEthernet0/1".parse().unwrap()));
        assert_eq!(route.next_hop_ip, Some("10.1.1.1".parse().unwrap()));
        assert_eq!(route.distance, 250);
        assert_eq!(route.name.as_deref(), Some("BACKUP"));
    }

    #[test]
    fn test_ipv6_classic_route() {
        let route = classic("ipv6 route 2001:db8:10::/48 Null0").unwrap();
        assert_eq!(route.destination.to_string(), "2001:db8:10::/48");
        assert_eq!(route.next_hop_int.unwrap().kind, "Null");
    }

    #[test]
    fn test_invalid_classic_route() {
        assert!(classic("ip route 10.0.0.0 255.0.255.0 10.0.0.1").is_none());
        assert!(classic("ip route profile").is_none());
    }

    #[test]
    fn test_route_block() {
        let text = "router static\n address-family ipv4 unicast\n  0.0.0.0/0 192.0.2.1\n  10.1.0.0/16 GigabitEthernet0/0/0/1 192.0.2.2 200\n !\n vrf CUST\n  address-family ipv4 unicast\n   10.9.0.0/16 vrf SHARED 10.5.5.5 description to-shared\n  !\n !\n address-family ipv6 unicast\n  ::/0 2001:db8::1\n !\n!";
        let options = ParseOptions::default();
        let lines: Vec<&str> = text.lines().collect();
        let mut ctx = ParseContext::new(&options, "test");
        let (routes, next) = parse_route_block(&lines, 0, &mut ctx);
        assert_eq!(next, 13);
        assert_eq!(routes.len(), 4);

        assert_eq!(routes[0].vrf, None);
        assert_eq!(routes[1].distance, 200);
        assert_eq!(routes[1].next_hop_int, Some("GigabitEthernet0/0/0/1".parse().unwrap()));

        assert_eq!(routes[2].vrf.as_deref(), Some("CUST"));
        assert_eq!(routes[2].leak_vrf.as_deref(), Some("SHARED"));
        assert_eq!(routes[2].name.as_deref(), Some("to-shared"));

        assert_eq!(routes[3].vrf, None);
        assert_eq!(routes[3].form, RouteForm::Block);
    }

    #[test]
    fn test_quoted_route_name_keeps_every_word() {
        let route = classic("ip route 10.7.0.0 255.255.0.0 10.0.0.7 name \"to branch 7\" tag 5").unwrap();
        assert_eq!(route.name.as_deref(), Some("to branch 7"));
        assert_eq!(route.next_hop_ip, Some("10.0.0.7".parse().unwrap()));

        let single = classic("ip route 10.8.0.0 255.255.0.0 10.0.0.8 name BRANCH8 250").unwrap();
        assert_eq!(single.name.as_deref(), Some("BRANCH8"));
        assert_eq!(single.distance, 250);

        let quoted_word = classic("ip route 10.9.0.0 255.255.0.0 Null0 name \"BLACKHOLE\"").unwrap();
        assert_eq!(quoted_word.name.as_deref(), Some("BLACKHOLE"));
    }
}
