use tabled::{settings::Style, Table, Tabled};

use crate::report::InterfaceReport;
use crate::resolver::Relationship;
use crate::storage::{InventoryRow, NeighborRow, OrphanRow, RouteSummaryRow};

const NONE: &str = "-";

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        rounded(&self.rows)
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

fn rounded<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn or_none(value: Option<&str>) -> String {
    value.unwrap_or(NONE).to_string()
}

#[derive(Tabled)]
struct InterfaceLine {
    #[tabled(rename = "Interface")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

pub fn interfaces_table(interfaces: &[InterfaceReport]) -> String {
    let rows: Vec<_> = interfaces
        .iter()
        .map(|i| InterfaceLine {
            name: i.name.clone(),
            description: or_none(i.description.as_deref()),
            addresses: i
                .addresses
                .iter()
                .map(|a| format!("{} ({})", a.address, a.kind))
                .collect::<Vec<_>>()
                .join("\n"),
            notes: or_none(i.annotation.as_deref()),
        })
        .collect();
    rounded(&rows)
}

#[derive(Tabled)]
struct RelationshipLine {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Route target")]
    route_target: String,
    #[tabled(rename = "Peer")]
    peer: String,
}

pub fn relationships_table(relationships: &[Relationship]) -> String {
    let rows: Vec<_> = relationships
        .iter()
        .map(|r| RelationshipLine {
            family: r.family.to_string(),
            route_target: r.route_target.clone(),
            peer: r.peer_label(),
        })
        .collect();
    rounded(&rows)
}

#[derive(Tabled)]
struct RouteLine {
    #[tabled(rename = "Next hop")]
    next_hop_ip: String,
    #[tabled(rename = "Interface")]
    next_hop_int: String,
    #[tabled(rename = "Leak VRF")]
    leak_vrf: String,
    #[tabled(rename = "Routes")]
    count: usize,
}

pub fn routes_table(routes: &[RouteSummaryRow]) -> String {
    let rows: Vec<_> = routes
        .iter()
        .map(|r| RouteLine {
            next_hop_ip: or_none(r.next_hop_ip.as_deref()),
            next_hop_int: or_none(r.next_hop_int.as_deref()),
            leak_vrf: or_none(r.leak_vrf.as_deref()),
            count: r.count,
        })
        .collect();
    rounded(&rows)
}

#[derive(Tabled)]
struct InventoryLine {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Serial")]
    serial: String,
}

pub fn inventory_table(items: &[InventoryRow]) -> String {
    let rows: Vec<_> = items
        .iter()
        .map(|i| InventoryLine {
            name: i.name.clone(),
            description: or_none(i.description.as_deref()),
            pid: or_none(i.pid.as_deref()),
            serial: or_none(i.serial.as_deref()),
        })
        .collect();
    rounded(&rows)
}

#[derive(Tabled)]
struct NeighborLine {
    #[tabled(rename = "Device")]
    device_id: String,
    #[tabled(rename = "Local")]
    local_interface: String,
    #[tabled(rename = "Remote")]
    remote_interface: String,
    #[tabled(rename = "Platform")]
    platform: String,
}

pub fn neighbors_table(neighbors: &[NeighborRow]) -> String {
    let rows: Vec<_> = neighbors
        .iter()
        .map(|n| NeighborLine {
            device_id: n.device_id.clone(),
            local_interface: or_none(n.local_interface.as_deref()),
            remote_interface: or_none(n.remote_interface.as_deref()),
            platform: or_none(n.platform.as_deref()),
        })
        .collect();
    rounded(&rows)
}

#[derive(Tabled)]
struct OrphanLine {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Appliance")]
    hostname: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Waiting on")]
    reasons: String,
}

pub fn orphans_table(orphans: &[OrphanRow]) -> String {
    let rows: Vec<_> = orphans
        .iter()
        .map(|o| OrphanLine {
            kind: o.kind.clone(),
            site: o.site.clone(),
            hostname: o.hostname.clone(),
            name: o.name.clone(),
            reasons: o.reasons.clone(),
        })
        .collect();
    rounded(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AddressFamily;
    use crate::resolver::VrfRef;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(orphans_table(&[]).is_empty());
    }

    #[test]
    fn test_relationship_without_peer_shows_na() {
        let table = relationships_table(&[
            Relationship {
                family: AddressFamily::V4,
                route_target: "100:1".to_string(),
                peer: None,
            },
            Relationship {
                family: AddressFamily::V4,
                route_target: "200:2".to_string(),
                peer: Some(VrfRef {
                    vrf_id: 1,
                    site: "South".to_string(),
                    hostname: "PE2".to_string(),
                    vrf: "CUSTOMER_B".to_string(),
                }),
            },
        ]);
        assert!(table.contains("N/A"));
        assert!(table.contains("South / PE2 / CUSTOMER_B"));
        assert!(table.contains("Route target"));
    }

    #[test]
    fn test_stats_table() {
        let table = stats_table(&[("Appliances", "2")]);
        assert!(table.contains("Appliances"));
        assert!(table.contains('╭'));
    }
}
