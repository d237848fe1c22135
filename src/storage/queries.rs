//! Read-side queries used by the resolver and the report snapshot

use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use super::sqlite::{conversion_error, SqliteStore};
use crate::entity::{AddressFamily, AddressType, RtDirection};
use crate::Result;

/// An appliance with its site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplianceRow {
    pub id: i64,
    pub hostname: String,
    pub site: String,
    pub importance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VrfRow {
    pub id: i64,
    pub app_id: i64,
    pub name: String,
    pub rd: Option<String>,
    pub description: Option<String>,
}

/// One route-target value attached to a VRF, with the VRF's location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteTargetRow {
    pub vrf_id: i64,
    pub family: AddressFamily,
    pub value: String,
    pub site: String,
    pub hostname: String,
    pub vrf: String,
}

/// A resolved interface listed under its VRF
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VrfInterfaceRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    /// Port-channel this interface is bundled into
    pub member_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressRow {
    pub address: String,
    pub kind: AddressType,
}

/// Where an address lives in the fleet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressOwner {
    pub site: String,
    pub hostname: String,
    pub interface: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SviVlan {
    pub name: Option<String>,
    pub exist: bool,
}

/// Static routes of one VRF grouped by where they point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummaryRow {
    pub next_hop_ip: Option<String>,
    pub next_hop_int: Option<String>,
    pub leak_vrf: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRow {
    pub name: String,
    pub description: Option<String>,
    pub pid: Option<String>,
    pub vid: Option<String>,
    pub serial: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRow {
    pub device_id: String,
    pub local_interface: Option<String>,
    pub remote_interface: Option<String>,
    pub platform: Option<String>,
}

/// An entity left pending after resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanRow {
    pub kind: String,
    pub site: String,
    pub hostname: String,
    pub name: String,
    pub reasons: String,
}

impl SqliteStore {
    // ========== Report Queries ==========

    /// All appliances, most important site first
    pub fn appliances(&self) -> Result<Vec<ApplianceRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.app_id, a.hostname, s.name, s.importance
            FROM appliance a JOIN site s ON s.site_id = a.site_id
            ORDER BY s.importance, s.name, a.hostname
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ApplianceRow {
                    id: row.get(0)?,
                    hostname: row.get(1)?,
                    site: row.get(2)?,
                    importance: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn vrfs_for(&self, app_id: i64) -> Result<Vec<VrfRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT vrf_id, app_id, name, rd, description FROM vrf WHERE app_id = ?1 ORDER BY name",
        )?;

        let rows = stmt
            .query_map([app_id], |row| {
                Ok(VrfRow {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    name: row.get(2)?,
                    rd: row.get(3)?,
                    description: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Every exported or imported route target in the fleet
    pub fn route_targets(&self, direction: RtDirection) -> Result<Vec<RouteTargetRow>> {
        let table = match direction {
            RtDirection::Export => "export_rt",
            RtDirection::Import => "import_rt",
        };
        let sql = format!(
            r#"
            SELECT r.vrf_id, r.add_fam, r.rt, s.name, a.hostname, v.name
            FROM {} r
            JOIN vrf v ON v.vrf_id = r.vrf_id
            JOIN appliance a ON a.app_id = v.app_id
            JOIN site s ON s.site_id = a.site_id
            ORDER BY r.id
            "#,
            table
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt
            .query_map([], |row| {
                let family: String = row.get(1)?;
                Ok(RouteTargetRow {
                    vrf_id: row.get(0)?,
                    family: family.parse().map_err(|e| conversion_error(1, e))?,
                    value: row.get(2)?,
                    site: row.get(3)?,
                    hostname: row.get(4)?,
                    vrf: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Resolved interfaces bound to a VRF, in declaration order
    pub fn interfaces_in_vrf(&self, vrf_id: i64) -> Result<Vec<VrfInterfaceRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT i.int_id, i.type || i.number || CASE WHEN i.subif = '' THEN '' ELSE '.' || i.subif END,
                   i.description, i.status,
                   pc.type || pc.number
            FROM interface i
            LEFT JOIN interface pc ON pc.int_id = i.member_of
            WHERE i.vrf_id = ?1 AND i.state = 'resolved'
            ORDER BY i.int_id
            "#,
        )?;

        let rows = stmt
            .query_map([vrf_id], |row| {
                Ok(VrfInterfaceRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    status: row.get(3)?,
                    member_of: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Resolved interfaces bundled into the given port-channel
    pub fn port_channel_members(&self, int_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT type || number || CASE WHEN subif = '' THEN '' ELSE '.' || subif END
            FROM interface
            WHERE member_of = ?1 AND state = 'resolved'
            ORDER BY int_id
            "#,
        )?;

        let rows = stmt
            .query_map([int_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn addresses_of(&self, int_id: i64) -> Result<Vec<AddressRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT address, address_type FROM ip_address WHERE int_id = ?1 ORDER BY ip_id",
        )?;

        let rows = stmt
            .query_map([int_id], |row| {
                let kind: String = row.get(1)?;
                Ok(AddressRow {
                    address: row.get(0)?,
                    kind: kind.parse().map_err(|e| conversion_error(1, e))?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// The VLAN behind an SVI, if it is known at all
    pub fn svi_vlan(&self, app_id: i64, vlan_no: u16) -> Result<Option<SviVlan>> {
        self.conn
            .query_row(
                "SELECT name, exist FROM vlan WHERE app_id = ?1 AND vlan_no = ?2",
                params![app_id, vlan_no],
                |row| {
                    Ok(SviVlan {
                        name: row.get(0)?,
                        exist: row.get::<_, i64>(1)? != 0,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Names of the interfaces carrying a VLAN
    pub fn interfaces_carrying(&self, app_id: i64, vlan_no: u16) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT i.type || i.number || CASE WHEN i.subif = '' THEN '' ELSE '.' || i.subif END
            FROM int_vlan b
            JOIN vlan v ON v.vlan_id = b.vlan_id
            JOIN interface i ON i.int_id = b.int_id
            WHERE v.app_id = ?1 AND v.vlan_no = ?2
            ORDER BY i.int_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![app_id, vlan_no], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Interfaces anywhere in the fleet owning the given host address
    pub fn address_owners(&self, host: &str) -> Result<Vec<AddressOwner>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.name, a.hostname,
                   i.type || i.number || CASE WHEN i.subif = '' THEN '' ELSE '.' || i.subif END
            FROM ip_address ip
            JOIN interface i ON i.int_id = ip.int_id
            JOIN appliance a ON a.app_id = i.app_id
            JOIN site s ON s.site_id = a.site_id
            WHERE ip.address LIKE ?1 || '/%'
            ORDER BY ip.ip_id
            "#,
        )?;

        let rows = stmt
            .query_map([host], |row| {
                Ok(AddressOwner {
                    site: row.get(0)?,
                    hostname: row.get(1)?,
                    interface: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Static routes of a VRF grouped by next hop and leak target, biggest group first
    pub fn static_route_summary(&self, vrf_id: i64) -> Result<Vec<RouteSummaryRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT next_hop_ip, next_hop_int, leak_vrf_name, COUNT(*) AS cnt
            FROM static_route
            WHERE vrf_id = ?1 AND state = 'resolved'
            GROUP BY next_hop_ip, next_hop_int, leak_vrf_name
            ORDER BY cnt DESC, next_hop_ip, next_hop_int
            "#,
        )?;

        let rows = stmt
            .query_map([vrf_id], |row| {
                Ok(RouteSummaryRow {
                    next_hop_ip: row.get(0)?,
                    next_hop_int: row.get(1)?,
                    leak_vrf: row.get(2)?,
                    count: row.get::<_, i64>(3)? as usize,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn inventory_of(&self, app_id: i64) -> Result<Vec<InventoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, description, pid, vid, serial FROM inventory WHERE app_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map([app_id], |row| {
                Ok(InventoryRow {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    pid: row.get(2)?,
                    vid: row.get(3)?,
                    serial: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn neighbors_of(&self, app_id: i64) -> Result<Vec<NeighborRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT device_id, local_int, remote_int, platform FROM cdp_neighbor WHERE app_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map([app_id], |row| {
                Ok(NeighborRow {
                    device_id: row.get(0)?,
                    local_interface: row.get(1)?,
                    remote_interface: row.get(2)?,
                    platform: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Everything still pending, for the orphaned category
    pub fn orphaned(&self) -> Result<Vec<OrphanRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT 'interface', s.name, a.hostname,
                   i.type || i.number || CASE WHEN i.subif = '' THEN '' ELSE '.' || i.subif END,
                   COALESCE(i.pend_reason, '')
            FROM interface i
            JOIN appliance a ON a.app_id = i.app_id
            JOIN site s ON s.site_id = a.site_id
            WHERE i.state = 'pending'
            UNION ALL
            SELECT 'static-route', s.name, a.hostname, n.network, COALESCE(r.pend_reason, '')
            FROM static_route r
            JOIN subnet n ON n.subnet_id = r.subnet_id
            JOIN appliance a ON a.app_id = r.app_id
            JOIN site s ON s.site_id = a.site_id
            WHERE r.state = 'pending'
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(OrphanRow {
                    kind: row.get(0)?,
                    site: row.get(1)?,
                    hostname: row.get(2)?,
                    name: row.get(3)?,
                    reasons: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InterfaceRecord, DEFAULT_VRF};
    use crate::entity::{PendReason, ResolutionState, VlanTagMode};
    use crate::net::IpPrefix;

    #[test]
    fn test_route_targets_carry_location() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Core", 0).unwrap();
        let app = store.insert_appliance("PE1", site).unwrap();
        let vrf = store.insert_vrf(app, "RED", None, None, None).unwrap();
        store
            .insert_route_target(vrf, AddressFamily::V4, RtDirection::Export, "65000:1")
            .unwrap();

        let exports = store.route_targets(RtDirection::Export).unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].hostname, "PE1");
        assert_eq!(exports[0].vrf, "RED");
        assert!(store.route_targets(RtDirection::Import).unwrap().is_empty());
    }

    #[test]
    fn test_address_owners_match_host_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Core", 0).unwrap();
        let app = store.insert_appliance("PE1", site).unwrap();
        let int_id = store
            .insert_interface(&InterfaceRecord::new(app, "Loopback0".parse().unwrap()))
            .unwrap();
        let prefix: IpPrefix = "10.0.0.1/32".parse().unwrap();
        store.insert_address(Some(int_id), &prefix, AddressType::Primary).unwrap();
        store.insert_address(None, &prefix, AddressType::TunnelDestination).unwrap();

        let owners = store.address_owners("10.0.0.1").unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].interface, "Loopback0");
        assert!(store.address_owners("10.0.0.10").unwrap().is_empty());
    }

    #[test]
    fn test_interfaces_carrying_and_orphaned() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Core", 0).unwrap();
        let app = store.insert_appliance("SW1", site).unwrap();
        store.ensure_default_vrf(app).unwrap();

        let trunk = store
            .insert_interface(&InterfaceRecord::new(app, "GigabitEthernet0/1".parse().unwrap()))
            .unwrap();
        let vlan = store.reference_vlan(app, 30).unwrap();
        store.bind_vlan(trunk, vlan, VlanTagMode::Tagged).unwrap();
        assert_eq!(store.interfaces_carrying(app, 30).unwrap(), vec!["GigabitEthernet0/1"]);
        assert_eq!(store.svi_vlan(app, 30).unwrap(), Some(SviVlan { name: None, exist: false }));

        let mut member = InterfaceRecord::new(app, "GigabitEthernet0/2".parse().unwrap());
        member.group_id = Some("9".to_string());
        member.state = ResolutionState::pending(PendReason::PortChannel);
        store.insert_interface(&member).unwrap();

        let orphaned = store.orphaned().unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].name, "GigabitEthernet0/2");
        assert_eq!(orphaned[0].reasons, "port-channel");
        assert_eq!(store.vrfs_for(app).unwrap()[0].name, DEFAULT_VRF);
    }

    #[test]
    fn test_port_channel_members() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Core", 0).unwrap();
        let app = store.insert_appliance("SW2", site).unwrap();
        let vrf = store.ensure_default_vrf(app).unwrap();

        let mut pc = InterfaceRecord::new(app, "Port-channel3".parse().unwrap());
        pc.vrf_id = Some(vrf);
        let pc_id = store.insert_interface(&pc).unwrap();
        for name in ["GigabitEthernet0/1", "GigabitEthernet0/2"] {
            let mut member = InterfaceRecord::new(app, name.parse().unwrap());
            member.member_of = Some(pc_id);
            member.vrf_id = Some(vrf);
            store.insert_interface(&member).unwrap();
        }

        assert_eq!(
            store.port_channel_members(pc_id).unwrap(),
            vec!["GigabitEthernet0/1", "GigabitEthernet0/2"]
        );
        let listed = store.interfaces_in_vrf(vrf).unwrap();
        assert_eq!(listed[0].member_of, None);
        assert_eq!(listed[1].member_of.as_deref(), Some("Port-channel3"));
    }
}
