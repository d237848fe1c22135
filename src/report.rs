//! Report snapshot
//!
//! Read-only view of a resolved store, one [`ApplianceReport`] per device.
//! Rendering is left to the caller; everything here serializes with serde.

use serde::Serialize;

use crate::entity::{InterfaceName, RtDirection};
use crate::net::host_part;
use crate::resolver::{Relationship, RouteTargetIndex, NO_PEER};
use crate::storage::{
    AddressRow, InventoryRow, NeighborRow, OrphanRow, RouteSummaryRow, RouteTargetRow, SqliteStore, VrfInterfaceRow,
    VrfRow,
};
use crate::Result;

const NO_L2_VLAN: &str = "No L2 VLAN ID is found";

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub appliances: Vec<ApplianceReport>,
    /// Entities still pending after resolution
    pub orphaned: Vec<OrphanRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplianceReport {
    pub site: String,
    pub hostname: String,
    pub importance: i64,
    pub vrfs: Vec<VrfReport>,
    pub inventory: Vec<InventoryRow>,
    pub neighbors: Vec<NeighborRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VrfReport {
    pub name: String,
    pub rd: Option<String>,
    pub description: Option<String>,
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    pub exported_to: Vec<Relationship>,
    pub imported_from: Vec<Relationship>,
    pub interfaces: Vec<InterfaceReport>,
    pub static_routes: Vec<RouteSummaryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceReport {
    /// Interface name, suffixed with `(Shutdown)` when administratively down
    pub name: String,
    pub description: Option<String>,
    pub addresses: Vec<AddressRow>,
    /// VLAN, tunnel or port-channel details
    pub annotation: Option<String>,
}

/// Build the snapshot for every appliance in the store
pub fn build_report(store: &SqliteStore) -> Result<Report> {
    let index = RouteTargetIndex::build_from_store(store)?;
    let exports = store.route_targets(RtDirection::Export)?;
    let imports = store.route_targets(RtDirection::Import)?;

    let mut appliances = Vec::new();
    for appliance in store.appliances()? {
        let mut vrfs = Vec::new();
        for vrf in store.vrfs_for(appliance.id)? {
            vrfs.push(vrf_report(store, &index, &vrf, &exports, &imports)?);
        }
        appliances.push(ApplianceReport {
            site: appliance.site,
            hostname: appliance.hostname,
            importance: appliance.importance,
            vrfs,
            inventory: store.inventory_of(appliance.id)?,
            neighbors: store.neighbors_of(appliance.id)?,
        });
    }

    Ok(Report {
        appliances,
        orphaned: store.orphaned()?,
    })
}

fn vrf_report(
    store: &SqliteStore,
    index: &RouteTargetIndex,
    vrf: &VrfRow,
    exports: &[RouteTargetRow],
    imports: &[RouteTargetRow],
) -> Result<VrfReport> {
    let values = |rows: &[RouteTargetRow]| -> Vec<String> {
        rows.iter()
            .filter(|r| r.vrf_id == vrf.id)
            .map(|r| r.value.clone())
            .collect()
    };

    let mut interfaces = Vec::new();
    for row in store.interfaces_in_vrf(vrf.id)? {
        interfaces.push(interface_report(store, vrf.app_id, row)?);
    }

    Ok(VrfReport {
        name: vrf.name.clone(),
        rd: vrf.rd.clone(),
        description: vrf.description.clone(),
        exports: values(exports),
        imports: values(imports),
        exported_to: index.exported_to(vrf.id),
        imported_from: index.imports_from(vrf.id),
        interfaces,
        static_routes: store.static_route_summary(vrf.id)?,
    })
}

fn interface_report(store: &SqliteStore, app_id: i64, row: VrfInterfaceRow) -> Result<InterfaceReport> {
    let addresses = store.addresses_of(row.id)?;
    let mut notes = Vec::new();
    match row.name.parse::<InterfaceName>() {
        Ok(name) if name.is_kind("vlan") && !name.is_subinterface() => {
            notes.extend(svi_annotation(store, app_id, &name)?);
        }
        Ok(name) if name.is_kind("tunnel") => notes.extend(tunnel_annotation(store, row.id)?),
        Ok(name) if name.is_kind("port-channel") || name.is_kind("bundle-ether") => {
            let members = store.port_channel_members(row.id)?;
            if !members.is_empty() {
                notes.push(format!("Members: {}", members.join(", ")));
            }
        }
        _ => {}
    }
    if let Some(bundle) = &row.member_of {
        notes.push(format!("Member of {}", bundle));
    }
    let annotation = if notes.is_empty() { None } else { Some(notes.join("; ")) };

    let name = if row.status == "shutdown" {
        format!("{} (Shutdown)", row.name)
    } else {
        row.name
    };

    Ok(InterfaceReport {
        name,
        description: row.description,
        addresses,
        annotation,
    })
}

/// Declared VLAN name, or a note that the SVI has no layer-2 VLAN
fn svi_annotation(store: &SqliteStore, app_id: i64, name: &InterfaceName) -> Result<Option<String>> {
    let Ok(number) = name.number.parse::<u16>() else {
        return Ok(None);
    };
    match store.svi_vlan(app_id, number)? {
        None => Ok(Some(NO_L2_VLAN.to_string())),
        Some(vlan) if vlan.exist => Ok(vlan.name),
        Some(_) => {
            let carriers = store.interfaces_carrying(app_id, number)?;
            if carriers.is_empty() {
                Ok(Some(NO_L2_VLAN.to_string()))
            } else {
                Ok(Some(format!(
                    "{}, Tagged/Access on Interfaces ({})",
                    NO_L2_VLAN,
                    carriers.join(", ")
                )))
            }
        }
    }
}

/// `Src: X, Dest: IP (site, interface)` with the destination looked up fleet-wide
fn tunnel_annotation(store: &SqliteStore, int_id: i64) -> Result<Option<String>> {
    let Some(tunnel) = store.get_tunnel(int_id)? else {
        return Ok(None);
    };

    let source = match (&tunnel.source_int, &tunnel.source_ip) {
        (Some(int), _) => int.clone(),
        (None, Some(ip)) => {
            let owner = store
                .address_owners(host_part(ip))?
                .into_iter()
                .next()
                .map(|o| o.interface)
                .unwrap_or_else(|| NO_PEER.to_string());
            format!("{} ({})", ip, owner)
        }
        (None, None) => NO_PEER.to_string(),
    };
    let Some(dest) = tunnel.dest_ip else {
        return Ok(Some(format!("Src: {}", source)));
    };
    let owner = match store.address_owners(&dest)?.into_iter().next() {
        Some(o) => format!("{}, {}", o.site, o.interface),
        None => NO_PEER.to_string(),
    };
    Ok(Some(format!("Src: {}, Dest: {} ({})", source, dest, owner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Ingestor;
    use crate::parser::ParseOptions;
    use crate::resolver::PendingResolver;

    const HUB: &str = "\
HUB1#show running-config
hostname HUB1
!
vlan 10
 name USERS
!
vrf definition CORP
 rd 65000:1
 description Corporate
 address-family ipv4
  route-target export 65000:1
  route-target import 65000:2
 exit-address-family
!
interface Loopback0
 ip address 10.255.0.1 255.255.255.255
!
interface Vlan10
 vrf forwarding CORP
 ip address 10.10.0.1 255.255.255.0
!
interface Vlan20
 vrf forwarding CORP
 ip address 10.20.0.1 255.255.255.0
 shutdown
!
interface Vlan30
 vrf forwarding CORP
 ip address 10.30.0.1 255.255.255.0
!
interface GigabitEthernet0/1
 switchport mode trunk
 switchport trunk allowed vlan 10,20
!
ip route vrf CORP 0.0.0.0 0.0.0.0 10.10.0.254
ip route vrf CORP 10.50.0.0 255.255.0.0 10.10.0.254
ip route vrf CORP 10.60.0.0 255.255.0.0 10.10.0.253
!
end
HUB1#show inventory
NAME: \"Chassis\", DESCR: \"Cisco ISR4451 Chassis\"
PID: ISR4451-X/K9      , VID: V05  , SN: FOC2222X0AB
";

    const SPOKE: &str = "\
SPOKE1#show running-config
vrf definition CORP
 address-family ipv4
  route-target export 65000:2
  route-target import 65000:1
 exit-address-family
!
interface Loopback0
 ip address 10.255.0.2 255.255.255.255
!
interface Tunnel0
 ip address 172.16.0.2 255.255.255.252
 tunnel source Loopback0
 tunnel destination 10.255.0.1
!
end
";

    fn report() -> Report {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut ingestor = Ingestor::new(&mut store, ParseOptions::default());
            ingestor.ingest_transcript("1 Hub.log", HUB).unwrap();
            ingestor.ingest_transcript("2 Spoke.log", SPOKE).unwrap();
        }
        PendingResolver::new(&store).run().unwrap();
        build_report(&store).unwrap()
    }

    #[test]
    fn test_vrf_relationships_and_summary() {
        let report = report();
        assert_eq!(report.appliances.len(), 2);
        let hub = &report.appliances[0];
        assert_eq!(hub.site, "Hub");
        assert_eq!(hub.inventory.len(), 1);

        let corp = hub.vrfs.iter().find(|v| v.name == "CORP").unwrap();
        assert_eq!(corp.exports, vec!["65000:1"]);
        assert_eq!(corp.exported_to[0].peer_label(), "Spoke / SPOKE1 / CORP");
        assert_eq!(corp.imported_from[0].peer.as_ref().unwrap().hostname, "SPOKE1");

        assert_eq!(corp.static_routes.len(), 2);
        assert_eq!(corp.static_routes[0].count, 2);
        assert_eq!(corp.static_routes[0].next_hop_ip.as_deref(), Some("10.10.0.254"));
        assert!(report.orphaned.is_empty());
    }

    #[test]
    fn test_svi_annotations() {
        let report = report();
        let corp = report.appliances[0].vrfs.iter().find(|v| v.name == "CORP").unwrap();
        let by_name = |prefix: &str| corp.interfaces.iter().find(|i| i.name.starts_with(prefix)).unwrap();

        assert_eq!(by_name("Vlan10").annotation.as_deref(), Some("USERS"));
        let vlan20 = by_name("Vlan20");
        assert_eq!(vlan20.name, "Vlan20 (Shutdown)");
        assert_eq!(
            vlan20.annotation.as_deref(),
            Some("No L2 VLAN ID is found, Tagged/Access on Interfaces (GigabitEthernet0/1)")
        );
        assert_eq!(by_name("Vlan30").annotation.as_deref(), Some(NO_L2_VLAN));
    }

    #[test]
    fn test_tunnel_annotation_finds_remote_owner() {
        let report = report();
        let spoke = &report.appliances[1];
        let default = spoke.vrfs.iter().find(|v| v.name == "Default").unwrap();
        let tunnel = default.interfaces.iter().find(|i| i.name == "Tunnel0").unwrap();
        assert_eq!(
            tunnel.annotation.as_deref(),
            Some("Src: Loopback0, Dest: 10.255.0.1 (Hub, Loopback0)")
        );
    }

    #[test]
    fn test_port_channel_members_annotated() {
        let text = "\
PE9#show running-config
interface GigabitEthernet0/1
 channel-group 1 mode active
!
interface GigabitEthernet0/2
 channel-group 1 mode active
!
interface Port-channel1
 vrf forwarding CORE
 ip address 10.9.0.1 255.255.255.252
!
vrf definition CORE
 address-family ipv4
 exit-address-family
!
end
";
        let mut store = SqliteStore::open_in_memory().unwrap();
        Ingestor::new(&mut store, ParseOptions::default())
            .ingest_transcript("Lab.log", text)
            .unwrap();
        PendingResolver::new(&store).run().unwrap();
        let report = build_report(&store).unwrap();

        let core = report.appliances[0].vrfs.iter().find(|v| v.name == "CORE").unwrap();
        let pc = core.interfaces.iter().find(|i| i.name == "Port-channel1").unwrap();
        assert_eq!(
            pc.annotation.as_deref(),
            Some("Members: GigabitEthernet0/1, GigabitEthernet0/2")
        );
        assert!(report.orphaned.is_empty());
    }
}
