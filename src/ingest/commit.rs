//! Committing parsed blocks to the store
//!
//! Blocks are committed in transcript order. Every reference is looked up at
//! commit time; a reference that is not in the store yet (a VRF declared
//! further down, a port-channel never declared, a tunnel source defined
//! later) leaves the entity pending with the matching reason. Static routes
//! are always committed pending and resolved after all transcripts.

use serde::Serialize;
use tracing::debug;

use crate::entity::{
    AddressType, InterfaceMode, InterfaceStatus, PendReason, PendReasons, ResolutionState, VlanTagMode,
};
use crate::net::IpPrefix;
use crate::parser::interface::{InterfaceBlock, TunnelSource};
use crate::parser::{DeclaredVlan, ParsedBlock, StaticRouteEntry, VrfBlock};
use crate::storage::{InterfaceRecord, SqliteStore, StaticRouteRecord, TunnelRecord, DEFAULT_VRF};
use crate::Result;

/// An allowed list this long means "all VLANs" and is not expanded into bindings
const ALL_VLANS: usize = 4094;

/// Counts of what one or more transcripts committed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub vrfs: usize,
    pub route_targets: usize,
    pub interfaces: usize,
    pub pending_interfaces: usize,
    pub duplicate_interfaces: usize,
    pub vlans: usize,
    pub addresses: usize,
    pub static_routes: usize,
    pub neighbors: usize,
    pub inventory: usize,
}

impl CommitStats {
    pub fn merge(&mut self, other: &CommitStats) {
        self.vrfs += other.vrfs;
        self.route_targets += other.route_targets;
        self.interfaces += other.interfaces;
        self.pending_interfaces += other.pending_interfaces;
        self.duplicate_interfaces += other.duplicate_interfaces;
        self.vlans += other.vlans;
        self.addresses += other.addresses;
        self.static_routes += other.static_routes;
        self.neighbors += other.neighbors;
        self.inventory += other.inventory;
    }
}

impl std::fmt::Display for CommitStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  VRFs: {} ({} route targets)", self.vrfs, self.route_targets)?;
        writeln!(
            f,
            "  Interfaces: {} ({} pending, {} duplicate)",
            self.interfaces, self.pending_interfaces, self.duplicate_interfaces
        )?;
        writeln!(f, "  VLAN declarations: {}", self.vlans)?;
        writeln!(f, "  Addresses: {}", self.addresses)?;
        writeln!(f, "  Static routes: {}", self.static_routes)?;
        writeln!(f, "  CDP neighbors: {}", self.neighbors)?;
        writeln!(f, "  Inventory items: {}", self.inventory)
    }
}

/// Writes the blocks of one transcript for one appliance
pub struct Committer<'a> {
    store: &'a SqliteStore,
    app_id: i64,
    source: &'a str,
    stats: CommitStats,
}

impl<'a> Committer<'a> {
    pub fn new(store: &'a SqliteStore, app_id: i64, source: &'a str) -> Self {
        Self {
            store,
            app_id,
            source,
            stats: CommitStats::default(),
        }
    }

    pub fn commit_block(&mut self, block: &ParsedBlock) -> Result<()> {
        match block {
            ParsedBlock::Vrf(vrf) => self.commit_vrf(vrf),
            ParsedBlock::Interface(interface) => self.commit_interface(interface),
            ParsedBlock::Vlans(vlans) => self.commit_vlans(vlans),
            ParsedBlock::StaticRoutes(routes) => self.commit_static_routes(routes),
            ParsedBlock::Neighbors(neighbors) => {
                for neighbor in neighbors {
                    self.store.insert_neighbor(self.app_id, neighbor)?;
                }
                self.stats.neighbors += neighbors.len();
                Ok(())
            }
            ParsedBlock::Inventory(items) => {
                for item in items {
                    self.store.insert_inventory(self.app_id, item)?;
                }
                self.stats.inventory += items.len();
                Ok(())
            }
        }
    }

    pub fn finish(self) -> CommitStats {
        self.stats
    }

    fn commit_vrf(&mut self, vrf: &VrfBlock) -> Result<()> {
        let vrf_id = self.store.insert_vrf(
            self.app_id,
            &vrf.name,
            vrf.rd.as_deref(),
            vrf.description.as_deref(),
            Some(vrf.dialect),
        )?;
        for rt in &vrf.route_targets {
            self.store.insert_route_target(vrf_id, rt.family, rt.direction, &rt.value)?;
        }
        for map in &vrf.route_maps {
            self.store.insert_route_map(vrf_id, map.family, map.direction, &map.name)?;
        }
        self.stats.vrfs += 1;
        self.stats.route_targets += vrf.route_targets.len();
        Ok(())
    }

    fn commit_vlans(&mut self, vlans: &[DeclaredVlan]) -> Result<()> {
        for vlan in vlans {
            self.store.declare_vlan(self.app_id, vlan.number, vlan.name.as_deref())?;
        }
        self.stats.vlans += vlans.len();
        Ok(())
    }

    fn commit_interface(&mut self, block: &InterfaceBlock) -> Result<()> {
        if self.store.find_interface(self.app_id, &block.name)?.is_some() {
            debug!(source = self.source, interface = %block.name, "Duplicate interface block skipped");
            self.stats.duplicate_interfaces += 1;
            return Ok(());
        }

        let mut record = InterfaceRecord::new(self.app_id, block.name.clone());
        record.mode = block.mode();
        record.description = block.description.clone();
        record.status = if block.shutdown { InterfaceStatus::Shutdown } else { InterfaceStatus::Up };
        let mut reasons = PendReasons::new();

        if let Some(group) = &block.channel_group {
            record.group_id = Some(group.clone());
            match self.store.find_port_channel(self.app_id, group)? {
                Some(id) => record.member_of = Some(id),
                None => reasons.insert(PendReason::PortChannel),
            }
        }

        if block.is_layer3() {
            match block.vrf.as_deref() {
                Some(name) => {
                    record.vrf_name = Some(name.to_string());
                    match self.store.find_vrf(self.app_id, name)? {
                        Some(id) => record.vrf_id = Some(id),
                        None => reasons.insert(PendReason::VrfId),
                    }
                }
                None => {
                    record.vrf_name = Some(DEFAULT_VRF.to_string());
                    record.vrf_id = Some(self.store.ensure_default_vrf(self.app_id)?);
                }
            }
        }

        record.state = ResolutionState::from_reasons(reasons);
        let int_id = self.store.insert_interface(&record)?;
        self.stats.interfaces += 1;

        self.bind_vlans(int_id, block)?;

        for address in &block.addresses {
            self.store.insert_address(Some(int_id), &address.prefix, address.kind)?;
        }
        self.stats.addresses += block.addresses.len();

        if let Some(tunnel) = &block.tunnel {
            let mut row = TunnelRecord {
                id: 0,
                int_id,
                source_int: None,
                source_ip: None,
                dest_ip: tunnel.destination.map(|ip| ip.to_string()),
                source_ref: None,
                dest_ref: None,
            };
            if let Some(dest) = tunnel.destination {
                row.dest_ref = Some(self.store.insert_address(
                    None,
                    &IpPrefix::host(dest),
                    AddressType::TunnelDestination,
                )?);
            }
            match &tunnel.source {
                Some(TunnelSource::Address(ip)) => row.source_ip = Some(ip.to_string()),
                Some(TunnelSource::Interface(name)) => {
                    row.source_int = Some(name.to_string());
                    row.source_ref = self.store.find_resolved_interface(self.app_id, name)?;
                }
                None => {}
            }
            let missing_source = row.source_int.is_some() && row.source_ref.is_none();
            self.store.insert_tunnel(&row)?;
            if missing_source {
                self.store.demote_interface(int_id, PendReason::TunnelSource, None)?;
                record.state = ResolutionState::pending(PendReason::TunnelSource);
            }
        }

        if !record.state.is_resolved() {
            debug!(
                source = self.source,
                interface = %block.name,
                "Interface pending"
            );
            self.stats.pending_interfaces += 1;
        }
        Ok(())
    }

    /// Switchport and sub-interface VLAN bindings
    fn bind_vlans(&mut self, int_id: i64, block: &InterfaceBlock) -> Result<()> {
        if let Some(tag) = block.implied_vlan() {
            let vlan_id = self.vlan(tag)?;
            self.store.bind_vlan(int_id, vlan_id, VlanTagMode::Tagged)?;
        }

        let sp = &block.switchport;
        match block.mode() {
            Some(InterfaceMode::Access) => {
                if sp.access_vlan.is_some() || sp.voice_vlan.is_none() {
                    let vlan_id = self.vlan(sp.access_vlan.unwrap_or(1))?;
                    self.store.bind_vlan(int_id, vlan_id, VlanTagMode::UntaggedAccess)?;
                }
                if let Some(voice) = sp.voice_vlan {
                    let vlan_id = self.vlan(voice)?;
                    self.store.bind_vlan(int_id, vlan_id, VlanTagMode::UntaggedVoice)?;
                }
            }
            Some(InterfaceMode::Trunk) => {
                let native = sp.native_vlan.unwrap_or(1);
                let vlan_id = self.vlan(native)?;
                self.store.bind_vlan(int_id, vlan_id, VlanTagMode::Untagged)?;
                if sp.allowed.len() < ALL_VLANS {
                    for &tag in sp.allowed.iter().filter(|&&v| v != native) {
                        let vlan_id = self.vlan(tag)?;
                        self.store.bind_vlan(int_id, vlan_id, VlanTagMode::Tagged)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// VLAN 1 is always declared; anything else is created as a reference
    fn vlan(&self, number: u16) -> Result<i64> {
        if number == 1 {
            self.store.ensure_default_vlan(self.app_id)
        } else {
            self.store.reference_vlan(self.app_id, number)
        }
    }

    fn commit_static_routes(&mut self, routes: &[StaticRouteEntry]) -> Result<()> {
        for route in routes {
            let subnet_id = self.store.insert_subnet(&route.destination)?;
            self.store.insert_static_route(&StaticRouteRecord {
                id: 0,
                app_id: self.app_id,
                family: route.destination.family(),
                subnet_id,
                distance: route.distance,
                name: route.name.clone(),
                vrf_name: route.vrf.clone(),
                vrf_id: None,
                leak_vrf_name: route.leak_vrf.clone(),
                leak_vrf_id: None,
                next_hop_ip: route.next_hop_ip.map(|ip| ip.to_string()),
                next_hop_ip_ref: None,
                next_hop_int: route.next_hop_int.as_ref().map(|name| name.to_string()),
                next_hop_int_ref: None,
                form: route.form,
                state: ResolutionState::pending(PendReason::NextHop),
            })?;
        }
        self.stats.static_routes += routes.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_transcript, ParseOptions};

    fn commit(store: &SqliteStore, text: &str) -> (i64, CommitStats) {
        let parsed = parse_transcript(text, "test.log", &ParseOptions::default());
        let site = store.insert_site("Lab", 0).unwrap();
        let app = store
            .insert_appliance(parsed.hostname.as_deref().unwrap(), site)
            .unwrap();
        let mut committer = Committer::new(store, app, "test.log");
        for block in &parsed.blocks {
            committer.commit_block(block).unwrap();
        }
        (app, committer.finish())
    }

    #[test]
    fn test_forward_vrf_reference_is_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, stats) = commit(
            &store,
            "PE1#show running-config\n\
             interface GigabitEthernet0/1\n ip vrf forwarding LATE\n ip address 10.1.1.1 255.255.255.0\n!\n\
             ip vrf LATE\n rd 1:1\n!\nend\n",
        );
        assert_eq!(stats.pending_interfaces, 1);
        let record = store
            .find_interface(app, &"GigabitEthernet0/1".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.state, ResolutionState::pending(PendReason::VrfId));
        assert_eq!(record.vrf_name.as_deref(), Some("LATE"));
        assert_eq!(store.count_addresses(record.id).unwrap(), 1);
    }

    #[test]
    fn test_layer3_without_vrf_lands_in_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, _) = commit(
            &store,
            "R1#show run\ninterface Loopback0\n ip address 10.0.0.1 255.255.255.255\n!\n\
             interface Loopback1\n ip address 10.0.0.2 255.255.255.255\n!\nend\n",
        );
        let default = store.find_vrf(app, DEFAULT_VRF).unwrap().unwrap();
        let rows = store.interfaces_in_vrf(default).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.vrfs_for(app).unwrap().len(), 1);
    }

    #[test]
    fn test_trunk_and_access_bindings() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, _) = commit(
            &store,
            "SW1#show run\nvlan 10\n name DATA\n!\n\
             interface GigabitEthernet1/0/1\n switchport mode trunk\n switchport trunk native vlan 99\n switchport trunk allowed vlan 10,20,99\n!\n\
             interface GigabitEthernet1/0/2\n switchport access vlan 10\n switchport voice vlan 30\n!\nend\n",
        );
        assert_eq!(store.interfaces_carrying(app, 10).unwrap().len(), 2);
        assert_eq!(store.interfaces_carrying(app, 99).unwrap(), vec!["GigabitEthernet1/0/1"]);
        assert_eq!(store.interfaces_carrying(app, 30).unwrap(), vec!["GigabitEthernet1/0/2"]);

        let declared = store.svi_vlan(app, 10).unwrap().unwrap();
        assert!(declared.exist);
        assert_eq!(declared.name.as_deref(), Some("DATA"));
        assert!(!store.svi_vlan(app, 20).unwrap().unwrap().exist);
        assert_eq!(store.svi_vlan(app, 1).unwrap(), None);
    }

    #[test]
    fn test_default_trunk_native_declares_vlan_one() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, _) = commit(&store, "SW2#show run\ninterface GigabitEthernet0/1\n switchport mode trunk\n!\nend\n");
        let vlan = store.svi_vlan(app, 1).unwrap().unwrap();
        assert!(vlan.exist);
        assert_eq!(vlan.name.as_deref(), Some("default"));
    }

    #[test]
    fn test_port_channel_member_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, stats) = commit(
            &store,
            "SW3#show run\ninterface Port-channel1\n switchport mode trunk\n!\n\
             interface GigabitEthernet0/1\n switchport mode trunk\n channel-group 1 mode active\n!\n\
             interface GigabitEthernet0/2\n switchport mode trunk\n channel-group 2 mode active\n!\nend\n",
        );
        assert_eq!(stats.pending_interfaces, 1);
        let pc = store.find_port_channel(app, "1").unwrap().unwrap();
        let member = store
            .find_interface(app, &"GigabitEthernet0/1".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(member.member_of, Some(pc));
        let orphan = store
            .find_interface(app, &"GigabitEthernet0/2".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(orphan.state, ResolutionState::pending(PendReason::PortChannel));
    }

    #[test]
    fn test_tunnel_source_defined_later_demotes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (app, stats) = commit(
            &store,
            "PE2#show run\ninterface Tunnel0\n ip address 172.16.0.1 255.255.255.252\n tunnel source Loopback0\n tunnel destination 192.0.2.9\n!\n\
             interface Loopback0\n ip address 10.0.0.9 255.255.255.255\n!\nend\n",
        );
        assert_eq!(stats.pending_interfaces, 1);
        let tunnel = store.find_interface(app, &"Tunnel0".parse().unwrap()).unwrap().unwrap();
        assert_eq!(tunnel.state, ResolutionState::pending(PendReason::TunnelSource));
        assert!(tunnel.vrf_id.is_some());

        let row = store.get_tunnel(tunnel.id).unwrap().unwrap();
        assert_eq!(row.source_int.as_deref(), Some("Loopback0"));
        assert_eq!(row.dest_ip.as_deref(), Some("192.0.2.9"));
        assert!(row.dest_ref.is_some());
    }

    #[test]
    fn test_duplicate_interface_skipped_and_routes_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, stats) = commit(
            &store,
            "R2#show run\ninterface Loopback0\n ip address 10.0.0.1 255.255.255.255\n!\n\
             interface Loopback0\n description again\n!\n\
             ip route 0.0.0.0 0.0.0.0 10.0.0.254\nend\n",
        );
        assert_eq!(stats.duplicate_interfaces, 1);
        assert_eq!(stats.static_routes, 1);
        assert_eq!(store.pending_static_routes().unwrap().len(), 1);
    }
}
