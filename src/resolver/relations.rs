//! Route-target relationships between VRFs
//!
//! Read-only view over the fleet-wide export and import tables. Values are
//! compared verbatim within an address family.

use std::collections::HashMap;
use serde::Serialize;

use crate::entity::{AddressFamily, RtDirection};
use crate::storage::{RouteTargetRow, SqliteStore};
use crate::Result;

/// Label used when a route target has no counterpart
pub const NO_PEER: &str = "N/A";

/// A VRF somewhere in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VrfRef {
    pub vrf_id: i64,
    pub site: String,
    pub hostname: String,
    pub vrf: String,
}

impl VrfRef {
    fn from_row(row: &RouteTargetRow) -> Self {
        Self {
            vrf_id: row.vrf_id,
            site: row.site.clone(),
            hostname: row.hostname.clone(),
            vrf: row.vrf.clone(),
        }
    }
}

impl std::fmt::Display for VrfRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.site, self.hostname, self.vrf)
    }
}

/// One route target of a VRF and the VRF on the other side of it.
/// `peer` is `None` when nothing in the fleet matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub family: AddressFamily,
    pub route_target: String,
    pub peer: Option<VrfRef>,
}

impl Relationship {
    pub fn peer_label(&self) -> String {
        self.peer
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| NO_PEER.to_string())
    }
}

type RtKey = (AddressFamily, String);

/// Fleet-wide index of exported and imported route targets
#[derive(Debug, Default)]
pub struct RouteTargetIndex {
    exporters: HashMap<RtKey, Vec<RouteTargetRow>>,
    importers: HashMap<RtKey, Vec<RouteTargetRow>>,
    exports_by_vrf: HashMap<i64, Vec<RtKey>>,
    imports_by_vrf: HashMap<i64, Vec<RtKey>>,
}

impl RouteTargetIndex {
    pub fn build_from_store(store: &SqliteStore) -> Result<Self> {
        let mut index = Self::default();
        for row in store.route_targets(RtDirection::Export)? {
            index.add(RtDirection::Export, row);
        }
        for row in store.route_targets(RtDirection::Import)? {
            index.add(RtDirection::Import, row);
        }
        Ok(index)
    }

    fn add(&mut self, direction: RtDirection, row: RouteTargetRow) {
        let key = (row.family, row.value.clone());
        let (by_value, by_vrf) = match direction {
            RtDirection::Export => (&mut self.exporters, &mut self.exports_by_vrf),
            RtDirection::Import => (&mut self.importers, &mut self.imports_by_vrf),
        };
        by_vrf.entry(row.vrf_id).or_default().push(key.clone());
        by_value.entry(key).or_default().push(row);
    }

    /// For each route target the VRF imports, the other VRFs exporting it
    pub fn imports_from(&self, vrf_id: i64) -> Vec<Relationship> {
        Self::relate(vrf_id, &self.imports_by_vrf, &self.exporters)
    }

    /// For each route target the VRF exports, the other VRFs importing it
    pub fn exported_to(&self, vrf_id: i64) -> Vec<Relationship> {
        Self::relate(vrf_id, &self.exports_by_vrf, &self.importers)
    }

    fn relate(
        vrf_id: i64,
        own: &HashMap<i64, Vec<RtKey>>,
        counterpart: &HashMap<RtKey, Vec<RouteTargetRow>>,
    ) -> Vec<Relationship> {
        let mut out = Vec::new();
        for key in own.get(&vrf_id).into_iter().flatten() {
            let peers: Vec<_> = counterpart
                .get(key)
                .into_iter()
                .flatten()
                .filter(|row| row.vrf_id != vrf_id)
                .collect();
            if peers.is_empty() {
                out.push(Relationship {
                    family: key.0,
                    route_target: key.1.clone(),
                    peer: None,
                });
            }
            for row in peers {
                out.push(Relationship {
                    family: key.0,
                    route_target: key.1.clone(),
                    peer: Some(VrfRef::from_row(row)),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vrf(store: &SqliteStore, host: &str, name: &str) -> i64 {
        let site = store.insert_site("Lab", 0).unwrap();
        let app = store.insert_appliance(host, site).unwrap();
        store.insert_vrf(app, name, None, None, None).unwrap()
    }

    #[test]
    fn test_self_import_is_not_a_relationship() {
        let store = SqliteStore::open_in_memory().unwrap();
        let red = vrf(&store, "PE1", "RED");
        store.insert_route_target(red, AddressFamily::V4, RtDirection::Export, "1:1").unwrap();
        store.insert_route_target(red, AddressFamily::V4, RtDirection::Import, "1:1").unwrap();

        let index = RouteTargetIndex::build_from_store(&store).unwrap();
        let exported = index.exported_to(red);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].peer, None);
        assert_eq!(exported[0].peer_label(), NO_PEER);
    }

    #[test]
    fn test_family_scoped_match() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = vrf(&store, "PE1", "A");
        let b = vrf(&store, "PE2", "B");
        store.insert_route_target(a, AddressFamily::V6, RtDirection::Export, "9:9").unwrap();
        store.insert_route_target(b, AddressFamily::V4, RtDirection::Import, "9:9").unwrap();

        let index = RouteTargetIndex::build_from_store(&store).unwrap();
        assert_eq!(index.imports_from(b)[0].peer, None);
        assert!(index.imports_from(a).is_empty());
    }

    #[test]
    fn test_one_export_many_importers() {
        let store = SqliteStore::open_in_memory().unwrap();
        let hub = vrf(&store, "HUB", "SHARED");
        let s1 = vrf(&store, "SPOKE1", "BLUE");
        let s2 = vrf(&store, "SPOKE2", "BLUE");
        store.insert_route_target(hub, AddressFamily::V4, RtDirection::Export, "65000:100").unwrap();
        for spoke in [s1, s2] {
            store.insert_route_target(spoke, AddressFamily::V4, RtDirection::Import, "65000:100").unwrap();
        }

        let index = RouteTargetIndex::build_from_store(&store).unwrap();
        let exported = index.exported_to(hub);
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].peer_label(), "Lab / SPOKE1 / BLUE");
        assert_eq!(index.imports_from(s2)[0].peer.as_ref().unwrap().hostname, "HUB");
    }
}
