//! Storage Layer - SQLite-backed persistence
//!
//! One table per entity kind. Interfaces and static routes carry a
//! `state` column (`resolved` | `pending`) and the `pend_reason` list
//! instead of living in separate pending tables.
//!
//! - site, appliance, log_file
//! - vrf, export_rt, import_rt, vrf_route_map
//! - interface, vlan, int_vlan, tunnel_int
//! - subnet, ip_address
//! - static_route, cdp_neighbor, inventory

pub mod schema;
pub mod sqlite;
pub mod queries;
mod dump;

pub use sqlite::{
    DbStats, InterfaceRecord, LogFileRecord, RouteRefs, SqliteStore, StaticRouteRecord, TunnelRecord,
    DEFAULT_VRF,
};
pub use queries::{
    AddressOwner, AddressRow, ApplianceRow, InventoryRow, NeighborRow, OrphanRow, RouteSummaryRow,
    RouteTargetRow, SviVlan, VrfInterfaceRow, VrfRow,
};
