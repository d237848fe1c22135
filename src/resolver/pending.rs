//! Deferred reference resolution
//!
//! Runs once after every transcript is committed. Pending interfaces are
//! retried for a bounded number of passes, because resolving one (a
//! port-channel waiting on its VRF) can unblock another (its members).
//! A pass that resolves or narrows nothing ends the loop early. Whatever is
//! still pending afterwards stays in the store as orphaned.
//!
//! Static routes are resolved in a single pass after the interfaces. A route
//! always resolves; references that cannot be found are left null.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entity::{AddressType, InterfaceName, PendReason, PendReasons, ResolutionState};
use crate::net::IpPrefix;
use crate::storage::{InterfaceRecord, RouteRefs, SqliteStore, StaticRouteRecord, DEFAULT_VRF};
use crate::Result;

/// Default number of reconciliation passes over pending interfaces
pub const DEFAULT_PASSES: usize = 3;

/// Result of one resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Resolved,
    /// Some references were found; the remaining reasons were persisted
    Narrowed(PendReasons),
    Unchanged,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolverStats {
    pub passes: usize,
    pub interfaces_pending: usize,
    pub interfaces_resolved: usize,
    pub interfaces_narrowed: usize,
    /// Interfaces still pending after the last pass
    pub orphaned: usize,
    pub routes_resolved: usize,
    pub routes_without_vrf: usize,
    pub routes_without_interface: usize,
}

impl std::fmt::Display for ResolverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Resolution Statistics:")?;
        writeln!(f, "  Passes: {}", self.passes)?;
        writeln!(f, "  Pending interfaces: {}", self.interfaces_pending)?;
        writeln!(f, "  ✅ Resolved: {} ({:.1}%)",
            self.interfaces_resolved,
            if self.interfaces_pending > 0 {
                self.interfaces_resolved as f64 / self.interfaces_pending as f64 * 100.0
            } else {
                0.0
            })?;
        writeln!(f, "  ⚠️  Narrowed: {}", self.interfaces_narrowed)?;
        writeln!(f, "  ❌ Orphaned: {}", self.orphaned)?;
        writeln!(f, "  Static routes resolved: {}", self.routes_resolved)?;
        writeln!(f, "    Missing VRF: {}", self.routes_without_vrf)?;
        writeln!(f, "    Missing next-hop interface: {}", self.routes_without_interface)
    }
}

/// Turns pending interfaces and static routes into resolved ones
pub struct PendingResolver<'a> {
    store: &'a SqliteStore,
    passes: usize,
}

impl<'a> PendingResolver<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self {
            store,
            passes: DEFAULT_PASSES,
        }
    }

    /// Override the pass budget (at least one pass always runs)
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes.max(1);
        self
    }

    pub fn run(&self) -> Result<ResolverStats> {
        let mut stats = ResolverStats::default();
        stats.interfaces_pending = self.store.pending_interfaces()?.len();

        self.resolve_interfaces(&mut stats)?;

        let orphaned = self.store.pending_interfaces()?;
        for record in &orphaned {
            warn!(
                app_id = record.app_id,
                interface = %record.name,
                reasons = %record.state.reason_column().unwrap_or_default(),
                "Interface left pending after {} passes",
                stats.passes
            );
        }
        stats.orphaned = orphaned.len();

        self.resolve_static_routes(&mut stats)?;

        info!(
            resolved = stats.interfaces_resolved,
            orphaned = stats.orphaned,
            routes = stats.routes_resolved,
            "Resolution complete"
        );
        Ok(stats)
    }

    fn resolve_interfaces(&self, stats: &mut ResolverStats) -> Result<()> {
        for pass in 1..=self.passes {
            let worklist = self.store.pending_interfaces()?;
            if worklist.is_empty() {
                break;
            }
            stats.passes = pass;

            let mut progress = false;
            for record in &worklist {
                match self.try_interface(record)? {
                    Attempt::Resolved => {
                        stats.interfaces_resolved += 1;
                        progress = true;
                    }
                    Attempt::Narrowed(_) => {
                        stats.interfaces_narrowed += 1;
                        progress = true;
                    }
                    Attempt::Unchanged => {}
                }
            }
            debug!(pass, pending = worklist.len(), progress, "Interface pass");
            if !progress {
                break;
            }
        }
        Ok(())
    }

    /// Look up every reference the interface is waiting on
    pub fn try_interface(&self, record: &InterfaceRecord) -> Result<Attempt> {
        let ResolutionState::Pending(reasons) = &record.state else {
            return Ok(Attempt::Unchanged);
        };

        let mut remaining = PendReasons::new();
        let mut vrf_id = None;
        let mut member_of = None;
        let mut source_ref = None;

        for reason in reasons.iter() {
            let found = match reason {
                PendReason::VrfId => {
                    vrf_id = match record.vrf_name.as_deref() {
                        Some(name) => self.store.find_vrf(record.app_id, name)?,
                        None => Some(self.store.ensure_default_vrf(record.app_id)?),
                    };
                    vrf_id.is_some()
                }
                PendReason::PortChannel => {
                    member_of = match record.group_id.as_deref() {
                        Some(group) => self.store.find_port_channel(record.app_id, group)?,
                        None => None,
                    };
                    member_of.is_some()
                }
                PendReason::TunnelSource => {
                    source_ref = self.tunnel_source(record)?;
                    source_ref.is_some()
                }
                // Interfaces never wait on a next hop
                PendReason::NextHop => true,
            };
            if !found {
                remaining.insert(reason);
            }
        }

        if remaining.is_empty() {
            if let Some(source) = source_ref {
                self.store.set_tunnel_source(record.id, source)?;
            }
            self.store.promote_interface(record.id, vrf_id, member_of)?;
            debug!(interface = %record.name, "Resolved");
            return Ok(Attempt::Resolved);
        }
        if &remaining != reasons {
            self.store.narrow_interface_reasons(record.id, &remaining)?;
            return Ok(Attempt::Narrowed(remaining));
        }
        Ok(Attempt::Unchanged)
    }

    fn tunnel_source(&self, record: &InterfaceRecord) -> Result<Option<i64>> {
        let Some(tunnel) = self.store.get_tunnel(record.id)? else {
            return Ok(None);
        };
        let Some(name) = tunnel.source_int.as_deref() else {
            return Ok(None);
        };
        match name.parse::<InterfaceName>() {
            Ok(name) => self.store.find_resolved_interface(record.app_id, &name),
            Err(_) => Ok(None),
        }
    }

    fn resolve_static_routes(&self, stats: &mut ResolverStats) -> Result<()> {
        for route in self.store.pending_static_routes()? {
            let refs = self.route_refs(&route)?;
            if refs.vrf_id.is_none() {
                debug!(route = route.id, vrf = ?route.vrf_name, "Static route VRF not found");
                stats.routes_without_vrf += 1;
            }
            if route.next_hop_int.is_some() && refs.next_hop_int_ref.is_none() {
                stats.routes_without_interface += 1;
            }
            if self.store.resolve_static_route(route.id, &refs)? {
                stats.routes_resolved += 1;
            }
        }
        Ok(())
    }

    fn route_refs(&self, route: &StaticRouteRecord) -> Result<RouteRefs> {
        let vrf_id = match route.vrf_name.as_deref() {
            Some(name) if name != DEFAULT_VRF => self.store.find_vrf(route.app_id, name)?,
            _ => Some(self.store.ensure_default_vrf(route.app_id)?),
        };
        let leak_vrf_id = match route.leak_vrf_name.as_deref() {
            Some(name) => self.store.find_vrf(route.app_id, name)?,
            None => None,
        };
        let next_hop_ip_ref = match route.next_hop_ip.as_deref().map(str::parse::<std::net::IpAddr>) {
            Some(Ok(ip)) => Some(self.store.insert_address(None, &IpPrefix::host(ip), AddressType::NextHop)?),
            _ => None,
        };
        let next_hop_int_ref = match route.next_hop_int.as_deref().map(str::parse::<InterfaceName>) {
            Some(Ok(name)) => self.store.find_resolved_interface(route.app_id, &name)?,
            _ => None,
        };
        Ok(RouteRefs {
            vrf_id,
            leak_vrf_id,
            next_hop_ip_ref,
            next_hop_int_ref,
        })
    }
}
