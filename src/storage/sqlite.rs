//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::entity::{
    AddressFamily, AddressType, InterfaceMode, InterfaceName, InterfaceStatus, PendReason,
    PendReasons, ResolutionState, RouteForm, RtDirection, VlanTagMode, VrfDialect,
};
use crate::net::IpPrefix;
use crate::parser::{CdpNeighbor, InventoryItem};
use super::schema;

/// Name of the VRF that holds interfaces and routes with no explicit VRF
pub const DEFAULT_VRF: &str = "Default";

/// SQLite-backed entity store
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Site & Appliance Operations ==========

    /// Insert a site, or get the existing one with the same name
    pub fn insert_site(&self, name: &str, importance: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO site (name, importance) VALUES (?1, ?2)",
            params![name, importance],
        )?;
        let id = self.conn.query_row("SELECT site_id FROM site WHERE name = ?1", [name], |row| row.get(0))?;
        Ok(id)
    }

    /// Insert an appliance, or get the existing one for this site and hostname
    pub fn insert_appliance(&self, hostname: &str, site_id: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO appliance (hostname, site_id) VALUES (?1, ?2)",
            params![hostname, site_id],
        )?;
        let id = self.conn.query_row(
            "SELECT app_id FROM appliance WHERE site_id = ?1 AND hostname = ?2",
            params![site_id, hostname],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_log_file(&self, record: &LogFileRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO log_file (filename, hash, line_count, site_id, app_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.filename,
                record.hash,
                record.line_count as i64,
                record.site_id,
                record.app_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ========== VRF Operations ==========

    /// Insert a VRF or get the existing one for (appliance, name).
    ///
    /// A repeated declaration only fills in attributes still missing.
    pub fn insert_vrf(
        &self,
        app_id: i64,
        name: &str,
        rd: Option<&str>,
        description: Option<&str>,
        dialect: Option<VrfDialect>,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO vrf (app_id, name, rd, description, dialect)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(app_id, name) DO UPDATE SET
                rd = COALESCE(vrf.rd, excluded.rd),
                description = COALESCE(vrf.description, excluded.description),
                dialect = COALESCE(vrf.dialect, excluded.dialect)
            "#,
            params![app_id, name, rd, description, dialect.map(|d| d.as_str())],
        )?;
        self.find_vrf(app_id, name)?
            .ok_or_else(|| Error::NotFound(format!("vrf {} after insert", name)))
    }

    /// Get the appliance's `Default` VRF, creating it on first use
    pub fn ensure_default_vrf(&self, app_id: i64) -> Result<i64> {
        self.insert_vrf(app_id, DEFAULT_VRF, None, None, None)
    }

    /// Find a VRF by name on one appliance
    pub fn find_vrf(&self, app_id: i64, name: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT vrf_id FROM vrf WHERE app_id = ?1 AND name = ?2",
                params![app_id, name],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_route_target(
        &self,
        vrf_id: i64,
        family: AddressFamily,
        direction: RtDirection,
        value: &str,
    ) -> Result<()> {
        let sql = match direction {
            RtDirection::Export => "INSERT OR IGNORE INTO export_rt (vrf_id, add_fam, rt) VALUES (?1, ?2, ?3)",
            RtDirection::Import => "INSERT OR IGNORE INTO import_rt (vrf_id, add_fam, rt) VALUES (?1, ?2, ?3)",
        };
        self.conn.execute(sql, params![vrf_id, family.as_str(), value])?;
        Ok(())
    }

    pub fn insert_route_map(
        &self,
        vrf_id: i64,
        family: AddressFamily,
        direction: RtDirection,
        map_name: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO vrf_route_map (vrf_id, add_fam, direction, map_name)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![vrf_id, family.as_str(), direction.as_str(), map_name],
        )?;
        Ok(())
    }

    // ========== VLAN Operations ==========

    /// Record a declared VLAN. A VLAN seen only as a reference is promoted
    /// to `exist = 1`.
    pub fn declare_vlan(&self, app_id: i64, vlan_no: u16, name: Option<&str>) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO vlan (app_id, vlan_no, name, exist) VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(app_id, vlan_no) DO UPDATE SET
                exist = 1,
                name = COALESCE(excluded.name, vlan.name)
            "#,
            params![app_id, vlan_no, name],
        )?;
        self.vlan_id(app_id, vlan_no)
    }

    /// VLAN 1 always exists on a switch; declare it unless already known
    pub fn ensure_default_vlan(&self, app_id: i64) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO vlan (app_id, vlan_no, name, exist) VALUES (?1, 1, 'default', 1)
            ON CONFLICT(app_id, vlan_no) DO UPDATE SET
                exist = 1,
                name = COALESCE(vlan.name, excluded.name)
            "#,
            [app_id],
        )?;
        self.vlan_id(app_id, 1)
    }

    /// Get a VLAN by number, creating it with `exist = 0` when only referenced
    pub fn reference_vlan(&self, app_id: i64, vlan_no: u16) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO vlan (app_id, vlan_no, exist) VALUES (?1, ?2, 0)",
            params![app_id, vlan_no],
        )?;
        self.vlan_id(app_id, vlan_no)
    }

    fn vlan_id(&self, app_id: i64, vlan_no: u16) -> Result<i64> {
        let id = self.conn.query_row(
            "SELECT vlan_id FROM vlan WHERE app_id = ?1 AND vlan_no = ?2",
            params![app_id, vlan_no],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn bind_vlan(&self, int_id: i64, vlan_id: i64, mode: VlanTagMode) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO int_vlan (int_id, vlan_id, vlan_mode) VALUES (?1, ?2, ?3)",
            params![int_id, vlan_id, mode.as_str()],
        )?;
        Ok(())
    }

    // ========== Addressing Operations ==========

    /// Insert a subnet or get the existing one with the same network
    pub fn insert_subnet(&self, prefix: &IpPrefix) -> Result<i64> {
        let network = prefix.network().to_string();
        self.conn.execute(
            "INSERT OR IGNORE INTO subnet (network, add_fam) VALUES (?1, ?2)",
            params![network, prefix.family().as_str()],
        )?;
        let id = self.conn.query_row("SELECT subnet_id FROM subnet WHERE network = ?1", [&network], |row| row.get(0))?;
        Ok(id)
    }

    /// Insert an address owned by `int_id`, or unowned when `None`.
    ///
    /// The same address, role and owner is stored once.
    pub fn insert_address(&self, int_id: Option<i64>, prefix: &IpPrefix, kind: AddressType) -> Result<i64> {
        let address = prefix.with_prefixlen();
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT ip_id FROM ip_address WHERE address = ?1 AND address_type = ?2 AND int_id IS ?3",
                params![address, kind.as_str(), int_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let subnet_id = self.insert_subnet(prefix)?;
        self.conn.execute(
            r#"
            INSERT INTO ip_address (add_fam, address, subnet_id, address_type, int_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![prefix.family().as_str(), address, subnet_id, kind.as_str(), int_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_addresses(&self, int_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ip_address WHERE int_id = ?1",
            [int_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Interface Operations ==========

    /// Insert an interface row. The id field of the record is ignored.
    pub fn insert_interface(&self, record: &InterfaceRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO interface (app_id, type, number, subif, mode, description, status,
                                   vrf_id, vrf_name, member_of, group_id, state, pend_reason)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.app_id,
                record.name.kind,
                record.name.number,
                record.name.subif,
                record.mode.map(|m| m.as_str()),
                record.description,
                record.status.as_str(),
                record.vrf_id,
                record.vrf_name,
                record.member_of,
                record.group_id,
                record.state.as_str(),
                record.state.reason_column(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_interface(&self, int_id: i64) -> Result<Option<InterfaceRecord>> {
        let sql = format!("SELECT {} FROM interface WHERE int_id = ?1", INTERFACE_COLUMNS);
        self.conn
            .query_row(&sql, [int_id], |row| self.row_to_interface(row))
            .optional()
            .map_err(Into::into)
    }

    /// Find an interface by natural key, whatever its state
    pub fn find_interface(&self, app_id: i64, name: &InterfaceName) -> Result<Option<InterfaceRecord>> {
        let sql = format!(
            "SELECT {} FROM interface WHERE app_id = ?1 AND type = ?2 AND number = ?3 AND subif = ?4",
            INTERFACE_COLUMNS
        );
        self.conn
            .query_row(&sql, params![app_id, name.kind, name.number, name.subif], |row| {
                self.row_to_interface(row)
            })
            .optional()
            .map_err(Into::into)
    }

    /// Find a resolved interface by name on one appliance
    pub fn find_resolved_interface(&self, app_id: i64, name: &InterfaceName) -> Result<Option<i64>> {
        Ok(self
            .find_interface(app_id, name)?
            .filter(|i| i.state.is_resolved())
            .map(|i| i.id))
    }

    /// Find the resolved port-channel (or bundle) with the given group number
    pub fn find_port_channel(&self, app_id: i64, group: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                r#"
                SELECT int_id FROM interface
                WHERE app_id = ?1 AND type IN ('Port-channel', 'Bundle-Ether')
                  AND number = ?2 AND subif = '' AND state = 'resolved'
                "#,
                params![app_id, group],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Move a resolved interface into the pending space, or add a reason to
    /// an already pending one. `vrf_name` records the raw VRF reference.
    pub fn demote_interface(&self, int_id: i64, reason: PendReason, vrf_name: Option<&str>) -> Result<()> {
        let record = self
            .get_interface(int_id)?
            .ok_or_else(|| Error::NotFound(format!("interface {}", int_id)))?;
        let mut reasons = match record.state {
            ResolutionState::Resolved => PendReasons::new(),
            ResolutionState::Pending(reasons) => reasons,
        };
        reasons.insert(reason);
        let state = ResolutionState::Pending(reasons);
        // The reference named by the reason is dropped; the others stay
        self.conn.execute(
            r#"
            UPDATE interface
            SET state = ?2, pend_reason = ?3,
                vrf_name = COALESCE(?4, vrf_name),
                vrf_id = CASE WHEN ?5 THEN NULL ELSE vrf_id END,
                member_of = CASE WHEN ?6 THEN NULL ELSE member_of END
            WHERE int_id = ?1
            "#,
            params![
                int_id,
                state.as_str(),
                state.reason_column(),
                vrf_name,
                reason == PendReason::VrfId,
                reason == PendReason::PortChannel,
            ],
        )?;
        Ok(())
    }

    /// Replace the reasons of a pending interface with a narrower set
    pub fn narrow_interface_reasons(&self, int_id: i64, reasons: &PendReasons) -> Result<()> {
        if reasons.is_empty() {
            return Err(Error::InvalidValue(format!(
                "interface {}: narrowing to no reasons, promote instead",
                int_id
            )));
        }
        self.conn.execute(
            "UPDATE interface SET pend_reason = ?2 WHERE int_id = ?1 AND state = 'pending'",
            params![int_id, reasons.to_string()],
        )?;
        Ok(())
    }

    /// Resolve a pending interface with its now-known references.
    ///
    /// Returns false if the interface was not pending.
    pub fn promote_interface(&self, int_id: i64, vrf_id: Option<i64>, member_of: Option<i64>) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE interface
            SET state = 'resolved', pend_reason = NULL,
                vrf_id = COALESCE(?2, vrf_id), member_of = COALESCE(?3, member_of)
            WHERE int_id = ?1 AND state = 'pending'
            "#,
            params![int_id, vrf_id, member_of],
        )?;
        Ok(changed > 0)
    }

    /// All pending interfaces, oldest first
    pub fn pending_interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        let sql = format!(
            "SELECT {} FROM interface WHERE state = 'pending' ORDER BY int_id",
            INTERFACE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let interfaces = stmt
            .query_map([], |row| self.row_to_interface(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(interfaces)
    }

    /// Helper to convert a row to an InterfaceRecord
    fn row_to_interface(&self, row: &rusqlite::Row) -> rusqlite::Result<InterfaceRecord> {
        let mode: Option<String> = row.get(5)?;
        let status: String = row.get(7)?;
        let state: String = row.get(12)?;
        let reason: Option<String> = row.get(13)?;

        let mode = mode
            .map(|m| m.parse::<InterfaceMode>())
            .transpose()
            .map_err(|e| conversion_error(5, e))?;
        let status: InterfaceStatus = status.parse().map_err(|e| conversion_error(7, e))?;
        let state = ResolutionState::from_columns(&state, reason.as_deref())
            .map_err(|e| conversion_error(12, e))?;

        Ok(InterfaceRecord {
            id: row.get(0)?,
            app_id: row.get(1)?,
            name: InterfaceName {
                kind: row.get(2)?,
                number: row.get(3)?,
                subif: row.get(4)?,
            },
            mode,
            description: row.get(6)?,
            status,
            vrf_id: row.get(8)?,
            vrf_name: row.get(9)?,
            member_of: row.get(10)?,
            group_id: row.get(11)?,
            state,
        })
    }

    // ========== Tunnel Operations ==========

    pub fn insert_tunnel(&self, record: &TunnelRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO tunnel_int (int_id, source_int, source_ip, dest_ip, source_ref, dest_ref)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.int_id,
                record.source_int,
                record.source_ip,
                record.dest_ip,
                record.source_ref,
                record.dest_ref,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_tunnel(&self, int_id: i64) -> Result<Option<TunnelRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT tun_id, int_id, source_int, source_ip, dest_ip, source_ref, dest_ref
                FROM tunnel_int WHERE int_id = ?1
                "#,
                [int_id],
                |row| {
                    Ok(TunnelRecord {
                        id: row.get(0)?,
                        int_id: row.get(1)?,
                        source_int: row.get(2)?,
                        source_ip: row.get(3)?,
                        dest_ip: row.get(4)?,
                        source_ref: row.get(5)?,
                        dest_ref: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_tunnel_source(&self, int_id: i64, source_ref: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE tunnel_int SET source_ref = ?2 WHERE int_id = ?1",
            params![int_id, source_ref],
        )?;
        Ok(())
    }

    // ========== Static Route Operations ==========

    /// Insert a static route row. The id field of the record is ignored.
    pub fn insert_static_route(&self, record: &StaticRouteRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO static_route (app_id, add_fam, subnet_id, ad_distance, name, vrf_name, vrf_id,
                                      leak_vrf_name, leak_vrf_id, next_hop_ip, next_hop_ip_ref,
                                      next_hop_int, next_hop_int_ref, form, state, pend_reason)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                record.app_id,
                record.family.as_str(),
                record.subnet_id,
                record.distance,
                record.name,
                record.vrf_name,
                record.vrf_id,
                record.leak_vrf_name,
                record.leak_vrf_id,
                record.next_hop_ip,
                record.next_hop_ip_ref,
                record.next_hop_int,
                record.next_hop_int_ref,
                record.form.as_str(),
                record.state.as_str(),
                record.state.reason_column(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All pending static routes, oldest first
    pub fn pending_static_routes(&self) -> Result<Vec<StaticRouteRecord>> {
        let sql = format!(
            "SELECT {} FROM static_route WHERE state = 'pending' ORDER BY route_id",
            STATIC_ROUTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let routes = stmt
            .query_map([], |row| self.row_to_static_route(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(routes)
    }

    pub fn get_static_route(&self, route_id: i64) -> Result<Option<StaticRouteRecord>> {
        let sql = format!("SELECT {} FROM static_route WHERE route_id = ?1", STATIC_ROUTE_COLUMNS);
        self.conn
            .query_row(&sql, [route_id], |row| self.row_to_static_route(row))
            .optional()
            .map_err(Into::into)
    }

    /// Migrate a pending static route with whatever references were found
    pub fn resolve_static_route(&self, route_id: i64, refs: &RouteRefs) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE static_route
            SET state = 'resolved', pend_reason = NULL,
                vrf_id = ?2, leak_vrf_id = ?3, next_hop_ip_ref = ?4, next_hop_int_ref = ?5
            WHERE route_id = ?1 AND state = 'pending'
            "#,
            params![route_id, refs.vrf_id, refs.leak_vrf_id, refs.next_hop_ip_ref, refs.next_hop_int_ref],
        )?;
        Ok(changed > 0)
    }

    /// Helper to convert a row to a StaticRouteRecord
    fn row_to_static_route(&self, row: &rusqlite::Row) -> rusqlite::Result<StaticRouteRecord> {
        let family: String = row.get(2)?;
        let form: String = row.get(14)?;
        let state: String = row.get(15)?;
        let reason: Option<String> = row.get(16)?;

        Ok(StaticRouteRecord {
            id: row.get(0)?,
            app_id: row.get(1)?,
            family: family.parse().map_err(|e| conversion_error(2, e))?,
            subnet_id: row.get(3)?,
            distance: row.get(4)?,
            name: row.get(5)?,
            vrf_name: row.get(6)?,
            vrf_id: row.get(7)?,
            leak_vrf_name: row.get(8)?,
            leak_vrf_id: row.get(9)?,
            next_hop_ip: row.get(10)?,
            next_hop_ip_ref: row.get(11)?,
            next_hop_int: row.get(12)?,
            next_hop_int_ref: row.get(13)?,
            form: form.parse().map_err(|e| conversion_error(14, e))?,
            state: ResolutionState::from_columns(&state, reason.as_deref())
                .map_err(|e| conversion_error(15, e))?,
        })
    }

    // ========== Neighbor & Inventory Operations ==========

    pub fn insert_neighbor(&self, app_id: i64, neighbor: &CdpNeighbor) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO cdp_neighbor (app_id, device_id, local_int, holdtime, capabilities, platform, remote_int)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                app_id,
                neighbor.device_id,
                neighbor.local_interface,
                neighbor.holdtime,
                neighbor.capabilities,
                neighbor.platform,
                neighbor.remote_interface,
            ],
        )?;
        Ok(())
    }

    pub fn insert_inventory(&self, app_id: i64, item: &InventoryItem) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO inventory (app_id, name, description, pid, vid, serial)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![app_id, item.name, item.description, item.pid, item.vid, item.serial],
        )?;
        Ok(())
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Delete all data (for re-ingesting)
    pub fn clear_all(&self) -> Result<()> {
        for table in schema::TABLES.iter().rev() {
            self.conn.execute(&format!("DELETE FROM {}", table), [])?;
        }
        Ok(())
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            sites: self.count("SELECT COUNT(*) FROM site")?,
            appliances: self.count("SELECT COUNT(*) FROM appliance")?,
            transcripts: self.count("SELECT COUNT(*) FROM log_file")?,
            vrfs: self.count("SELECT COUNT(*) FROM vrf")?,
            interfaces: self.count("SELECT COUNT(*) FROM interface WHERE state = 'resolved'")?,
            pending_interfaces: self.count("SELECT COUNT(*) FROM interface WHERE state = 'pending'")?,
            vlans: self.count("SELECT COUNT(*) FROM vlan")?,
            addresses: self.count("SELECT COUNT(*) FROM ip_address")?,
            static_routes: self.count("SELECT COUNT(*) FROM static_route WHERE state = 'resolved'")?,
            pending_routes: self.count("SELECT COUNT(*) FROM static_route WHERE state = 'pending'")?,
            neighbors: self.count("SELECT COUNT(*) FROM cdp_neighbor")?,
            inventory: self.count("SELECT COUNT(*) FROM inventory")?,
        })
    }
}

const INTERFACE_COLUMNS: &str = "int_id, app_id, type, number, subif, mode, description, status, \
     vrf_id, vrf_name, member_of, group_id, state, pend_reason";

const STATIC_ROUTE_COLUMNS: &str = "route_id, app_id, add_fam, subnet_id, ad_distance, name, vrf_name, \
     vrf_id, leak_vrf_name, leak_vrf_id, next_hop_ip, next_hop_ip_ref, next_hop_int, next_hop_int_ref, \
     form, state, pend_reason";

pub(super) fn conversion_error(column: usize, e: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

#[derive(Debug, Clone)]
pub struct LogFileRecord {
    pub filename: String,
    pub hash: String,
    pub line_count: usize,
    pub site_id: i64,
    pub app_id: Option<i64>,
}

/// Interface row, resolved or pending
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRecord {
    pub id: i64,
    pub app_id: i64,
    pub name: InterfaceName,
    pub mode: Option<InterfaceMode>,
    pub description: Option<String>,
    pub status: InterfaceStatus,
    pub vrf_id: Option<i64>,
    /// Raw VRF reference while pending
    pub vrf_name: Option<String>,
    pub member_of: Option<i64>,
    /// Raw port-channel group reference
    pub group_id: Option<String>,
    pub state: ResolutionState,
}

impl InterfaceRecord {
    /// Create a new record for insertion (id will be set by DB)
    pub fn new(app_id: i64, name: InterfaceName) -> Self {
        Self {
            id: 0,
            app_id,
            name,
            mode: None,
            description: None,
            status: InterfaceStatus::Up,
            vrf_id: None,
            vrf_name: None,
            member_of: None,
            group_id: None,
            state: ResolutionState::Resolved,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TunnelRecord {
    pub id: i64,
    pub int_id: i64,
    /// Raw source interface name
    pub source_int: Option<String>,
    pub source_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub source_ref: Option<i64>,
    pub dest_ref: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticRouteRecord {
    pub id: i64,
    pub app_id: i64,
    pub family: AddressFamily,
    pub subnet_id: i64,
    pub distance: u8,
    pub name: Option<String>,
    pub vrf_name: Option<String>,
    pub vrf_id: Option<i64>,
    pub leak_vrf_name: Option<String>,
    pub leak_vrf_id: Option<i64>,
    pub next_hop_ip: Option<String>,
    pub next_hop_ip_ref: Option<i64>,
    pub next_hop_int: Option<String>,
    pub next_hop_int_ref: Option<i64>,
    pub form: RouteForm,
    pub state: ResolutionState,
}

/// References found for a static route during resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRefs {
    pub vrf_id: Option<i64>,
    pub leak_vrf_id: Option<i64>,
    pub next_hop_ip_ref: Option<i64>,
    pub next_hop_int_ref: Option<i64>,
}

/// Database statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DbStats {
    pub sites: usize,
    pub appliances: usize,
    pub transcripts: usize,
    pub vrfs: usize,
    pub interfaces: usize,
    pub pending_interfaces: usize,
    pub vlans: usize,
    pub addresses: usize,
    pub static_routes: usize,
    pub pending_routes: usize,
    pub neighbors: usize,
    pub inventory: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Sites: {}", self.sites)?;
        writeln!(f, "  Appliances: {}", self.appliances)?;
        writeln!(f, "  Transcripts: {}", self.transcripts)?;
        writeln!(f, "  VRFs: {}", self.vrfs)?;
        writeln!(f, "  Interfaces: {} ({} pending)", self.interfaces, self.pending_interfaces)?;
        writeln!(f, "  VLANs: {}", self.vlans)?;
        writeln!(f, "  Addresses: {}", self.addresses)?;
        writeln!(f, "  Static routes: {} ({} pending)", self.static_routes, self.pending_routes)?;
        writeln!(f, "  CDP neighbors: {}", self.neighbors)?;
        writeln!(f, "  Inventory items: {}", self.inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_appliance() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Branch", 1).unwrap();
        let app = store.insert_appliance("PE1", site).unwrap();
        (store, app)
    }

    fn interface(app_id: i64, name: &str) -> InterfaceRecord {
        InterfaceRecord::new(app_id, name.parse().unwrap())
    }

    #[test]
    fn test_site_and_appliance_dedup() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert_site("Branch", 3).unwrap();
        let b = store.insert_site("Branch", 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.insert_appliance("R1", a).unwrap(), store.insert_appliance("R1", a).unwrap());
    }

    #[test]
    fn test_default_vrf_idempotent() {
        let (store, app) = store_with_appliance();
        let first = store.ensure_default_vrf(app).unwrap();
        let second = store.ensure_default_vrf(app).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.stats().unwrap().vrfs, 1);
    }

    #[test]
    fn test_vrf_redeclaration_fills_missing() {
        let (store, app) = store_with_appliance();
        let id = store.insert_vrf(app, "RED", None, None, Some(VrfDialect::Legacy)).unwrap();
        let again = store.insert_vrf(app, "RED", Some("65000:1"), None, None).unwrap();
        assert_eq!(id, again);
        let rd: Option<String> = store
            .conn
            .query_row("SELECT rd FROM vrf WHERE vrf_id = ?1", [id], |row| row.get(0))
            .unwrap();
        assert_eq!(rd.as_deref(), Some("65000:1"));
    }

    #[test]
    fn test_vlan_reference_then_declaration() {
        let (store, app) = store_with_appliance();
        let referenced = store.reference_vlan(app, 20).unwrap();
        let exist: i64 = store
            .conn
            .query_row("SELECT exist FROM vlan WHERE vlan_id = ?1", [referenced], |row| row.get(0))
            .unwrap();
        assert_eq!(exist, 0);

        let declared = store.declare_vlan(app, 20, Some("USERS")).unwrap();
        assert_eq!(referenced, declared);
        let (exist, name): (i64, Option<String>) = store
            .conn
            .query_row("SELECT exist, name FROM vlan WHERE vlan_id = ?1", [declared], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(exist, 1);
        assert_eq!(name.as_deref(), Some("USERS"));

        // A later reference does not undo the declaration
        store.reference_vlan(app, 20).unwrap();
        store.ensure_default_vlan(app).unwrap();
        assert_eq!(store.stats().unwrap().vlans, 2);
    }

    #[test]
    fn test_subnet_shared_by_network() {
        let (store, _) = store_with_appliance();
        let a: IpPrefix = "10.1.1.1/24".parse().unwrap();
        let b: IpPrefix = "10.1.1.2/24".parse().unwrap();
        assert_eq!(store.insert_subnet(&a).unwrap(), store.insert_subnet(&b).unwrap());

        let first = store.insert_address(None, &a, AddressType::NextHop).unwrap();
        let again = store.insert_address(None, &a, AddressType::NextHop).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_interface_natural_key_case_insensitive() {
        let (store, app) = store_with_appliance();
        let id = store.insert_interface(&interface(app, "GigabitEthernet0/1")).unwrap();
        let found = store
            .find_interface(app, &"gigabitethernet0/1".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert!(store.insert_interface(&interface(app, "GigabitEthernet0/1")).is_err());
    }

    #[test]
    fn test_demote_narrow_promote() {
        let (store, app) = store_with_appliance();
        let vrf = store.ensure_default_vrf(app).unwrap();
        let mut record = interface(app, "GigabitEthernet0/2");
        record.vrf_id = Some(vrf);
        let id = store.insert_interface(&record).unwrap();

        store.demote_interface(id, PendReason::VrfId, Some("BLUE")).unwrap();
        store.demote_interface(id, PendReason::PortChannel, None).unwrap();
        let pending = store.get_interface(id).unwrap().unwrap();
        assert_eq!(pending.vrf_name.as_deref(), Some("BLUE"));
        assert_eq!(pending.vrf_id, None);
        assert_eq!(
            pending.state,
            ResolutionState::Pending([PendReason::VrfId, PendReason::PortChannel].into_iter().collect())
        );

        store
            .narrow_interface_reasons(id, &PendReasons::single(PendReason::PortChannel))
            .unwrap();
        assert!(store.narrow_interface_reasons(id, &PendReasons::new()).is_err());
        assert_eq!(store.pending_interfaces().unwrap().len(), 1);

        assert!(store.promote_interface(id, Some(vrf), None).unwrap());
        assert!(!store.promote_interface(id, Some(vrf), None).unwrap());
        let resolved = store.get_interface(id).unwrap().unwrap();
        assert!(resolved.state.is_resolved());
        assert_eq!(resolved.vrf_id, Some(vrf));
        assert!(store.pending_interfaces().unwrap().is_empty());
    }

    #[test]
    fn test_port_channel_lookup_requires_resolved() {
        let (store, app) = store_with_appliance();
        let mut pc = interface(app, "Port-channel5");
        pc.state = ResolutionState::pending(PendReason::VrfId);
        let id = store.insert_interface(&pc).unwrap();
        assert_eq!(store.find_port_channel(app, "5").unwrap(), None);
        store.promote_interface(id, None, None).unwrap();
        assert_eq!(store.find_port_channel(app, "5").unwrap(), Some(id));
    }

    #[test]
    fn test_static_route_roundtrip_and_resolve() {
        let (store, app) = store_with_appliance();
        let subnet = store.insert_subnet(&"0.0.0.0/0".parse().unwrap()).unwrap();
        let record = StaticRouteRecord {
            id: 0,
            app_id: app,
            family: AddressFamily::V4,
            subnet_id: subnet,
            distance: 1,
            name: None,
            vrf_name: None,
            vrf_id: None,
            leak_vrf_name: None,
            leak_vrf_id: None,
            next_hop_ip: Some("10.0.0.1".to_string()),
            next_hop_ip_ref: None,
            next_hop_int: None,
            next_hop_int_ref: None,
            form: RouteForm::Classic,
            state: ResolutionState::pending(PendReason::NextHop),
        };
        let id = store.insert_static_route(&record).unwrap();
        let pending = store.pending_static_routes().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].next_hop_ip.as_deref(), Some("10.0.0.1"));

        let refs = RouteRefs {
            vrf_id: Some(store.ensure_default_vrf(app).unwrap()),
            ..Default::default()
        };
        assert!(store.resolve_static_route(id, &refs).unwrap());
        assert!(store.get_static_route(id).unwrap().unwrap().state.is_resolved());
        assert_eq!(store.stats().unwrap().pending_routes, 0);
    }
}
