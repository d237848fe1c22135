//! Database schema definitions

/// SQL to create the site table
pub const CREATE_SITE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS site (
    site_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    importance INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the appliance table
pub const CREATE_APPLIANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS appliance (
    app_id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL,
    site_id INTEGER NOT NULL REFERENCES site(site_id),
    UNIQUE(site_id, hostname)
)
"#;

/// SQL to create the log_file table
/// One row per ingested transcript, with or without an appliance
pub const CREATE_LOG_FILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS log_file (
    file_id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    hash TEXT NOT NULL,
    line_count INTEGER NOT NULL,
    site_id INTEGER NOT NULL REFERENCES site(site_id),
    app_id INTEGER REFERENCES appliance(app_id)
)
"#;

/// SQL to create the vrf table
pub const CREATE_VRF_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vrf (
    vrf_id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    name TEXT NOT NULL,
    rd TEXT,
    description TEXT,
    dialect TEXT,
    UNIQUE(app_id, name)
)
"#;

/// SQL to create the export_rt table
pub const CREATE_EXPORT_RT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS export_rt (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vrf_id INTEGER NOT NULL REFERENCES vrf(vrf_id),
    add_fam TEXT NOT NULL,
    rt TEXT NOT NULL,
    UNIQUE(vrf_id, add_fam, rt)
)
"#;

/// SQL to create the import_rt table
pub const CREATE_IMPORT_RT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS import_rt (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vrf_id INTEGER NOT NULL REFERENCES vrf(vrf_id),
    add_fam TEXT NOT NULL,
    rt TEXT NOT NULL,
    UNIQUE(vrf_id, add_fam, rt)
)
"#;

/// SQL to create the vrf_route_map table
pub const CREATE_VRF_ROUTE_MAP_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vrf_route_map (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vrf_id INTEGER NOT NULL REFERENCES vrf(vrf_id),
    add_fam TEXT NOT NULL,
    direction TEXT NOT NULL,
    map_name TEXT NOT NULL,
    UNIQUE(vrf_id, add_fam, direction)
)
"#;

/// SQL to create the interface table
/// Pending interfaces live here too, with state = 'pending' and the raw
/// references (vrf_name, group_id) they are waiting on
pub const CREATE_INTERFACE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS interface (
    int_id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    type TEXT NOT NULL COLLATE NOCASE,
    number TEXT NOT NULL,
    subif TEXT NOT NULL DEFAULT '',
    mode TEXT,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'up',
    vrf_id INTEGER REFERENCES vrf(vrf_id),
    vrf_name TEXT,
    member_of INTEGER REFERENCES interface(int_id),
    group_id TEXT,
    state TEXT NOT NULL DEFAULT 'resolved',
    pend_reason TEXT,
    UNIQUE(app_id, type, number, subif)
)
"#;

/// SQL to create the vlan table
pub const CREATE_VLAN_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vlan (
    vlan_id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    vlan_no INTEGER NOT NULL,
    name TEXT,
    exist INTEGER NOT NULL DEFAULT 0,
    UNIQUE(app_id, vlan_no)
)
"#;

/// SQL to create the int_vlan binding table
pub const CREATE_INT_VLAN_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS int_vlan (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    int_id INTEGER NOT NULL REFERENCES interface(int_id),
    vlan_id INTEGER NOT NULL REFERENCES vlan(vlan_id),
    vlan_mode TEXT NOT NULL,
    UNIQUE(int_id, vlan_id)
)
"#;

/// SQL to create the subnet table
/// Subnets are shared fleet-wide, keyed by network
pub const CREATE_SUBNET_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS subnet (
    subnet_id INTEGER PRIMARY KEY AUTOINCREMENT,
    network TEXT NOT NULL UNIQUE,
    add_fam TEXT NOT NULL
)
"#;

/// SQL to create the ip_address table
pub const CREATE_IP_ADDRESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ip_address (
    ip_id INTEGER PRIMARY KEY AUTOINCREMENT,
    add_fam TEXT NOT NULL,
    address TEXT NOT NULL,
    subnet_id INTEGER NOT NULL REFERENCES subnet(subnet_id),
    address_type TEXT NOT NULL,
    int_id INTEGER REFERENCES interface(int_id)
)
"#;

/// SQL to create the tunnel_int table
pub const CREATE_TUNNEL_INT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tunnel_int (
    tun_id INTEGER PRIMARY KEY AUTOINCREMENT,
    int_id INTEGER NOT NULL UNIQUE REFERENCES interface(int_id),
    source_int TEXT,
    source_ip TEXT,
    dest_ip TEXT,
    source_ref INTEGER REFERENCES interface(int_id),
    dest_ref INTEGER REFERENCES ip_address(ip_id)
)
"#;

/// SQL to create the static_route table
pub const CREATE_STATIC_ROUTE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS static_route (
    route_id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    add_fam TEXT NOT NULL,
    subnet_id INTEGER NOT NULL REFERENCES subnet(subnet_id),
    ad_distance INTEGER NOT NULL DEFAULT 1,
    name TEXT,
    vrf_name TEXT,
    vrf_id INTEGER REFERENCES vrf(vrf_id),
    leak_vrf_name TEXT,
    leak_vrf_id INTEGER REFERENCES vrf(vrf_id),
    next_hop_ip TEXT,
    next_hop_ip_ref INTEGER REFERENCES ip_address(ip_id),
    next_hop_int TEXT,
    next_hop_int_ref INTEGER REFERENCES interface(int_id),
    form TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'pending',
    pend_reason TEXT
)
"#;

/// SQL to create the cdp_neighbor table
pub const CREATE_CDP_NEIGHBOR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cdp_neighbor (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    device_id TEXT NOT NULL,
    local_int TEXT,
    holdtime INTEGER,
    capabilities TEXT,
    platform TEXT,
    remote_int TEXT
)
"#;

/// SQL to create the inventory table
pub const CREATE_INVENTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS inventory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES appliance(app_id),
    name TEXT NOT NULL,
    description TEXT,
    pid TEXT,
    vid TEXT,
    serial TEXT
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_interface_state ON interface(state)",
    "CREATE INDEX IF NOT EXISTS idx_interface_vrf ON interface(vrf_id)",
    "CREATE INDEX IF NOT EXISTS idx_ip_address_int ON ip_address(int_id)",
    "CREATE INDEX IF NOT EXISTS idx_ip_address_address ON ip_address(address)",
    "CREATE INDEX IF NOT EXISTS idx_export_rt_rt ON export_rt(rt)",
    "CREATE INDEX IF NOT EXISTS idx_import_rt_rt ON import_rt(rt)",
    "CREATE INDEX IF NOT EXISTS idx_static_route_vrf ON static_route(vrf_id)",
    "CREATE INDEX IF NOT EXISTS idx_static_route_state ON static_route(state)",
];

/// Tables in dependency order; the SQL dump follows this order
pub const TABLES: &[&str] = &[
    "site",
    "appliance",
    "log_file",
    "vrf",
    "export_rt",
    "import_rt",
    "vrf_route_map",
    "interface",
    "vlan",
    "int_vlan",
    "subnet",
    "ip_address",
    "tunnel_int",
    "static_route",
    "cdp_neighbor",
    "inventory",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_SITE_TABLE,
        CREATE_APPLIANCE_TABLE,
        CREATE_LOG_FILE_TABLE,
        CREATE_VRF_TABLE,
        CREATE_EXPORT_RT_TABLE,
        CREATE_IMPORT_RT_TABLE,
        CREATE_VRF_ROUTE_MAP_TABLE,
        CREATE_INTERFACE_TABLE,
        CREATE_VLAN_TABLE,
        CREATE_INT_VLAN_TABLE,
        CREATE_SUBNET_TABLE,
        CREATE_IP_ADDRESS_TABLE,
        CREATE_TUNNEL_INT_TABLE,
        CREATE_STATIC_ROUTE_TABLE,
        CREATE_CDP_NEIGHBOR_TABLE,
        CREATE_INVENTORY_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
