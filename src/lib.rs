//! # mplsview - Normalized network view from device transcripts
//!
//! Turns captured CLI transcripts (running configuration, VLAN tables, CDP
//! neighbors, hardware inventory) into a cross-referenced relational model of
//! sites, appliances, VRFs, interfaces, VLANs, addressing and static routes.
//!
//! mplsview provides:
//! - A section scanner and dialect-aware block parsers producing typed blocks
//! - A SQLite-backed entity store with natural-key deduplication
//! - A deferred reference resolver for forward references (VRFs, port-channels, tunnels)
//! - Fleet-wide route-target relationship queries and a report snapshot

pub mod entity;
pub mod net;
pub mod parser;
pub mod storage;
pub mod ingest;
pub mod resolver;
pub mod report;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use entity::{AddressFamily, InterfaceMode, PendReason, PendReasons, ResolutionState};
pub use ingest::{Ingestor, IngestStats};
pub use parser::{ParseOptions, ParsedBlock};
pub use resolver::{PendingResolver, ResolverStats, RouteTargetIndex};
pub use storage::SqliteStore;

/// Result type alias for mplsview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mplsview operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
