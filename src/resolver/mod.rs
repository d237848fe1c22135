//! Resolution after ingestion
//!
//! [`PendingResolver`] reconciles entities committed with forward references;
//! [`RouteTargetIndex`] answers which VRFs exchange routes with which.

pub mod pending;
pub mod relations;

pub use pending::{Attempt, PendingResolver, ResolverStats, DEFAULT_PASSES};
pub use relations::{Relationship, RouteTargetIndex, VrfRef, NO_PEER};
