//! Tenancy Policy Controller Indexes
//!
//! The admission path never talks to the API server. Instead, it reads from
//! in-memory indexes that are kept current by cluster-scoped watches:
//!
//! - Each `Tenant` reports the namespaces bound to it in its status. The
//!   tenant index keeps an inverted map from each namespace to the tenants
//!   claiming it, so that the tenant of a namespace is found without scanning
//!   every tenant.
//! - A single `TenancyConfiguration`, selected by name, holds the users that
//!   are excluded from tenant policy cluster-wide.
//!
//! ```text
//! [ Tenant ] -> [ Namespace ] <- admission request
//! [ TenancyConfiguration ] -> [ ClusterExclusions ]
//! ```

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod configuration;
pub mod tenant;

pub use self::tenant::{Index, SharedIndex};
