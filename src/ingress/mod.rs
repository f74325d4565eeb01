//! Ingress-rule compiler and reconciliation engine
//!
//! - backend: weight selection and backend reference resolution
//! - build: route extraction, ordering, and rule rendering
//! - diff: minimal patches between live and desired configuration
//! - entry: routing entries and their first-match-wins total order
//! - grants: ReferenceGrant-backed cross-namespace authorization
//! - rule: the tunnel ingress-rule wire shape and catch-all handling

pub mod backend;
pub mod build;
pub mod diff;
pub mod entry;
pub mod grants;
pub mod rule;

pub use backend::{
    select_backend_ref, BackendRef, BackendRefError, BackendRefErrorReason, BackendResolver,
    KubeServiceReader, Reference, ReferenceValidator, ResolvedBackend, ServiceReader,
};
pub use build::{BuildResult, IngressBuilder};
pub use diff::{apply_diff, diff_rules, ComparableRule};
pub use entry::{PathPriority, RoutingEntry, WILDCARD_HOSTNAME};
pub use grants::ReferenceGrantValidator;
pub use rule::{ensure_catch_all, IngressRule, CATCH_ALL_SERVICE};
