//! tungate controller core
//!
//! Compiles Kubernetes Gateway API routes (HTTPRoute, GRPCRoute) into the
//! ordered ingress-rule table of a Cloudflare Tunnel and reconciles it
//! against live remote configuration. The watch loop, status reporting, and
//! the tunnel API transport live in the embedding binary; this crate is the
//! pure compile/diff pipeline plus its Kubernetes-backed collaborators.

pub mod config;
pub mod error;
pub mod ingress;
pub mod metrics;

pub use config::ControllerConfig;
pub use error::ControllerError;
pub use ingress::{
    apply_diff, diff_rules, ensure_catch_all, BuildResult, IngressBuilder, IngressRule,
};
