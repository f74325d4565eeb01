//! Cloudflare Tunnel ingress rule wire shape
//!
//! A tunnel configuration is an ordered list of ingress rules evaluated
//! top-to-bottom with first-match-wins. The final rule must be a catch-all
//! (no hostname, no path); the remote API rejects configurations without one.

use serde::{Deserialize, Serialize};

/// Service string of the canonical catch-all rule
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// One entry in the tunnel's ordered routing table.
///
/// `hostname` and `path` are optional on the wire; an absent field means
/// "match any". `service` is the origin the matched request is sent to,
/// e.g. `http://svc.default.svc.cluster.local:8080` or `http_status:404`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub service: String,
}

impl IngressRule {
    /// The canonical terminal rule: match anything, answer 404
    pub fn catch_all() -> Self {
        Self {
            hostname: None,
            path: None,
            service: CATCH_ALL_SERVICE.to_string(),
        }
    }

    /// A rule with neither hostname nor path matches every request and is
    /// treated as a catch-all regardless of its service string.
    pub fn is_catch_all(&self) -> bool {
        self.hostname.as_deref().unwrap_or("").is_empty()
            && self.path.as_deref().unwrap_or("").is_empty()
    }
}

/// Normalize a rule list so it ends with exactly one canonical catch-all.
///
/// Every existing catch-all is stripped wherever it sits, then the canonical
/// one is appended. Idempotent.
pub fn ensure_catch_all(rules: Vec<IngressRule>) -> Vec<IngressRule> {
    let mut normalized: Vec<IngressRule> =
        rules.into_iter().filter(|r| !r.is_catch_all()).collect();
    normalized.push(IngressRule::catch_all());
    normalized
}
