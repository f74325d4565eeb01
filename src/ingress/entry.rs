//! Routing entries and their evaluation order
//!
//! The tunnel evaluates ingress rules top-to-bottom with first-match-wins,
//! so Gateway API's "more specific route wins" contract has to be encoded
//! purely in rule position. `RoutingEntry`'s total order does that encoding.

use std::cmp::Ordering;

/// Hostname sentinel meaning "match any host"
pub const WILDCARD_HOSTNAME: &str = "*";

/// How a path value is matched. Exact matches are more specific than
/// prefix matches and sort ahead of them within the same hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathPriority {
    Prefix = 0,
    Exact = 1,
}

/// One hostname/path/backend combination produced from a route rule match.
/// Immutable once created; consumed by sorting and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEntry {
    /// Hostname, with `"*"` standing in for "any host"
    pub hostname: String,

    /// Matched path; empty means the whole host
    pub path: String,

    /// Resolved backend service URL
    pub service: String,

    /// Path match specificity
    pub priority: PathPriority,
}

impl Ord for RoutingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // The wildcard hostname sorts after every concrete hostname no
        // matter how specific its path is.
        let self_wild = self.hostname == WILDCARD_HOSTNAME;
        let other_wild = other.hostname == WILDCARD_HOSTNAME;
        match (self_wild, other_wild) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }

        self.hostname
            .cmp(&other.hostname)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.path.len().cmp(&self.path.len()))
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.service.cmp(&other.service))
    }
}

impl PartialOrd for RoutingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hostname: &str, path: &str, priority: PathPriority) -> RoutingEntry {
        RoutingEntry {
            hostname: hostname.to_string(),
            path: path.to_string(),
            service: "http://svc.default.svc.cluster.local:80".to_string(),
            priority,
        }
    }

    #[test]
    fn test_wildcard_hostname_sorts_last() {
        let mut entries = vec![
            entry(WILDCARD_HOSTNAME, "/very/specific/path", PathPriority::Exact),
            entry("z.example.com", "", PathPriority::Prefix),
            entry("a.example.com", "", PathPriority::Prefix),
        ];
        entries.sort();

        assert_eq!(entries[0].hostname, "a.example.com");
        assert_eq!(entries[1].hostname, "z.example.com");
        assert_eq!(
            entries[2].hostname, WILDCARD_HOSTNAME,
            "Wildcard must lose to every concrete hostname"
        );
    }

    #[test]
    fn test_hostnames_sort_ascending() {
        let mut entries = vec![
            entry("b.example.com", "/", PathPriority::Prefix),
            entry("a.example.com", "/", PathPriority::Prefix),
        ];
        entries.sort();

        assert_eq!(entries[0].hostname, "a.example.com");
    }

    #[test]
    fn test_exact_beats_prefix_within_hostname() {
        let mut entries = vec![
            entry("a.example.com", "/", PathPriority::Prefix),
            entry("a.example.com", "/health", PathPriority::Exact),
        ];
        entries.sort();

        assert_eq!(entries[0].path, "/health");
        assert_eq!(entries[0].priority, PathPriority::Exact);
    }

    #[test]
    fn test_longer_path_wins_within_priority() {
        let mut entries = vec![
            entry("a.example.com", "/api", PathPriority::Prefix),
            entry("a.example.com", "/api/v1", PathPriority::Prefix),
        ];
        entries.sort();

        assert_eq!(entries[0].path, "/api/v1");
    }

    #[test]
    fn test_equal_length_paths_sort_lexicographically() {
        let mut entries = vec![
            entry("a.example.com", "/bbb", PathPriority::Prefix),
            entry("a.example.com", "/aaa", PathPriority::Prefix),
        ];
        entries.sort();

        assert_eq!(entries[0].path, "/aaa");
    }

    #[test]
    fn test_sort_is_deterministic_under_shuffled_input() {
        let forward = {
            let mut v = vec![
                entry("a.example.com", "/health", PathPriority::Exact),
                entry("a.example.com", "/", PathPriority::Prefix),
                entry(WILDCARD_HOSTNAME, "", PathPriority::Prefix),
                entry("b.example.com", "/api", PathPriority::Prefix),
            ];
            v.sort();
            v
        };
        let backward = {
            let mut v = vec![
                entry("b.example.com", "/api", PathPriority::Prefix),
                entry(WILDCARD_HOSTNAME, "", PathPriority::Prefix),
                entry("a.example.com", "/", PathPriority::Prefix),
                entry("a.example.com", "/health", PathPriority::Exact),
            ];
            v.sort();
            v
        };

        assert_eq!(forward, backward);
    }
}
