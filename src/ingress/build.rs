//! Compiling routes into an ordered ingress-rule table
//!
//! HTTPRoute and GRPCRoute share one extraction pipeline parameterized over
//! a small adapter trait: walk hostnames x rules x matches, resolve each
//! rule's backend once, sort the produced entries into first-match-wins
//! order, and render the wire rules with a single trailing catch-all.

use gateway_api::grpcroutes::{GRPCRoute, GRPCRouteRulesMatches};
use gateway_api::httproutes::{HTTPRoute, HTTPRouteRulesMatches, HTTPRouteRulesMatchesPathType};
use kube::ResourceExt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ControllerConfig;
use crate::ingress::backend::{
    BackendRef, BackendRefError, BackendResolver, ReferenceValidator, ResolvedBackend,
    ServiceReader,
};
use crate::ingress::entry::{PathPriority, RoutingEntry, WILDCARD_HOSTNAME};
use crate::ingress::rule::IngressRule;
use crate::metrics::record_ingress_build;
use std::sync::Arc;

/// Output of one build pass. `rules` is ordered and ready for the tunnel
/// configuration API; `failed_refs` feeds route status conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub rules: Vec<IngressRule>,
    pub failed_refs: Vec<BackendRefError>,
}

/// A route rule's match reduced to what the tunnel can express
#[derive(Debug, Clone, PartialEq, Eq)]
struct MatchSpec {
    path: String,
    priority: PathPriority,
}

/// A route rule reduced to backend references plus expressible matches
#[derive(Debug, Clone, PartialEq, Eq)]
struct NormalizedRule {
    backend_refs: Vec<BackendRef>,
    matches: Vec<MatchSpec>,
}

/// Capability surface a route kind exposes to the shared pipeline
trait RouteAdapter {
    const KIND: &'static str;
    /// Whether a build of this kind alone terminates with the catch-all.
    /// GRPCRoute entries are merged with HTTPRoute entries by the combined
    /// build, which appends the catch-all exactly once.
    const ADD_CATCH_ALL: bool;

    fn route_namespace(&self) -> String;
    fn route_name(&self) -> String;
    fn route_hostnames(&self) -> Vec<String>;
    fn normalized_rules(&self) -> Vec<NormalizedRule>;
}

impl RouteAdapter for HTTPRoute {
    const KIND: &'static str = "HTTPRoute";
    const ADD_CATCH_ALL: bool = true;

    fn route_namespace(&self) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }

    fn route_name(&self) -> String {
        self.name_any()
    }

    fn route_hostnames(&self) -> Vec<String> {
        self.spec.hostnames.clone().unwrap_or_default()
    }

    fn normalized_rules(&self) -> Vec<NormalizedRule> {
        let namespace = self.route_namespace();
        let name = self.route_name();

        self.spec
            .rules
            .iter()
            .flatten()
            .map(|rule| {
                if rule.filters.as_ref().is_some_and(|f| !f.is_empty()) {
                    warn!(
                        "HTTPRoute {}/{} uses filters; the tunnel cannot apply them, ignoring",
                        namespace, name
                    );
                }
                let matches = rule
                    .matches
                    .iter()
                    .flatten()
                    .map(|m| normalize_http_match(&namespace, &name, m))
                    .collect();
                NormalizedRule {
                    backend_refs: rule
                        .backend_refs
                        .iter()
                        .flatten()
                        .map(BackendRef::from)
                        .collect(),
                    matches,
                }
            })
            .collect()
    }
}

fn normalize_http_match(namespace: &str, name: &str, m: &HTTPRouteRulesMatches) -> MatchSpec {
    if m.headers.as_ref().is_some_and(|h| !h.is_empty()) {
        warn!(
            "HTTPRoute {}/{} matches on headers; the tunnel cannot, ignoring",
            namespace, name
        );
    }
    if m.query_params.as_ref().is_some_and(|q| !q.is_empty()) {
        warn!(
            "HTTPRoute {}/{} matches on query parameters; the tunnel cannot, ignoring",
            namespace, name
        );
    }
    if m.method.is_some() {
        warn!(
            "HTTPRoute {}/{} matches on method; the tunnel cannot, ignoring",
            namespace, name
        );
    }

    // Gateway API defaults an absent path match to PathPrefix "/"
    let Some(path_match) = &m.path else {
        return MatchSpec {
            path: "/".to_string(),
            priority: PathPriority::Prefix,
        };
    };
    let path = path_match.value.clone().unwrap_or_else(|| "/".to_string());
    let priority = match path_match.r#type {
        Some(HTTPRouteRulesMatchesPathType::Exact) => PathPriority::Exact,
        Some(HTTPRouteRulesMatchesPathType::RegularExpression) => {
            warn!(
                "HTTPRoute {}/{} uses a RegularExpression path match for {}; \
                 the tunnel only supports prefixes, downgrading",
                namespace, name, path
            );
            PathPriority::Prefix
        }
        Some(HTTPRouteRulesMatchesPathType::PathPrefix) | None => PathPriority::Prefix,
    };
    MatchSpec { path, priority }
}

impl RouteAdapter for GRPCRoute {
    const KIND: &'static str = "GRPCRoute";
    const ADD_CATCH_ALL: bool = false;

    fn route_namespace(&self) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }

    fn route_name(&self) -> String {
        self.name_any()
    }

    fn route_hostnames(&self) -> Vec<String> {
        self.spec.hostnames.clone().unwrap_or_default()
    }

    fn normalized_rules(&self) -> Vec<NormalizedRule> {
        let namespace = self.route_namespace();
        let name = self.route_name();

        self.spec
            .rules
            .iter()
            .flatten()
            .map(|rule| {
                if rule.filters.as_ref().is_some_and(|f| !f.is_empty()) {
                    warn!(
                        "GRPCRoute {}/{} uses filters; the tunnel cannot apply them, ignoring",
                        namespace, name
                    );
                }
                let matches = rule
                    .matches
                    .iter()
                    .flatten()
                    .map(|m| normalize_grpc_match(&namespace, &name, m))
                    .collect();
                NormalizedRule {
                    backend_refs: rule
                        .backend_refs
                        .iter()
                        .flatten()
                        .map(BackendRef::from)
                        .collect(),
                    matches,
                }
            })
            .collect()
    }
}

fn normalize_grpc_match(namespace: &str, name: &str, m: &GRPCRouteRulesMatches) -> MatchSpec {
    if m.headers.as_ref().is_some_and(|h| !h.is_empty()) {
        warn!(
            "GRPCRoute {}/{} matches on headers; the tunnel cannot, ignoring",
            namespace, name
        );
    }

    // gRPC requests are POSTs to /<service>/<method>, so a fully specified
    // method match is an exact path and a service-only match is a prefix.
    match m.method.as_ref() {
        Some(method) => match (&method.service, &method.method) {
            (Some(service), Some(method)) => MatchSpec {
                path: format!("/{}/{}", service, method),
                priority: PathPriority::Exact,
            },
            (Some(service), None) => MatchSpec {
                path: format!("/{}/", service),
                priority: PathPriority::Prefix,
            },
            _ => MatchSpec {
                path: String::new(),
                priority: PathPriority::Prefix,
            },
        },
        None => MatchSpec {
            path: String::new(),
            priority: PathPriority::Prefix,
        },
    }
}

/// Render one sorted entry into its wire shape.
///
/// The wildcard hostname is encoded by omitting the field; an explicit "*"
/// is rejected by the remote API when other rules are present. Root and
/// empty paths are omitted too, and prefix paths get the trailing "*" the
/// tunnel uses as its wildcard marker.
fn render_entry(entry: &RoutingEntry) -> IngressRule {
    let hostname = (entry.hostname != WILDCARD_HOSTNAME).then(|| entry.hostname.clone());
    let path = if entry.path.is_empty() || entry.path == "/" {
        None
    } else {
        let mut path = entry.path.clone();
        if entry.priority == PathPriority::Prefix {
            path.push('*');
        }
        Some(path)
    };
    IngressRule {
        hostname,
        path,
        service: entry.service.clone(),
    }
}

fn render_entries(mut entries: Vec<RoutingEntry>, add_catch_all: bool) -> Vec<IngressRule> {
    entries.sort();
    let mut rules: Vec<IngressRule> = entries.iter().map(render_entry).collect();
    if add_catch_all {
        rules.push(IngressRule::catch_all());
    }
    rules
}

/// Compiles HTTPRoute/GRPCRoute objects into tunnel ingress rules.
///
/// Constructed once with immutable collaborators; every build allocates
/// fresh local state, so a shared builder is safe to use concurrently.
pub struct IngressBuilder {
    resolver: BackendResolver,
}

impl IngressBuilder {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            resolver: BackendResolver::new(config.cluster_domain.clone())
                .with_record_unsupported(config.record_unsupported_backends),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ReferenceValidator>) -> Self {
        self.resolver = self.resolver.with_validator(validator);
        self
    }

    pub fn with_service_reader(mut self, services: Arc<dyn ServiceReader>) -> Self {
        self.resolver = self.resolver.with_service_reader(services);
        self
    }

    async fn extract_route<R: RouteAdapter>(
        &self,
        route: &R,
        entries: &mut Vec<RoutingEntry>,
        failed_refs: &mut Vec<BackendRefError>,
    ) {
        let namespace = route.route_namespace();
        let name = route.route_name();
        let mut hostnames = route.route_hostnames();
        if hostnames.is_empty() {
            hostnames.push(WILDCARD_HOSTNAME.to_string());
        }
        let rules = route.normalized_rules();
        let entries_before = entries.len();

        // Resolve each rule once and reuse the result across hostnames, so
        // a failing reference is recorded exactly once per rule.
        let mut resolved: Vec<Option<String>> = Vec::with_capacity(rules.len());
        for rule in &rules {
            match self
                .resolver
                .resolve(R::KIND, &namespace, &name, &rule.backend_refs)
                .await
            {
                ResolvedBackend::Service(url) => resolved.push(Some(url)),
                ResolvedBackend::Skipped => resolved.push(None),
                ResolvedBackend::Failed(err) => {
                    failed_refs.push(err);
                    resolved.push(None);
                }
            }
        }

        for hostname in &hostnames {
            for (rule, service) in rules.iter().zip(&resolved) {
                let Some(service) = service else {
                    continue;
                };
                if rule.matches.is_empty() {
                    // No matches means the rule covers the whole host
                    entries.push(RoutingEntry {
                        hostname: hostname.clone(),
                        path: String::new(),
                        service: service.clone(),
                        priority: PathPriority::Prefix,
                    });
                    continue;
                }
                for m in &rule.matches {
                    entries.push(RoutingEntry {
                        hostname: hostname.clone(),
                        path: m.path.clone(),
                        service: service.clone(),
                        priority: m.priority,
                    });
                }
            }
        }

        debug!(
            "{} {}/{} contributed {} routing entries",
            R::KIND,
            namespace,
            name,
            entries.len() - entries_before
        );
    }

    async fn extract_all<R: RouteAdapter>(
        &self,
        routes: &[R],
        entries: &mut Vec<RoutingEntry>,
        failed_refs: &mut Vec<BackendRefError>,
    ) {
        let start = Instant::now();
        let failures_before = failed_refs.len();
        for route in routes {
            self.extract_route(route, entries, failed_refs).await;
        }
        let result = if failed_refs.len() > failures_before {
            "partial"
        } else {
            "success"
        };
        record_ingress_build(R::KIND, start.elapsed().as_secs_f64(), result);
    }

    /// Build the rule table for HTTPRoutes alone, catch-all appended
    pub async fn build_http_routes(&self, routes: &[HTTPRoute]) -> BuildResult {
        let mut entries = Vec::new();
        let mut failed_refs = Vec::new();
        self.extract_all(routes, &mut entries, &mut failed_refs)
            .await;
        BuildResult {
            rules: render_entries(entries, <HTTPRoute as RouteAdapter>::ADD_CATCH_ALL),
            failed_refs,
        }
    }

    /// Build the rule table for GRPCRoutes alone, without a catch-all
    pub async fn build_grpc_routes(&self, routes: &[GRPCRoute]) -> BuildResult {
        let mut entries = Vec::new();
        let mut failed_refs = Vec::new();
        self.extract_all(routes, &mut entries, &mut failed_refs)
            .await;
        BuildResult {
            rules: render_entries(entries, <GRPCRoute as RouteAdapter>::ADD_CATCH_ALL),
            failed_refs,
        }
    }

    /// Full sync: merge both route kinds into one ordered table with a
    /// single trailing catch-all
    pub async fn build(&self, http_routes: &[HTTPRoute], grpc_routes: &[GRPCRoute]) -> BuildResult {
        let mut entries = Vec::new();
        let mut failed_refs = Vec::new();
        self.extract_all(http_routes, &mut entries, &mut failed_refs)
            .await;
        self.extract_all(grpc_routes, &mut entries, &mut failed_refs)
            .await;
        BuildResult {
            rules: render_entries(entries, true),
            failed_refs,
        }
    }
}
