//! Backend reference resolution
//!
//! Turns a route rule's backend reference list into a single origin URL:
//! pick one reference by weight, authorize cross-namespace targets through
//! a `ReferenceValidator`, and look the Service up to honor ExternalName
//! backends. Everything here is per-reference and non-fatal; a failed
//! resolution drops that rule and records a `BackendRefError`.

use async_trait::async_trait;
use gateway_api::grpcroutes::GRPCRouteRulesBackendRefs;
use gateway_api::httproutes::HTTPRouteRulesBackendRefs;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ControllerError;
use crate::metrics::record_backend_ref_validation;

/// API group of the route kinds this controller compiles
pub const ROUTE_API_GROUP: &str = "gateway.networking.k8s.io";

/// Select one backend reference by weight.
///
/// Unset weight defaults to 1. Weight 0 disables a candidate outright.
/// The strictly highest weight wins; ties go to the first occurrence, so
/// selection is deterministic under stable input order. `None` means no
/// candidate survived and no rule should be produced.
pub fn select_backend_ref(weights: &[Option<i32>]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (idx, weight) in weights.iter().enumerate() {
        let weight = weight.unwrap_or(1);
        if weight == 0 {
            continue;
        }
        match best {
            Some((_, best_weight)) if best_weight >= weight => {}
            _ => best = Some((idx, weight)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// One side of a cross-namespace authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Why a backend reference could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRefErrorReason {
    /// Cross-namespace reference without an authorizing ReferenceGrant
    RefNotPermitted,
    /// Referenced Service does not exist
    BackendNotFound,
    /// Unsupported backend kind or group (only recorded when
    /// `record_unsupported_backends` is enabled)
    InvalidKind,
}

impl BackendRefErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendRefErrorReason::RefNotPermitted => "RefNotPermitted",
            BackendRefErrorReason::BackendNotFound => "BackendNotFound",
            BackendRefErrorReason::InvalidKind => "InvalidKind",
        }
    }
}

impl fmt::Display for BackendRefErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded, non-fatal backend resolution failure. Consumed by the
/// status-reporting layer to surface `ResolvedRefs` conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRefError {
    pub route_namespace: String,
    pub route_name: String,
    pub backend_name: String,
    pub backend_namespace: String,
    pub reason: BackendRefErrorReason,
    pub message: String,
}

/// Kind-agnostic view of a route rule's backend reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendRef {
    pub group: Option<String>,
    pub kind: Option<String>,
    pub name: String,
    pub namespace: Option<String>,
    pub port: Option<i32>,
    pub weight: Option<i32>,
}

impl From<&HTTPRouteRulesBackendRefs> for BackendRef {
    fn from(r: &HTTPRouteRulesBackendRefs) -> Self {
        Self {
            group: r.group.clone(),
            kind: r.kind.clone(),
            name: r.name.clone(),
            namespace: r.namespace.clone(),
            port: r.port,
            weight: r.weight,
        }
    }
}

impl From<&GRPCRouteRulesBackendRefs> for BackendRef {
    fn from(r: &GRPCRouteRulesBackendRefs) -> Self {
        Self {
            group: r.group.clone(),
            kind: r.kind.clone(),
            name: r.name.clone(),
            namespace: r.namespace.clone(),
            port: r.port,
            weight: r.weight,
        }
    }
}

impl BackendRef {
    /// Only plain core-group Services are routable through the tunnel
    fn is_supported_service(&self) -> bool {
        let group_ok = matches!(self.group.as_deref(), None | Some("") | Some("core"));
        let kind_ok = matches!(self.kind.as_deref(), None | Some("Service"));
        group_ok && kind_ok
    }
}

/// Authorizes a cross-namespace reference from a route to a backend
#[async_trait]
pub trait ReferenceValidator: Send + Sync {
    async fn is_reference_allowed(
        &self,
        from: &Reference,
        to: &Reference,
    ) -> Result<bool, ControllerError>;
}

/// Reads Service objects; `Ok(None)` means the Service does not exist
#[async_trait]
pub trait ServiceReader: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Service>, ControllerError>;
}

/// `ServiceReader` backed by the Kubernetes API
pub struct KubeServiceReader {
    client: Client,
}

impl KubeServiceReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceReader for KubeServiceReader {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Service>, ControllerError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Outcome of resolving one rule's backend reference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBackend {
    /// Resolved origin URL for the selected backend
    Service(String),
    /// Nothing selected (all disabled, empty list, or unsupported kind):
    /// the rule is silently omitted
    Skipped,
    /// A reportable failure; the rule is dropped and the error recorded
    Failed(BackendRefError),
}

/// Resolves backend references against injected collaborators.
///
/// All collaborators are optional: without a validator every cross-namespace
/// reference is denied, and without a service reader resolution degrades to
/// cluster-DNS URL synthesis. Holds no mutable state, so one resolver can be
/// shared across concurrent build passes.
pub struct BackendResolver {
    cluster_domain: String,
    validator: Option<Arc<dyn ReferenceValidator>>,
    services: Option<Arc<dyn ServiceReader>>,
    record_unsupported: bool,
}

impl BackendResolver {
    pub fn new(cluster_domain: impl Into<String>) -> Self {
        Self {
            cluster_domain: cluster_domain.into(),
            validator: None,
            services: None,
            record_unsupported: false,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ReferenceValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_service_reader(mut self, services: Arc<dyn ServiceReader>) -> Self {
        self.services = Some(services);
        self
    }

    /// Record unsupported backend kinds/groups as failed refs instead of
    /// dropping them silently
    pub fn with_record_unsupported(mut self, record: bool) -> Self {
        self.record_unsupported = record;
        self
    }

    /// Resolve one rule's backend references to a single origin URL.
    ///
    /// Exactly one reference is used; weights never split traffic.
    pub async fn resolve(
        &self,
        route_kind: &str,
        route_namespace: &str,
        route_name: &str,
        backend_refs: &[BackendRef],
    ) -> ResolvedBackend {
        let weights: Vec<Option<i32>> = backend_refs.iter().map(|r| r.weight).collect();
        let Some(selected) = select_backend_ref(&weights) else {
            record_backend_ref_validation(route_kind, "skipped", "");
            return ResolvedBackend::Skipped;
        };
        let backend_ref = &backend_refs[selected];

        if backend_refs.len() > 1 {
            info!(
                "{} {}/{} has {} backend refs; only {} is used (no traffic splitting)",
                route_kind,
                route_namespace,
                route_name,
                backend_refs.len(),
                backend_ref.name
            );
        }
        if backend_refs
            .iter()
            .any(|r| !matches!(r.weight, None | Some(0) | Some(1)))
        {
            info!(
                "{} {}/{} sets backend weights; weights are ignored beyond picking the highest",
                route_kind, route_namespace, route_name
            );
        }

        let target_namespace = backend_ref
            .namespace
            .clone()
            .unwrap_or_else(|| route_namespace.to_string());

        if !backend_ref.is_supported_service() {
            if self.record_unsupported {
                record_backend_ref_validation(route_kind, "failed", "InvalidKind");
                return ResolvedBackend::Failed(BackendRefError {
                    route_namespace: route_namespace.to_string(),
                    route_name: route_name.to_string(),
                    backend_name: backend_ref.name.clone(),
                    backend_namespace: target_namespace,
                    reason: BackendRefErrorReason::InvalidKind,
                    message: format!(
                        "Backend kind {}/{} is not supported; only core Services can be routed",
                        backend_ref.group.as_deref().unwrap_or(""),
                        backend_ref.kind.as_deref().unwrap_or("Service"),
                    ),
                });
            }
            info!(
                "{} {}/{} references unsupported backend kind {:?} group {:?}; skipping",
                route_kind, route_namespace, route_name, backend_ref.kind, backend_ref.group
            );
            record_backend_ref_validation(route_kind, "skipped", "");
            return ResolvedBackend::Skipped;
        }

        if target_namespace != route_namespace {
            let from = Reference {
                group: ROUTE_API_GROUP.to_string(),
                kind: route_kind.to_string(),
                namespace: route_namespace.to_string(),
                name: route_name.to_string(),
            };
            let to = Reference {
                group: String::new(),
                kind: "Service".to_string(),
                namespace: target_namespace.clone(),
                name: backend_ref.name.clone(),
            };
            let allowed = match &self.validator {
                Some(validator) => match validator.is_reference_allowed(&from, &to).await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        warn!(
                            "Reference validation for {} {}/{} -> Service {}/{} errored: {}",
                            route_kind,
                            route_namespace,
                            route_name,
                            target_namespace,
                            backend_ref.name,
                            e
                        );
                        false
                    }
                },
                None => false,
            };
            if !allowed {
                record_backend_ref_validation(route_kind, "failed", "RefNotPermitted");
                return ResolvedBackend::Failed(BackendRefError {
                    route_namespace: route_namespace.to_string(),
                    route_name: route_name.to_string(),
                    backend_name: backend_ref.name.clone(),
                    backend_namespace: target_namespace.clone(),
                    reason: BackendRefErrorReason::RefNotPermitted,
                    message: format!(
                        "Reference to Service {}/{} is not permitted by any ReferenceGrant",
                        target_namespace, backend_ref.name
                    ),
                });
            }
        }

        let port = backend_ref.port.unwrap_or(80);
        let scheme = if port == 443 { "https" } else { "http" };

        if let Some(services) = &self.services {
            match services.get(&target_namespace, &backend_ref.name).await {
                Ok(Some(service)) => {
                    let spec = service.spec.unwrap_or_default();
                    if spec.type_.as_deref() == Some("ExternalName") {
                        if let Some(external_name) = spec.external_name {
                            record_backend_ref_validation(route_kind, "resolved", "");
                            return ResolvedBackend::Service(format!(
                                "{}://{}:{}",
                                scheme, external_name, port
                            ));
                        }
                    }
                }
                Ok(None) => {
                    record_backend_ref_validation(route_kind, "failed", "BackendNotFound");
                    return ResolvedBackend::Failed(BackendRefError {
                        route_namespace: route_namespace.to_string(),
                        route_name: route_name.to_string(),
                        backend_name: backend_ref.name.clone(),
                        backend_namespace: target_namespace.clone(),
                        reason: BackendRefErrorReason::BackendNotFound,
                        message: format!(
                            "Service {}/{} not found",
                            target_namespace, backend_ref.name
                        ),
                    });
                }
                Err(e) => {
                    warn!(
                        "Service lookup for {}/{} failed ({}); falling back to cluster DNS",
                        target_namespace, backend_ref.name, e
                    );
                }
            }
        }

        record_backend_ref_validation(route_kind, "resolved", "");
        ResolvedBackend::Service(format!(
            "{}://{}.{}.svc.{}:{}",
            scheme, backend_ref.name, target_namespace, self.cluster_domain, port
        ))
    }
}
