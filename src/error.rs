use thiserror::Error;

/// Controller errors surfaced by collaborators (Kubernetes lookups,
/// reference validation). Per-backend resolution failures are not errors;
/// they are recorded as `BackendRefError` values in the build result.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Kubernetes API error: {0}")]
    Kubernetes(#[from] kube::Error),

    #[error("Route configuration error: {0}")]
    RouteConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
