//! ReferenceGrant-backed cross-namespace authorization
//!
//! A route may only target a Service in another namespace when a
//! ReferenceGrant in the target namespace names both sides. This is the
//! production `ReferenceValidator`; tests inject in-memory validators.

use async_trait::async_trait;
use gateway_api::referencegrants::{ReferenceGrant, ReferenceGrantFrom, ReferenceGrantTo};
use kube::api::ListParams;
use kube::{Api, Client};

use crate::error::ControllerError;
use crate::ingress::backend::{Reference, ReferenceValidator};

/// Treats the empty group and its "core" alias as equal
fn group_matches(grant_group: &str, group: &str) -> bool {
    let normalize = |g: &str| if g == "core" { "" } else { g }.to_string();
    normalize(grant_group) == normalize(group)
}

fn from_matches(from: &ReferenceGrantFrom, reference: &Reference) -> bool {
    group_matches(&from.group, &reference.group)
        && from.kind == reference.kind
        && from.namespace == reference.namespace
}

fn to_matches(to: &ReferenceGrantTo, reference: &Reference) -> bool {
    group_matches(&to.group, &reference.group)
        && to.kind == reference.kind
        && to.name.as_ref().is_none_or(|name| *name == reference.name)
}

/// `ReferenceValidator` backed by ReferenceGrant objects in the target
/// namespace
pub struct ReferenceGrantValidator {
    client: Client,
}

impl ReferenceGrantValidator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceValidator for ReferenceGrantValidator {
    async fn is_reference_allowed(
        &self,
        from: &Reference,
        to: &Reference,
    ) -> Result<bool, ControllerError> {
        let api: Api<ReferenceGrant> = Api::namespaced(self.client.clone(), &to.namespace);
        let grants = api.list(&ListParams::default()).await?;

        Ok(grants.items.iter().any(|grant| {
            grant.spec.from.iter().any(|f| from_matches(f, from))
                && grant.spec.to.iter().any(|t| to_matches(t, to))
        }))
    }
}
