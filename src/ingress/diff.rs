//! Diffing live tunnel configuration against a freshly built one
//!
//! Reduces a full-sync write to a minimal patch: rules to add and rules to
//! remove, compared structurally on the hostname/path/service triple with
//! the catch-all excluded from both sides.

use std::collections::HashSet;

use crate::ingress::rule::IngressRule;

/// Structural identity of an ingress rule, with absent fields reduced to
/// empty strings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparableRule {
    pub hostname: String,
    pub path: String,
    pub service: String,
}

impl From<&IngressRule> for ComparableRule {
    fn from(rule: &IngressRule) -> Self {
        Self {
            hostname: rule.hostname.clone().unwrap_or_default(),
            path: rule.path.clone().unwrap_or_default(),
            service: rule.service.clone(),
        }
    }
}

/// Compute the additive/subtractive patch turning `current` into `desired`.
///
/// Comparison is set-based: a change in rule order without any membership
/// change yields an empty diff, and `apply_diff` will not reorder rules
/// already present. Callers that need the exact desired order must push the
/// full desired list instead of a patch.
pub fn diff_rules(
    current: &[IngressRule],
    desired: &[IngressRule],
) -> (Vec<IngressRule>, Vec<IngressRule>) {
    let current_set: HashSet<ComparableRule> = current
        .iter()
        .filter(|r| !r.is_catch_all())
        .map(ComparableRule::from)
        .collect();
    let desired_set: HashSet<ComparableRule> = desired
        .iter()
        .filter(|r| !r.is_catch_all())
        .map(ComparableRule::from)
        .collect();

    let to_add = desired
        .iter()
        .filter(|r| !r.is_catch_all() && !current_set.contains(&ComparableRule::from(*r)))
        .cloned()
        .collect();
    let to_remove = current
        .iter()
        .filter(|r| !r.is_catch_all() && !desired_set.contains(&ComparableRule::from(*r)))
        .cloned()
        .collect();

    (to_add, to_remove)
}

/// Merge a patch into the live rule list: keep `current` in its original
/// relative order minus removals (and minus its catch-all), then append all
/// additions. The result still needs `ensure_catch_all` before submission.
pub fn apply_diff(
    current: &[IngressRule],
    to_add: &[IngressRule],
    to_remove: &[IngressRule],
) -> Vec<IngressRule> {
    let removals: HashSet<ComparableRule> = to_remove.iter().map(ComparableRule::from).collect();

    current
        .iter()
        .filter(|r| !r.is_catch_all() && !removals.contains(&ComparableRule::from(*r)))
        .chain(to_add.iter())
        .cloned()
        .collect()
}
