use crate::labels::Selector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selects the pods a cluster-scoped policy applies to.
///
/// Exactly one of `namespaces` or `pods` must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Selects all pods in the matching namespaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Selector>,

    /// Selects matching pods in the matching namespaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<NamespacedPod>,
}

/// A pod selector scoped by a namespace selector. Both selectors are required.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedPod {
    pub namespace_selector: Selector,
    pub pod_selector: Selector,
}
