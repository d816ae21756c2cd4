use super::subject::NamespacedPod;
use crate::labels::Selector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Describes the sources of ingress traffic. Exactly one field must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressPeer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Selector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<NamespacedPod>,
}

/// Describes the destinations of egress traffic. Exactly one field must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EgressPeer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Selector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<NamespacedPod>,

    /// Selects the IPs of the matching nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Selector>,

    /// CIDR blocks, IPv4 or IPv6.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<String>>,

    /// Fully qualified domain names; a leading `*` label matches one or more labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_names: Option<Vec<String>>,
}
