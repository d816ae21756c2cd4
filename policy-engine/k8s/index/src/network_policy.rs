use crate::{
    admin_network_policy::{network, port_number},
    Index,
};
use anyhow::{bail, Context, Result};
use policy_engine_core::{
    policy::namespace_name_selector, Action, NamespacedPolicy, Peer, PortMatch, Protocol, Rule,
    Selector,
};
use policy_engine_k8s_api::{
    self as k8s,
    policy::{NetworkPolicy, NetworkPolicyPeer, NetworkPolicyPort},
    IntOrString, ResourceExt,
};

impl kubert::index::IndexNamespacedResource<NetworkPolicy> for Index {
    fn apply(&mut self, policy: NetworkPolicy) {
        let namespace = policy.namespace().unwrap_or_default();
        let name = policy.name_any();
        if let Err(error) = self.apply_network_policy(policy) {
            tracing::warn!(%namespace, %name, %error, "Failed to apply NetworkPolicy");
        }
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_network_policy(&namespace, &name);
    }
}

/// Converts a `NetworkPolicy` resource into a namespaced policy.
///
/// A policy whose pod selector cannot be interpreted is rejected, since it is unclear which pods
/// it isolates.
pub fn convert(policy: NetworkPolicy) -> Result<NamespacedPolicy> {
    let namespace = policy
        .metadata
        .namespace
        .context("NetworkPolicy must have a namespace")?;
    let name = policy
        .metadata
        .name
        .context("NetworkPolicy must have a name")?;
    let spec = policy.spec.unwrap_or_default();

    let pod_selector: Option<k8s::LabelSelector> = spec.pod_selector.into();
    let pod_selector = match pod_selector {
        Some(sel) => Selector::try_from(&sel).context("invalid podSelector")?,
        None => Selector::default(),
    };

    let (mut governs_ingress, mut governs_egress) = (true, spec.egress.is_some());
    if let Some(types) = spec.policy_types {
        governs_ingress = false;
        governs_egress = false;
        for t in types {
            match t.as_str() {
                "Ingress" => governs_ingress = true,
                "Egress" => governs_egress = true,
                t => tracing::warn!(%namespace, %name, policy_type = %t, "Ignoring unknown type"),
            }
        }
    }

    let ingress = governs_ingress.then(|| {
        spec.ingress
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, rule)| rule_from(&namespace, &name, idx, rule.from, rule.ports))
            .collect()
    });
    let egress = governs_egress.then(|| {
        spec.egress
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, rule)| rule_from(&namespace, &name, idx, rule.to, rule.ports))
            .collect()
    });

    Ok(NamespacedPolicy {
        namespace,
        name,
        pod_selector,
        ingress,
        egress,
    })
}

/// Namespaced rules only allow traffic. A rule without peers applies to all peers, and a rule
/// without ports applies to all ports.
fn rule_from(
    namespace: &str,
    policy: &str,
    idx: usize,
    peers: Option<Vec<NetworkPolicyPeer>>,
    ports: Option<Vec<NetworkPolicyPort>>,
) -> Rule {
    let peers = match peers.filter(|peers| !peers.is_empty()) {
        None => vec![Peer::Any],
        Some(peers) => peers
            .iter()
            .map(|p| {
                peer(namespace, p).unwrap_or_else(|error| {
                    tracing::warn!(%namespace, %policy, rule = idx, %error, "Invalid peer");
                    Peer::Unknown
                })
            })
            .collect(),
    };

    let ports = ports.filter(|ports| !ports.is_empty()).map(|ports| {
        ports
            .iter()
            .map(|p| {
                port(p).unwrap_or_else(|error| {
                    tracing::warn!(%namespace, %policy, rule = idx, %error, "Invalid port");
                    PortMatch::Unknown
                })
            })
            .collect()
    });

    Rule {
        name: None,
        action: Action::Allow,
        peers,
        ports,
    }
}

fn peer(namespace: &str, peer: &NetworkPolicyPeer) -> Result<Peer> {
    match (&peer.ip_block, &peer.namespace_selector, &peer.pod_selector) {
        (Some(block), None, None) => {
            let net = network(&block.cidr, block.except.as_deref())?;
            Ok(Peer::Networks(vec![net]))
        }
        (None, Some(namespaces), None) => Ok(Peer::Namespaces(Selector::try_from(namespaces)?)),
        // A pod selector without a namespace selector selects pods in the policy's namespace.
        (None, namespaces, Some(pods)) => {
            let namespaces = match namespaces {
                Some(sel) => Selector::try_from(sel)?,
                None => namespace_name_selector(namespace),
            };
            Ok(Peer::Pods {
                namespaces,
                pods: Selector::try_from(pods)?,
            })
        }
        (None, None, None) => bail!("peers must set ipBlock, namespaceSelector or podSelector"),
        (Some(_), _, _) => bail!("ipBlock may not be combined with selectors"),
    }
}

fn port(port: &NetworkPolicyPort) -> Result<PortMatch> {
    let protocol = port
        .protocol
        .as_deref()
        .map(str::parse::<Protocol>)
        .transpose()?
        .unwrap_or_default();

    match (&port.port, port.end_port) {
        (None, None) => Ok(PortMatch::Protocol(protocol)),
        (Some(IntOrString::Int(port)), None) => Ok(PortMatch::Number {
            protocol,
            port: port_number(*port)?,
        }),
        (Some(IntOrString::Int(start)), Some(end)) => {
            let (start, end) = (port_number(*start)?, port_number(end)?);
            if start > end {
                bail!("endPort {end} must not be less than port {start}");
            }
            Ok(PortMatch::Range {
                protocol,
                start,
                end,
            })
        }
        (Some(IntOrString::String(name)), None) => Ok(PortMatch::Named(name.clone())),
        (Some(IntOrString::String(_)), Some(_)) => {
            bail!("endPort may not be used with a named port")
        }
        (None, Some(_)) => bail!("endPort requires a port"),
    }
}
