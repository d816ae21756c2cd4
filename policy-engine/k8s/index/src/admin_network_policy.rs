use crate::Index;
use anyhow::{bail, Context, Result};
use policy_engine_core::{
    Action, AdminPolicy, DomainMatch, IpNet, NetworkMatch, Peer, PortMatch, Rule, Subject,
};
use policy_engine_k8s_api::{
    policy::{self as api, AdminNetworkPolicyAction, Cidr},
    ResourceExt,
};

impl kubert::index::IndexClusterResource<api::AdminNetworkPolicy> for Index {
    fn apply(&mut self, policy: api::AdminNetworkPolicy) {
        let name = policy.name_any();
        if let Err(error) = self.apply_admin_network_policy(policy) {
            tracing::warn!(%name, %error, "Failed to apply AdminNetworkPolicy");
        }
    }

    fn delete(&mut self, name: String) {
        self.delete_admin_network_policy(&name);
    }
}

/// Converts an `AdminNetworkPolicy` resource into an admin policy.
///
/// Only a missing name fails conversion. Clauses that cannot be interpreted are logged and
/// converted to fail-closed variants.
pub fn convert(policy: api::AdminNetworkPolicy) -> Result<AdminPolicy> {
    let name = policy
        .metadata
        .name
        .context("AdminNetworkPolicy must have a name")?;
    let spec = policy.spec;

    let ingress = spec
        .ingress
        .into_iter()
        .enumerate()
        .map(|(idx, rule)| {
            ingress_rule(
                &name,
                idx,
                rule.name,
                admin_action(rule.action),
                rule.from,
                rule.ports,
            )
        })
        .collect();
    let egress = spec
        .egress
        .into_iter()
        .enumerate()
        .map(|(idx, rule)| {
            egress_rule(
                &name,
                idx,
                rule.name,
                admin_action(rule.action),
                rule.to,
                rule.ports,
            )
        })
        .collect();

    Ok(AdminPolicy {
        subject: subject(&name, spec.subject),
        name,
        priority: spec.priority,
        ingress,
        egress,
    })
}

fn admin_action(action: AdminNetworkPolicyAction) -> Action {
    match action {
        AdminNetworkPolicyAction::Allow => Action::Allow,
        AdminNetworkPolicyAction::Deny => Action::Deny,
        AdminNetworkPolicyAction::Pass => Action::Pass,
    }
}

pub(crate) fn subject(policy: &str, subject: api::Subject) -> Subject {
    match subject {
        api::Subject {
            namespaces: Some(namespaces),
            pods: None,
        } => Subject::Namespaces(namespaces),
        api::Subject {
            namespaces: None,
            pods: Some(pods),
        } => Subject::Pods {
            namespaces: pods.namespace_selector,
            pods: pods.pod_selector,
        },
        _ => {
            tracing::warn!(
                %policy,
                "Subject must set exactly one of namespaces or pods; selecting nothing"
            );
            Subject::Unknown
        }
    }
}

pub(crate) fn ingress_rule(
    policy: &str,
    idx: usize,
    name: Option<String>,
    action: Action,
    from: Vec<api::IngressPeer>,
    ports: Option<Vec<api::Port>>,
) -> Rule {
    let peers = from
        .into_iter()
        .map(|peer| {
            ingress_peer(peer).unwrap_or_else(|error| {
                tracing::warn!(%policy, rule = idx, %error, "Invalid ingress peer");
                Peer::Unknown
            })
        })
        .collect();
    Rule {
        name,
        action,
        peers,
        ports: ports_of(policy, idx, ports),
    }
}

pub(crate) fn egress_rule(
    policy: &str,
    idx: usize,
    name: Option<String>,
    action: Action,
    to: Vec<api::EgressPeer>,
    ports: Option<Vec<api::Port>>,
) -> Rule {
    let peers = to
        .into_iter()
        .map(|peer| {
            egress_peer(peer).unwrap_or_else(|error| {
                tracing::warn!(%policy, rule = idx, %error, "Invalid egress peer");
                Peer::Unknown
            })
        })
        .collect();
    Rule {
        name,
        action,
        peers,
        ports: ports_of(policy, idx, ports),
    }
}

fn ingress_peer(peer: api::IngressPeer) -> Result<Peer> {
    match peer {
        api::IngressPeer {
            namespaces: Some(namespaces),
            pods: None,
        } => Ok(Peer::Namespaces(namespaces)),
        api::IngressPeer {
            namespaces: None,
            pods: Some(pods),
        } => Ok(Peer::Pods {
            namespaces: pods.namespace_selector,
            pods: pods.pod_selector,
        }),
        _ => bail!("ingress peers must set exactly one of namespaces or pods"),
    }
}

fn egress_peer(peer: api::EgressPeer) -> Result<Peer> {
    let api::EgressPeer {
        namespaces,
        pods,
        nodes,
        networks,
        domain_names,
    } = peer;
    match (namespaces, pods, nodes, networks, domain_names) {
        (Some(namespaces), None, None, None, None) => Ok(Peer::Namespaces(namespaces)),
        (None, Some(pods), None, None, None) => Ok(Peer::Pods {
            namespaces: pods.namespace_selector,
            pods: pods.pod_selector,
        }),
        (None, None, Some(nodes), None, None) => Ok(Peer::Nodes(nodes)),
        (None, None, None, Some(networks), None) => {
            let nets = networks
                .iter()
                .map(|net| network(net, None))
                .collect::<Result<Vec<_>>>()?;
            Ok(Peer::Networks(nets))
        }
        (None, None, None, None, Some(names)) => {
            let names = names
                .iter()
                .map(|name| name.parse::<DomainMatch>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Peer::DomainNames(names))
        }
        _ => bail!(
            "egress peers must set exactly one of namespaces, pods, nodes, networks or domainNames"
        ),
    }
}

/// Parses a CIDR (or a bare address) and the blocks excluded from it.
pub(crate) fn network(net: &str, except: Option<&[String]>) -> Result<NetworkMatch> {
    let net = net.parse::<Cidr>()?;
    let except = except
        .unwrap_or_default()
        .iter()
        .map(|ex| ex.parse::<Cidr>().map(IpNet::from))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid exception to {net}"))?;
    Ok(NetworkMatch {
        net: net.into(),
        except,
    })
}

/// An empty port list is treated as if no ports were listed.
fn ports_of(policy: &str, idx: usize, ports: Option<Vec<api::Port>>) -> Option<Vec<PortMatch>> {
    let ports = ports.filter(|ports| !ports.is_empty())?;
    let ports = ports
        .into_iter()
        .map(|port| {
            port_match(port).unwrap_or_else(|error| {
                tracing::warn!(%policy, rule = idx, %error, "Invalid port");
                PortMatch::Unknown
            })
        })
        .collect();
    Some(ports)
}

fn port_match(port: api::Port) -> Result<PortMatch> {
    match port {
        api::Port {
            port_number: Some(api::PortNumber { protocol, port }),
            named_port: None,
            port_range: None,
        } => Ok(PortMatch::Number {
            protocol,
            port: port_number(port)?,
        }),
        api::Port {
            port_number: None,
            named_port: Some(name),
            port_range: None,
        } => Ok(PortMatch::Named(name)),
        api::Port {
            port_number: None,
            named_port: None,
            port_range: Some(api::PortRange {
                protocol,
                start,
                end,
            }),
        } => {
            let (start, end) = (port_number(start)?, port_number(end)?);
            if start >= end {
                bail!("port range start {start} must be less than its end {end}");
            }
            Ok(PortMatch::Range {
                protocol,
                start,
                end,
            })
        }
        _ => bail!("ports must set exactly one of portNumber, namedPort or portRange"),
    }
}

pub(crate) fn port_number(port: i32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(port),
        _ => bail!("invalid port number: {port}"),
    }
}
