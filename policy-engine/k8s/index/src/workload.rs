//! Conversion of `Namespace`, `Pod` and `Node` objects into flow endpoints.

use anyhow::{bail, Context, Result};
use policy_engine_core::{ContainerPort, Namespace, Node, Protocol, Workload};
use policy_engine_k8s_api as k8s;
use std::net::IpAddr;

/// Describes a namespace. The namespace's name label is always set.
pub fn namespace(ns: &k8s::Namespace) -> Result<Namespace> {
    let name = ns
        .metadata
        .name
        .as_deref()
        .context("Namespace must have a name")?;
    Ok(Namespace::new(name, ns.metadata.labels.clone()))
}

/// Describes a pod in the given namespace, including its IPs and declared container ports.
pub fn pod(namespace: Namespace, pod: &k8s::Pod) -> Result<Workload> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .context("Pod must have a name")?;
    if let Some(ns) = pod.metadata.namespace.as_deref() {
        if ns != namespace.name {
            bail!(
                "pod {name} is in namespace {ns}, not {}",
                namespace.name
            );
        }
    }

    let ips = pod_ips(pod).with_context(|| format!("invalid IP for pod {name}"))?;
    let spec = pod.spec.as_ref();
    let ports = spec
        .into_iter()
        .flat_map(|spec| spec.containers.iter())
        .flat_map(|c| c.ports.iter().flatten())
        .filter_map(|port| {
            container_port(port)
                .map_err(|error| tracing::debug!(pod = %name, %error, "Ignoring container port"))
                .ok()
        });

    let mut workload = Workload::new(namespace, name, pod.metadata.labels.clone())
        .with_ips(ips)
        .with_ports(ports);
    if spec.and_then(|s| s.host_network).unwrap_or(false) {
        workload = workload.host_network();
    }
    Ok(workload)
}

/// Describes a node by its reported addresses.
pub fn node(node: &k8s::Node) -> Result<Node> {
    let name = node
        .metadata
        .name
        .as_deref()
        .context("Node must have a name")?;
    let ips = node
        .status
        .iter()
        .flat_map(|status| status.addresses.iter().flatten())
        .filter(|addr| addr.type_ == "InternalIP" || addr.type_ == "ExternalIP")
        .map(|addr| {
            addr.address
                .parse::<IpAddr>()
                .with_context(|| format!("invalid address for node {name}: {}", addr.address))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Node {
        name: name.to_string(),
        labels: node.metadata.labels.clone().into(),
        ips,
    })
}

fn pod_ips(pod: &k8s::Pod) -> Result<Vec<IpAddr>> {
    let Some(status) = pod.status.as_ref() else {
        return Ok(vec![]);
    };

    let mut ips = Vec::new();
    for pod_ip in status.pod_ips.iter().flatten() {
        let ip: Option<String> = pod_ip.ip.clone().into();
        if let Some(ip) = ip {
            ips.push(ip.parse::<IpAddr>()?);
        }
    }
    if ips.is_empty() {
        if let Some(ip) = status.pod_ip.as_deref() {
            ips.push(ip.parse::<IpAddr>()?);
        }
    }
    Ok(ips)
}

fn container_port(port: &k8s::ContainerPort) -> Result<ContainerPort> {
    let protocol = port
        .protocol
        .as_deref()
        .map(str::parse::<Protocol>)
        .transpose()?
        .unwrap_or_default();
    let number = match u16::try_from(port.container_port) {
        Ok(p) if p > 0 => p,
        _ => bail!("invalid container port {}", port.container_port),
    };
    Ok(ContainerPort::new(port.name.as_deref(), protocol, number))
}
