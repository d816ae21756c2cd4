use crate::policy::Direction;
use policy_engine_k8s_api::{
    labels::{Labels, Map},
    policy::Protocol,
    NAMESPACE_NAME_LABEL,
};
use std::{net::IpAddr, slice};

/// A namespace and its labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,

    /// Always includes the `kubernetes.io/metadata.name` label.
    pub labels: Labels,
}

/// A container port declared by a pod.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerPort {
    pub name: Option<String>,
    pub protocol: Protocol,
    pub port: u16,
}

/// An in-cluster pod.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    pub namespace: Namespace,
    pub name: String,
    pub labels: Labels,
    pub ips: Vec<IpAddr>,

    /// Host-networked pods are never selected by subjects or pod/namespace peers.
    pub host_network: bool,
    pub ports: Vec<ContainerPort>,
}

/// A cluster node, addressed by its node IPs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub labels: Labels,
    pub ips: Vec<IpAddr>,
}

/// An address outside of the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct External {
    pub ip: IpAddr,

    /// The name the address was resolved from, if known. Domain-name peers only match external
    /// endpoints with a resolved name.
    pub fqdn: Option<String>,
}

/// One end of a flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Pod(Workload),
    Node(Node),
    External(External),
}

/// A single connection attempt between two endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flow {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub protocol: Protocol,
    pub port: u16,

    /// The name of the destination port, when the destination declares one.
    pub port_name: Option<String>,
}

// === impl Namespace ===

impl Namespace {
    pub fn new(name: impl ToString, labels: impl Into<Labels>) -> Self {
        let name = name.to_string();
        let labels: Labels = labels.into();
        let mut map: Map = labels.as_ref().clone();
        map.insert(NAMESPACE_NAME_LABEL.to_string(), name.clone());
        Self {
            name,
            labels: map.into(),
        }
    }
}

// === impl Workload ===

impl Workload {
    pub fn new(namespace: Namespace, name: impl ToString, labels: impl Into<Labels>) -> Self {
        Self {
            namespace,
            name: name.to_string(),
            labels: labels.into(),
            ips: vec![],
            host_network: false,
            ports: vec![],
        }
    }

    pub fn with_ips(mut self, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        self.ips = ips.into_iter().collect();
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = ContainerPort>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    pub fn host_network(mut self) -> Self {
        self.host_network = true;
        self
    }
}

// === impl ContainerPort ===

impl ContainerPort {
    pub fn new(name: Option<&str>, protocol: Protocol, port: u16) -> Self {
        Self {
            name: name.map(ToString::to_string),
            protocol,
            port,
        }
    }
}

// === impl External ===

impl External {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip, fqdn: None }
    }

    pub fn with_fqdn(mut self, fqdn: impl ToString) -> Self {
        self.fqdn = Some(fqdn.to_string());
        self
    }
}

// === impl Endpoint ===

impl Endpoint {
    /// Returns the endpoint's pod if it may be selected by label selectors.
    pub fn selectable_pod(&self) -> Option<&Workload> {
        match self {
            Self::Pod(pod) if !pod.host_network => Some(pod),
            _ => None,
        }
    }

    pub fn ips(&self) -> &[IpAddr] {
        match self {
            Self::Pod(pod) => &pod.ips,
            Self::Node(node) => &node.ips,
            Self::External(ext) => slice::from_ref(&ext.ip),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl From<Workload> for Endpoint {
    fn from(pod: Workload) -> Self {
        Self::Pod(pod)
    }
}

impl From<Node> for Endpoint {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<External> for Endpoint {
    fn from(ext: External) -> Self {
        Self::External(ext)
    }
}

// === impl Flow ===

impl Flow {
    pub fn new(
        source: impl Into<Endpoint>,
        destination: impl Into<Endpoint>,
        protocol: Protocol,
        port: u16,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            protocol,
            port,
            port_name: None,
        }
    }

    pub fn with_port_name(mut self, name: impl ToString) -> Self {
        self.port_name = Some(name.to_string());
        self
    }

    /// The endpoint policies in this direction are applied to: the destination of ingress traffic
    /// and the source of egress traffic.
    pub fn local(&self, direction: Direction) -> &Endpoint {
        match direction {
            Direction::Ingress => &self.destination,
            Direction::Egress => &self.source,
        }
    }

    /// The endpoint peers in this direction are matched against.
    pub fn remote(&self, direction: Direction) -> &Endpoint {
        match direction {
            Direction::Ingress => &self.source,
            Direction::Egress => &self.destination,
        }
    }
}
