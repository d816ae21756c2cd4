use crate::{
    endpoint::{ContainerPort, Endpoint, Flow},
    policy::Action,
};
use policy_engine_k8s_api::policy::Protocol;

/// Describes the destination ports a rule applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortMatch {
    Number {
        protocol: Protocol,
        port: u16,
    },

    /// An inclusive range of ports.
    Range {
        protocol: Protocol,
        start: u16,
        end: u16,
    },

    /// A container port name on the destination pod.
    Named(String),

    /// All ports of a protocol.
    Protocol(Protocol),

    /// The port clause could not be interpreted.
    Unknown,
}

/// The destination port of a flow, as seen by port clauses.
#[derive(Copy, Clone, Debug)]
pub struct PortTarget<'a> {
    pub protocol: Protocol,
    pub port: u16,

    /// The port's name, as described by the flow.
    pub name: Option<&'a str>,

    /// The ports declared by the destination, when it is a pod.
    pub declared: Option<&'a [ContainerPort]>,
}

// === impl PortMatch ===

impl PortMatch {
    pub fn matches(&self, target: &PortTarget<'_>, action: Action) -> bool {
        match self {
            Self::Number { protocol, port } => {
                *protocol == target.protocol && *port == target.port
            }
            Self::Range {
                protocol,
                start,
                end,
            } => *protocol == target.protocol && (*start..=*end).contains(&target.port),
            Self::Named(name) => target.has_name(name),
            Self::Protocol(protocol) => *protocol == target.protocol,
            Self::Unknown => action.matches_unknown(),
        }
    }
}

// === impl PortTarget ===

impl<'a> PortTarget<'a> {
    fn has_name(&self, name: &str) -> bool {
        match self.declared {
            // Named ports resolve against the destination pod's container ports.
            Some(ports) => ports.iter().any(|p| {
                p.name.as_deref() == Some(name)
                    && p.protocol == self.protocol
                    && p.port == self.port
            }),
            None => self.name == Some(name),
        }
    }
}

impl<'a> From<&'a Flow> for PortTarget<'a> {
    fn from(flow: &'a Flow) -> Self {
        let declared = match &flow.destination {
            Endpoint::Pod(pod) => Some(pod.ports.as_slice()),
            Endpoint::Node(_) | Endpoint::External(_) => None,
        };
        Self {
            protocol: flow.protocol,
            port: flow.port,
            name: flow.port_name.as_deref(),
            declared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(protocol: Protocol, port: u16) -> PortTarget<'static> {
        PortTarget {
            protocol,
            port,
            name: None,
            declared: None,
        }
    }

    #[test]
    fn numbers_and_ranges() {
        let p80 = PortMatch::Number {
            protocol: Protocol::Tcp,
            port: 80,
        };
        assert!(p80.matches(&target(Protocol::Tcp, 80), Action::Allow));
        assert!(!p80.matches(&target(Protocol::Udp, 80), Action::Allow));
        assert!(!p80.matches(&target(Protocol::Tcp, 8080), Action::Allow));

        let range = PortMatch::Range {
            protocol: Protocol::Sctp,
            start: 9000,
            end: 9010,
        };
        assert!(range.matches(&target(Protocol::Sctp, 9000), Action::Deny));
        assert!(range.matches(&target(Protocol::Sctp, 9010), Action::Deny));
        assert!(!range.matches(&target(Protocol::Sctp, 9011), Action::Deny));
        assert!(!range.matches(&target(Protocol::Tcp, 9005), Action::Deny));
    }

    #[test]
    fn named_ports_resolve_against_declared_ports() {
        let declared = [ContainerPort::new(Some("web"), Protocol::Tcp, 80)];
        let web = PortMatch::Named("web".to_string());
        let at = |port| PortTarget {
            protocol: Protocol::Tcp,
            port,
            name: None,
            declared: Some(&declared[..]),
        };
        assert!(web.matches(&at(80), Action::Allow));
        assert!(!web.matches(&at(8080), Action::Allow));

        let udp = PortTarget {
            protocol: Protocol::Udp,
            ..at(80)
        };
        assert!(!web.matches(&udp, Action::Allow));
    }

    #[test]
    fn named_ports_use_flow_name_without_declarations() {
        let web = PortMatch::Named("web".to_string());
        let named = PortTarget {
            name: Some("web"),
            ..target(Protocol::Tcp, 80)
        };
        assert!(web.matches(&named, Action::Allow));
        assert!(!web.matches(&target(Protocol::Tcp, 80), Action::Allow));
    }

    #[test]
    fn unknown_ports_fail_closed() {
        let t = target(Protocol::Tcp, 80);
        assert!(!PortMatch::Unknown.matches(&t, Action::Allow));
        assert!(PortMatch::Unknown.matches(&t, Action::Deny));
    }
}
