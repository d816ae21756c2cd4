use crate::{
    core::{Direction, DomainMatch},
    k8s::policy as api,
};
use std::fmt;
use thiserror::Error;

pub const MAX_PRIORITY: i32 = 1000;
pub const MAX_RULES: usize = 100;
pub const MAX_RULE_NAME_LEN: usize = 100;
pub const MAX_NETWORKS: usize = 25;
pub const MAX_DOMAIN_NAMES: usize = 25;

/// Identifies a rule within a policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RuleRef {
    pub direction: Direction,
    pub index: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("priority {0} must be between 0 and 1000")]
    Priority(i32),

    #[error("policy has {0} rules; at most 100 are allowed")]
    TooManyRules(usize),

    #[error("subject must set exactly one of namespaces or pods")]
    Subject,

    #[error("BaselineAdminNetworkPolicy must be named \"default\", not {0:?}")]
    BaselineName(String),

    #[error("{rule}: {error}")]
    Rule { rule: RuleRef, error: RuleError },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule name exceeds 100 characters")]
    NameTooLong,

    #[error("rules must list at least one peer")]
    NoPeers,

    #[error("peers must set exactly one of {0}")]
    Peer(&'static str),

    #[error("at most 25 networks may be listed")]
    TooManyNetworks,

    #[error("{0}")]
    Network(#[from] api::CidrParseError),

    #[error("at most 25 domain names may be listed")]
    TooManyDomainNames,

    #[error("invalid domain name pattern {0:?}")]
    DomainName(String),

    #[error("domain names may only be used in Allow rules")]
    DomainNameAction,

    #[error("domain names are not supported in baseline policies")]
    DomainNameInBaseline,

    #[error("ports must set exactly one of portNumber, namedPort or portRange")]
    Port,

    #[error("port {0} must be between 1 and 65535")]
    PortNumber(i32),

    #[error("port range start {start} must be less than its end {end}")]
    PortRange { start: i32, end: i32 },

    #[error("named ports may not be used with nodes, networks or domainNames peers")]
    NamedPort,
}

// === impl RuleRef ===

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rule {}", self.direction, self.index)
    }
}

pub(crate) fn validate_priority(priority: i32) -> Result<(), PolicyError> {
    if !(0..=MAX_PRIORITY).contains(&priority) {
        return Err(PolicyError::Priority(priority));
    }
    Ok(())
}

pub(crate) fn validate_rule_count(ingress: usize, egress: usize) -> Result<(), PolicyError> {
    let rules = ingress + egress;
    if rules > MAX_RULES {
        return Err(PolicyError::TooManyRules(rules));
    }
    Ok(())
}

pub(crate) fn validate_subject(subject: &api::Subject) -> Result<(), PolicyError> {
    match (&subject.namespaces, &subject.pods) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(PolicyError::Subject),
    }
}

pub(crate) fn validate_rule_name(name: Option<&str>) -> Result<(), RuleError> {
    if name.is_some_and(|n| n.chars().count() > MAX_RULE_NAME_LEN) {
        return Err(RuleError::NameTooLong);
    }
    Ok(())
}

pub(crate) fn validate_ingress_peers(peers: &[api::IngressPeer]) -> Result<(), RuleError> {
    if peers.is_empty() {
        return Err(RuleError::NoPeers);
    }
    for peer in peers {
        if peer.namespaces.is_some() == peer.pods.is_some() {
            return Err(RuleError::Peer("namespaces or pods"));
        }
    }
    Ok(())
}

/// Validates egress peers. Named ports may not be combined with peers that aren't pods.
pub(crate) fn validate_egress_peers(
    peers: &[api::EgressPeer],
    named_port: bool,
) -> Result<(), RuleError> {
    if peers.is_empty() {
        return Err(RuleError::NoPeers);
    }
    for peer in peers {
        let set = [
            peer.namespaces.is_some(),
            peer.pods.is_some(),
            peer.nodes.is_some(),
            peer.networks.is_some(),
            peer.domain_names.is_some(),
        ];
        if set.iter().filter(|s| **s).count() != 1 {
            return Err(RuleError::Peer(
                "namespaces, pods, nodes, networks or domainNames",
            ));
        }

        if named_port
            && (peer.nodes.is_some() || peer.networks.is_some() || peer.domain_names.is_some())
        {
            return Err(RuleError::NamedPort);
        }

        if let Some(networks) = peer.networks.as_ref() {
            if networks.len() > MAX_NETWORKS {
                return Err(RuleError::TooManyNetworks);
            }
            for net in networks {
                net.parse::<api::Cidr>()?;
            }
        }

        if let Some(names) = peer.domain_names.as_ref() {
            if names.len() > MAX_DOMAIN_NAMES {
                return Err(RuleError::TooManyDomainNames);
            }
            for name in names {
                validate_domain_name(name)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_domain_name(name: &str) -> Result<(), RuleError> {
    name.parse::<DomainMatch>()
        .map(|_| ())
        .map_err(|_| RuleError::DomainName(name.to_string()))
}

/// Validates a rule's ports, returning true if any port is named.
pub(crate) fn validate_ports(ports: &[api::Port]) -> Result<bool, RuleError> {
    let mut named = false;
    for port in ports {
        match port {
            api::Port {
                port_number: Some(api::PortNumber { port, .. }),
                named_port: None,
                port_range: None,
            } => validate_port_number(*port)?,
            api::Port {
                port_number: None,
                named_port: Some(_),
                port_range: None,
            } => named = true,
            api::Port {
                port_number: None,
                named_port: None,
                port_range: Some(api::PortRange { start, end, .. }),
            } => {
                validate_port_number(*start)?;
                validate_port_number(*end)?;
                if start >= end {
                    return Err(RuleError::PortRange {
                        start: *start,
                        end: *end,
                    });
                }
            }
            _ => return Err(RuleError::Port),
        }
    }
    Ok(named)
}

fn validate_port_number(port: i32) -> Result<(), RuleError> {
    if !(1..=65535).contains(&port) {
        return Err(RuleError::PortNumber(port));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_domain_names() {
        for name in [
            "example.com",
            "*.example.com",
            "api.example.com.",
            "my_svc.example-1.com",
            "A.B",
        ] {
            assert!(validate_domain_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_domain_names() {
        for name in [
            "",
            "com",
            "*",
            "*.com",
            "api.*.example.com",
            "**.example.com",
            "-api.example.com",
            "api-.example.com",
            "example..com",
            "exa mple.com",
        ] {
            assert_eq!(
                validate_domain_name(name),
                Err(RuleError::DomainName(name.to_string())),
                "{name} should be invalid"
            );
        }
    }

    #[test]
    fn priorities() {
        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(MAX_PRIORITY).is_ok());
        assert_eq!(validate_priority(-1), Err(PolicyError::Priority(-1)));
        assert_eq!(validate_priority(1001), Err(PolicyError::Priority(1001)));
    }

    #[test]
    fn ports() {
        let number = |port| api::Port {
            port_number: Some(api::PortNumber {
                protocol: api::Protocol::Tcp,
                port,
            }),
            ..Default::default()
        };
        let range = |start, end| api::Port {
            port_range: Some(api::PortRange {
                protocol: api::Protocol::Udp,
                start,
                end,
            }),
            ..Default::default()
        };
        let named = api::Port {
            named_port: Some("web".to_string()),
            ..Default::default()
        };

        assert_eq!(validate_ports(&[]), Ok(false));
        assert_eq!(validate_ports(&[number(80), range(1, 2)]), Ok(false));
        assert_eq!(validate_ports(&[number(80), named.clone()]), Ok(true));
        assert_eq!(
            validate_ports(&[number(0)]),
            Err(RuleError::PortNumber(0))
        );
        assert_eq!(
            validate_ports(&[number(65536)]),
            Err(RuleError::PortNumber(65536))
        );
        assert_eq!(
            validate_ports(&[range(80, 80)]),
            Err(RuleError::PortRange { start: 80, end: 80 })
        );
        assert_eq!(
            validate_ports(&[api::Port::default()]),
            Err(RuleError::Port)
        );
        assert_eq!(
            validate_ports(&[api::Port {
                named_port: Some("web".to_string()),
                ..number(80)
            }]),
            Err(RuleError::Port)
        );
    }

    #[test]
    fn rule_refs_display() {
        let rule = RuleRef {
            direction: Direction::Egress,
            index: 3,
        };
        assert_eq!(
            PolicyError::Rule {
                rule,
                error: RuleError::NoPeers
            }
            .to_string(),
            "egress rule 3: rules must list at least one peer"
        );
    }
}
