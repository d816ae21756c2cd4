use crate::{
    domain_match::DomainMatch,
    endpoint::{Endpoint, External},
    network_match::NetworkMatch,
    policy::Action,
};
use policy_engine_k8s_api::labels::Selector;

/// Describes the remote endpoints a rule applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Peer {
    /// All pods in the selected namespaces.
    Namespaces(Selector),

    /// Selected pods in the selected namespaces.
    Pods { namespaces: Selector, pods: Selector },

    /// The IPs of the selected nodes.
    Nodes(Selector),

    /// Any endpoint with an address in one of the networks.
    Networks(Vec<NetworkMatch>),

    /// External endpoints resolved from a matching name.
    DomainNames(Vec<DomainMatch>),

    /// Every endpoint. Only namespaced policies, whose rules list no peers, use this.
    Any,

    /// The peer could not be interpreted.
    Unknown,
}

// === impl Peer ===

impl Peer {
    /// Returns true if the peer clause selects `remote` in a rule with the given action.
    ///
    /// An `Unknown` peer matches nothing in an `Allow` rule and everything in `Deny` and `Pass`
    /// rules.
    pub fn matches(&self, remote: &Endpoint, action: Action) -> bool {
        match self {
            Self::Namespaces(namespaces) => remote
                .selectable_pod()
                .is_some_and(|pod| namespaces.matches(&pod.namespace.labels)),

            Self::Pods { namespaces, pods } => remote.selectable_pod().is_some_and(|pod| {
                namespaces.matches(&pod.namespace.labels) && pods.matches(&pod.labels)
            }),

            Self::Nodes(nodes) => match remote {
                Endpoint::Node(node) => nodes.matches(&node.labels),
                _ => false,
            },

            Self::Networks(nets) => remote
                .ips()
                .iter()
                .any(|ip| nets.iter().any(|net| net.contains(ip))),

            Self::DomainNames(names) => match remote {
                Endpoint::External(External {
                    fqdn: Some(fqdn), ..
                }) => names.iter().any(|name| name.matches(fqdn)),
                _ => false,
            },

            Self::Any => true,

            Self::Unknown => action.matches_unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Namespace, Node, Workload};
    use policy_engine_k8s_api::labels::Labels;

    fn pod(ns: &str, labels: Labels, ip: &str) -> Workload {
        Workload::new(Namespace::new(ns, Labels::default()), "pod-0", labels)
            .with_ips(Some(ip.parse().unwrap()))
    }

    fn ns_selector(ns: &'static str) -> Selector {
        Selector::from_iter(Some(("kubernetes.io/metadata.name", ns)))
    }

    #[test]
    fn namespaces_match_pods_only() {
        let peer = Peer::Namespaces(ns_selector("ravenclaw"));
        let rc = Endpoint::Pod(pod("ravenclaw", Labels::default(), "10.0.0.1"));
        let hp = Endpoint::Pod(pod("hufflepuff", Labels::default(), "10.0.0.2"));
        assert!(peer.matches(&rc, Action::Allow));
        assert!(!peer.matches(&hp, Action::Allow));

        let host = Endpoint::Pod(pod("ravenclaw", Labels::default(), "10.0.0.3").host_network());
        assert!(!peer.matches(&host, Action::Allow), "host-networked pods");

        let ext = Endpoint::External(External::new("192.0.2.1".parse().unwrap()));
        assert!(!peer.matches(&ext, Action::Deny));
    }

    #[test]
    fn pods_require_both_selectors() {
        let peer = Peer::Pods {
            namespaces: ns_selector("ravenclaw"),
            pods: Selector::from_iter(Some(("app", "web"))),
        };
        let web = Endpoint::Pod(pod(
            "ravenclaw",
            Labels::from_iter(Some(("app", "web"))),
            "10.0.0.1",
        ));
        let db = Endpoint::Pod(pod(
            "ravenclaw",
            Labels::from_iter(Some(("app", "db"))),
            "10.0.0.2",
        ));
        let other = Endpoint::Pod(pod(
            "slytherin",
            Labels::from_iter(Some(("app", "web"))),
            "10.0.0.3",
        ));
        assert!(peer.matches(&web, Action::Allow));
        assert!(!peer.matches(&db, Action::Allow));
        assert!(!peer.matches(&other, Action::Allow));
    }

    #[test]
    fn nodes_match_node_endpoints() {
        let peer = Peer::Nodes(Selector::from_iter(Some((
            "node-role.kubernetes.io/control-plane",
            "",
        ))));
        let cp = Endpoint::Node(Node {
            name: "cp-0".to_string(),
            labels: Labels::from_iter(Some(("node-role.kubernetes.io/control-plane", ""))),
            ips: vec!["172.18.0.2".parse().unwrap()],
        });
        let worker = Endpoint::Node(Node {
            name: "worker-0".to_string(),
            labels: Labels::default(),
            ips: vec!["172.18.0.3".parse().unwrap()],
        });
        assert!(peer.matches(&cp, Action::Allow));
        assert!(!peer.matches(&worker, Action::Allow));
        assert!(!Peer::Nodes(Selector::default())
            .matches(&Endpoint::Pod(pod("ns", Labels::default(), "10.0.0.1")), Action::Deny));
    }

    #[test]
    fn networks_match_any_address() {
        let peer = Peer::Networks(vec![
            NetworkMatch::from("0.0.0.0/0".parse::<crate::IpNet>().unwrap()),
        ]);
        let p = Endpoint::Pod(pod("ns", Labels::default(), "10.0.0.1"));
        let ext = Endpoint::External(External::new("192.0.2.1".parse().unwrap()));
        let v6 = Endpoint::External(External::new("2001:db8::1".parse().unwrap()));
        assert!(peer.matches(&p, Action::Deny));
        assert!(peer.matches(&ext, Action::Deny));
        assert!(!peer.matches(&v6, Action::Deny));
    }

    #[test]
    fn domain_names_require_resolution() {
        let peer = Peer::DomainNames(vec!["*.kubernetes.io".parse().unwrap()]);
        let resolved = Endpoint::External(
            External::new("192.0.2.1".parse().unwrap()).with_fqdn("docs.kubernetes.io"),
        );
        let unresolved = Endpoint::External(External::new("192.0.2.1".parse().unwrap()));
        assert!(peer.matches(&resolved, Action::Allow));
        assert!(!peer.matches(&unresolved, Action::Allow));
    }

    #[test]
    fn unknown_peers_fail_closed() {
        let p = Endpoint::Pod(pod("ns", Labels::default(), "10.0.0.1"));
        assert!(!Peer::Unknown.matches(&p, Action::Allow));
        assert!(Peer::Unknown.matches(&p, Action::Deny));
        assert!(Peer::Unknown.matches(&p, Action::Pass));
    }
}
