use crate::{
    effect::Verdict,
    endpoint::{Endpoint, Flow},
    policy::{Direction, Rule},
    port::PortTarget,
    subject::Subject,
};

// === impl Rule ===

impl Rule {
    /// Evaluates the rule's peers and ports against the flow's remote endpoint.
    ///
    /// Returns `Verdict::None` unless some peer and some port (if ports are listed) match.
    pub fn verdict(&self, remote: &Endpoint, port: &PortTarget<'_>) -> Verdict {
        if !self.peers.iter().any(|p| p.matches(remote, self.action)) {
            return Verdict::None;
        }

        if let Some(ports) = self.ports.as_ref() {
            if !ports.iter().any(|p| p.matches(port, self.action)) {
                return Verdict::None;
            }
        }

        self.action.into()
    }
}

/// Evaluates a single rule of a policy with the given subject against a flow.
///
/// Rules only apply when the subject selects the flow's local endpoint; policies cannot constrain
/// endpoints outside of the cluster.
pub fn evaluate(subject: &Subject, rule: &Rule, direction: Direction, flow: &Flow) -> Verdict {
    if !subject.selects(flow.local(direction)) {
        return Verdict::None;
    }
    rule.verdict(flow.remote(direction), &PortTarget::from(flow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        endpoint::{ContainerPort, External, Namespace, Workload},
        peer::Peer,
        policy::Action,
        port::PortMatch,
    };
    use policy_engine_k8s_api::{
        labels::{Labels, Selector},
        policy::Protocol,
    };

    fn pod(ns: &str) -> Workload {
        Workload::new(Namespace::new(ns, Labels::default()), "pod-0", Labels::default())
            .with_ips(Some("10.0.0.1".parse().unwrap()))
    }

    fn from_ns(action: Action, ns: &'static str) -> Rule {
        Rule {
            name: None,
            action,
            peers: vec![Peer::Namespaces(Selector::from_iter(Some((
                "kubernetes.io/metadata.name",
                ns,
            ))))],
            ports: None,
        }
    }

    #[test]
    fn subject_must_select_local_endpoint() {
        let subject = Subject::Namespaces(Selector::from_iter(Some((
            "kubernetes.io/metadata.name",
            "gryffindor",
        ))));
        let rule = from_ns(Action::Deny, "ravenclaw");

        let flow = Flow::new(pod("ravenclaw"), pod("gryffindor"), Protocol::Tcp, 80);
        assert_eq!(evaluate(&subject, &rule, Direction::Ingress, &flow), Verdict::Deny);
        // Egress applies to the source, which the subject does not select.
        assert_eq!(evaluate(&subject, &rule, Direction::Egress, &flow), Verdict::None);
    }

    #[test]
    fn external_local_endpoint_is_never_constrained() {
        let subject = Subject::Namespaces(Selector::default());
        let rule = Rule {
            peers: vec![Peer::Any],
            ..from_ns(Action::Deny, "ravenclaw")
        };
        let flow = Flow::new(
            pod("ravenclaw"),
            External::new("192.0.2.1".parse().unwrap()),
            Protocol::Tcp,
            443,
        );
        assert_eq!(evaluate(&subject, &rule, Direction::Ingress, &flow), Verdict::None);
        assert_eq!(evaluate(&subject, &rule, Direction::Egress, &flow), Verdict::Deny);
    }

    #[test]
    fn empty_peers_match_nothing() {
        let rule = Rule {
            peers: vec![],
            ..from_ns(Action::Deny, "ravenclaw")
        };
        let flow = Flow::new(pod("ravenclaw"), pod("gryffindor"), Protocol::Tcp, 80);
        assert_eq!(
            evaluate(
                &Subject::Namespaces(Selector::default()),
                &rule,
                Direction::Ingress,
                &flow
            ),
            Verdict::None
        );
    }

    #[test]
    fn ports_restrict_matches() {
        let rule = Rule {
            ports: Some(vec![PortMatch::Named("web".to_string())]),
            ..from_ns(Action::Allow, "ravenclaw")
        };
        let dst = pod("gryffindor").with_ports(Some(ContainerPort::new(
            Some("web"),
            Protocol::Tcp,
            80,
        )));
        let subject = Subject::Namespaces(Selector::default());

        let flow = Flow::new(pod("ravenclaw"), dst.clone(), Protocol::Tcp, 80);
        assert_eq!(evaluate(&subject, &rule, Direction::Ingress, &flow), Verdict::Allow);

        let flow = Flow::new(pod("ravenclaw"), dst, Protocol::Tcp, 8080);
        assert_eq!(evaluate(&subject, &rule, Direction::Ingress, &flow), Verdict::None);
    }
}
