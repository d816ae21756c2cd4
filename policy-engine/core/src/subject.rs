use crate::endpoint::Endpoint;
use policy_engine_k8s_api::labels::Selector;
use std::fmt;

/// The pods a policy governs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    /// All pods in the selected namespaces.
    Namespaces(Selector),

    /// Selected pods in the selected namespaces.
    Pods { namespaces: Selector, pods: Selector },

    /// The subject could not be interpreted and selects nothing.
    Unknown,
}

// === impl Subject ===

impl Subject {
    /// Returns true if the subject selects the endpoint.
    ///
    /// Only in-cluster pods are selectable; host-networked pods, nodes and external addresses never
    /// are.
    pub fn selects(&self, endpoint: &Endpoint) -> bool {
        let Some(pod) = endpoint.selectable_pod() else {
            return false;
        };
        match self {
            Self::Namespaces(ns) => ns.matches(&pod.namespace.labels),
            Self::Pods { namespaces, pods } => {
                namespaces.matches(&pod.namespace.labels) && pods.matches(&pod.labels)
            }
            Self::Unknown => false,
        }
    }

    /// A canonical key identifying the set of pods the subject selects.
    ///
    /// Subjects with equal keys select the same pods, regardless of how their selectors were
    /// written.
    pub fn key(&self) -> String {
        match self {
            Self::Namespaces(ns) => format!("namespaces[{}]", ns.canonical()),
            Self::Pods { namespaces, pods } => {
                format!("namespaces[{}]/pods[{}]", namespaces.canonical(), pods.canonical())
            }
            Self::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{External, Namespace, Workload};
    use policy_engine_k8s_api::labels::{Expression, Labels, Operator};

    fn pod(ns: &'static str, labels: Labels) -> Endpoint {
        Endpoint::Pod(Workload::new(Namespace::new(ns, Labels::default()), "pod-0", labels))
    }

    #[test]
    fn selects_pods() {
        let subject = Subject::Pods {
            namespaces: Selector::default(),
            pods: Selector::from_iter(Some(("app", "web"))),
        };
        assert!(subject.selects(&pod("ns-0", Labels::from_iter(Some(("app", "web"))))));
        assert!(!subject.selects(&pod("ns-0", Labels::from_iter(Some(("app", "db"))))));
    }

    #[test]
    fn namespaces_are_selected_by_name_label() {
        let subject = Subject::Namespaces(Selector::from_iter(Some((
            "kubernetes.io/metadata.name",
            "gryffindor",
        ))));
        assert!(subject.selects(&pod("gryffindor", Labels::default())));
        assert!(!subject.selects(&pod("slytherin", Labels::default())));
    }

    #[test]
    fn never_selects_host_network_or_external() {
        let subject = Subject::Namespaces(Selector::default());
        let Endpoint::Pod(w) = pod("ns-0", Labels::default()) else {
            unreachable!()
        };
        assert!(!subject.selects(&Endpoint::Pod(w.host_network())));
        assert!(!subject.selects(&Endpoint::External(External::new(
            "192.0.2.1".parse().unwrap()
        ))));
    }

    #[test]
    fn unknown_selects_nothing() {
        assert!(!Subject::Unknown.selects(&pod("ns-0", Labels::default())));
    }

    #[test]
    fn keys_are_canonical() {
        let a = Subject::Pods {
            namespaces: Selector::from_iter(vec![("b", "2"), ("a", "1")]),
            pods: Selector::default(),
        };
        let b = Subject::Pods {
            namespaces: Selector::from_iter(vec![
                Expression::new("a", Operator::In, ["1"]),
                Expression::new("b", Operator::In, ["2"]),
            ]),
            pods: Selector::default(),
        };
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), "namespaces[a=1,b=2]/pods[]");
        assert_ne!(
            a.key(),
            Subject::Namespaces(Selector::from_iter(vec![("b", "2"), ("a", "1")])).key()
        );
    }
}
