use crate::{
    core::Direction,
    k8s::policy::{self as api, AdminNetworkPolicyAction},
    validation::{
        validate_egress_peers, validate_ingress_peers, validate_ports, validate_priority,
        validate_rule_count, validate_rule_name, validate_subject, PolicyError, RuleError, RuleRef,
    },
};

/// Rejects malformed policies before they are indexed.
#[derive(Clone, Debug, Default)]
pub struct Admission(());

pub trait Validate<T> {
    fn validate(&self, name: &str, spec: &T) -> Result<(), PolicyError>;
}

impl Validate<api::AdminNetworkPolicySpec> for Admission {
    fn validate(&self, _name: &str, spec: &api::AdminNetworkPolicySpec) -> Result<(), PolicyError> {
        validate_priority(spec.priority)?;
        validate_rule_count(spec.ingress.len(), spec.egress.len())?;
        validate_subject(&spec.subject)?;

        for (index, rule) in spec.ingress.iter().enumerate() {
            ingress_rule(rule.name.as_deref(), &rule.from, rule.ports.as_deref())
                .map_err(|error| rule_error(Direction::Ingress, index, error))?;
        }

        for (index, rule) in spec.egress.iter().enumerate() {
            let domain_names = if rule.action == AdminNetworkPolicyAction::Allow {
                Ok(())
            } else {
                Err(RuleError::DomainNameAction)
            };
            egress_rule(
                rule.name.as_deref(),
                &rule.to,
                rule.ports.as_deref(),
                domain_names,
            )
            .map_err(|error| rule_error(Direction::Egress, index, error))?;
        }

        Ok(())
    }
}

impl Validate<api::BaselineAdminNetworkPolicySpec> for Admission {
    fn validate(
        &self,
        name: &str,
        spec: &api::BaselineAdminNetworkPolicySpec,
    ) -> Result<(), PolicyError> {
        if name != api::BaselineAdminNetworkPolicy::NAME {
            return Err(PolicyError::BaselineName(name.to_string()));
        }
        validate_rule_count(spec.ingress.len(), spec.egress.len())?;
        validate_subject(&spec.subject)?;

        for (index, rule) in spec.ingress.iter().enumerate() {
            ingress_rule(rule.name.as_deref(), &rule.from, rule.ports.as_deref())
                .map_err(|error| rule_error(Direction::Ingress, index, error))?;
        }

        for (index, rule) in spec.egress.iter().enumerate() {
            egress_rule(
                rule.name.as_deref(),
                &rule.to,
                rule.ports.as_deref(),
                Err(RuleError::DomainNameInBaseline),
            )
            .map_err(|error| rule_error(Direction::Egress, index, error))?;
        }

        Ok(())
    }
}

fn rule_error(direction: Direction, index: usize, error: RuleError) -> PolicyError {
    PolicyError::Rule {
        rule: RuleRef { direction, index },
        error,
    }
}

fn ingress_rule(
    name: Option<&str>,
    from: &[api::IngressPeer],
    ports: Option<&[api::Port]>,
) -> Result<(), RuleError> {
    validate_rule_name(name)?;
    validate_ingress_peers(from)?;
    validate_ports(ports.unwrap_or_default())?;
    Ok(())
}

/// Validates an egress rule. `domain_names` is the outcome of using domain name peers in this rule.
fn egress_rule(
    name: Option<&str>,
    to: &[api::EgressPeer],
    ports: Option<&[api::Port]>,
    domain_names: Result<(), RuleError>,
) -> Result<(), RuleError> {
    validate_rule_name(name)?;
    let named_port = validate_ports(ports.unwrap_or_default())?;
    validate_egress_peers(to, named_port)?;
    if to.iter().any(|peer| peer.domain_names.is_some()) {
        domain_names?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(yaml: &str) -> Result<(), PolicyError> {
        let spec = serde_yaml::from_str::<api::AdminNetworkPolicySpec>(yaml)
            .expect("spec must deserialize");
        Admission::default().validate("test", &spec)
    }

    fn baseline(name: &str, yaml: &str) -> Result<(), PolicyError> {
        let spec = serde_yaml::from_str::<api::BaselineAdminNetworkPolicySpec>(yaml)
            .expect("spec must deserialize");
        Admission::default().validate(name, &spec)
    }

    #[test]
    fn accepts_valid_admin_policy() {
        admin(
            r#"
priority: 1000
subject:
  pods:
    namespaceSelector: {}
    podSelector:
      matchLabels:
        app: web
ingress:
- name: allow-monitoring
  action: Allow
  from:
  - namespaces:
      matchLabels:
        kubernetes.io/metadata.name: monitoring
  ports:
  - namedPort: metrics
egress:
- action: Allow
  to:
  - domainNames: ["*.example.com", "example.org."]
- action: Pass
  to:
  - networks: [10.0.0.0/8, "fd00::/8", 192.0.2.1]
- action: Deny
  to:
  - nodes: {}
  ports:
  - portRange:
      start: 1
      end: 1024
"#,
        )
        .expect("policy must be valid");
    }

    #[test]
    fn rejects_invalid_admin_policies() {
        assert_eq!(
            admin("priority: 1001\nsubject:\n  namespaces: {}\n"),
            Err(PolicyError::Priority(1001))
        );
        assert_eq!(
            admin("priority: 1\nsubject: {}\n"),
            Err(PolicyError::Subject)
        );
        assert_eq!(
            admin(
                r#"
priority: 1
subject:
  namespaces: {}
  pods:
    namespaceSelector: {}
    podSelector: {}
"#
            ),
            Err(PolicyError::Subject)
        );
        assert_eq!(
            admin(
                r#"
priority: 1
subject:
  namespaces: {}
ingress:
- action: Allow
  from: []
"#
            ),
            Err(rule_error(Direction::Ingress, 0, RuleError::NoPeers))
        );
        assert_eq!(
            admin(
                r#"
priority: 1
subject:
  namespaces: {}
egress:
- action: Allow
  to:
  - namespaces: {}
- action: Deny
  to:
  - domainNames: [example.com]
"#
            ),
            Err(rule_error(Direction::Egress, 1, RuleError::DomainNameAction))
        );
        assert_eq!(
            admin(
                r#"
priority: 1
subject:
  namespaces: {}
egress:
- action: Allow
  to:
  - networks: [10.0.0.0/8]
  ports:
  - namedPort: web
"#
            ),
            Err(rule_error(Direction::Egress, 0, RuleError::NamedPort))
        );
        assert!(matches!(
            admin(
                r#"
priority: 1
subject:
  namespaces: {}
egress:
- action: Deny
  to:
  - networks: [10.0.0.0/33]
"#
            ),
            Err(PolicyError::Rule {
                error: RuleError::Network(_),
                ..
            })
        ));
    }

    #[test]
    fn limits_rules_and_lists() {
        let rules = (0..101)
            .map(|_| "- action: Deny\n  from:\n  - namespaces: {}\n")
            .collect::<String>();
        assert_eq!(
            admin(&format!(
                "priority: 1\nsubject:\n  namespaces: {{}}\ningress:\n{rules}"
            )),
            Err(PolicyError::TooManyRules(101))
        );

        let nets = (0..26)
            .map(|i| format!("\"10.0.{i}.0/24\""))
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(
            admin(&format!(
                "priority: 1\nsubject:\n  namespaces: {{}}\negress:\n- action: Deny\n  to:\n  - networks: [{nets}]\n"
            )),
            Err(rule_error(Direction::Egress, 0, RuleError::TooManyNetworks))
        );

        let name = "x".repeat(101);
        assert_eq!(
            admin(&format!(
                "priority: 1\nsubject:\n  namespaces: {{}}\ningress:\n- name: {name}\n  action: Deny\n  from:\n  - namespaces: {{}}\n"
            )),
            Err(rule_error(Direction::Ingress, 0, RuleError::NameTooLong))
        );
    }

    #[test]
    fn baseline_policies() {
        let spec = r#"
subject:
  namespaces: {}
ingress:
- action: Deny
  from:
  - pods:
      namespaceSelector: {}
      podSelector: {}
"#;
        baseline("default", spec).expect("policy must be valid");
        assert_eq!(
            baseline("other", spec),
            Err(PolicyError::BaselineName("other".to_string()))
        );
        assert_eq!(
            baseline(
                "default",
                r#"
subject:
  namespaces: {}
egress:
- action: Allow
  to:
  - domainNames: [example.com]
"#
            ),
            Err(rule_error(
                Direction::Egress,
                0,
                RuleError::DomainNameInBaseline
            ))
        );
    }
}
