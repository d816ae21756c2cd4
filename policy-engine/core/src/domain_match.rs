use regex::Regex;
use std::fmt;

/// An optional leading `*.` wildcard followed by at least two labels, with an optional trailing
/// dot. Labels start and end with an alphanumeric character.
const PATTERN: &str = r"^(\*\.)?[A-Za-z0-9]([-A-Za-z0-9_]*[A-Za-z0-9])?(\.[A-Za-z0-9]([-A-Za-z0-9_]*[A-Za-z0-9])?)+\.?$";

/// Matches the fully qualified domain name of an external peer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DomainMatch {
    /// An exact match.
    Name(String),

    /// A wildcard match: `*.example.com` matches one or more labels in front of the suffix.
    Suffix(Vec<String>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid domain name pattern: {0:?}")]
pub struct InvalidDomainName(String);

// === impl DomainMatch ===

impl DomainMatch {
    pub fn matches(&self, fqdn: &str) -> bool {
        let fqdn = normalize(fqdn);
        match self {
            Self::Name(name) => *name == fqdn,
            Self::Suffix(suffix) => {
                let labels = fqdn.split('.').collect::<Vec<_>>();
                labels.len() > suffix.len()
                    && labels[labels.len() - suffix.len()..]
                        .iter()
                        .zip(suffix)
                        .all(|(l, s)| *l == s.as_str())
                    && labels[..labels.len() - suffix.len()]
                        .iter()
                        .all(|l| !l.is_empty())
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

impl std::str::FromStr for DomainMatch {
    type Err = InvalidDomainName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = Regex::new(PATTERN).expect("should compile");
        if !pattern.is_match(s) {
            return Err(InvalidDomainName(s.to_string()));
        }

        let name = normalize(s);
        match name.strip_prefix("*.") {
            Some(rest) => Ok(Self::Suffix(rest.split('.').map(ToString::to_string).collect())),
            None => Ok(Self::Name(name)),
        }
    }
}

impl fmt::Display for DomainMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write;
        match self {
            Self::Name(name) => name.fmt(f),
            Self::Suffix(suffix) => {
                f.write_char('*')?;
                for part in suffix {
                    write!(f, ".{}", part)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names() {
        let m = "Kubernetes.io.".parse::<DomainMatch>().unwrap();
        assert_eq!(m, DomainMatch::Name("kubernetes.io".to_string()));
        assert!(m.matches("kubernetes.io"));
        assert!(m.matches("KUBERNETES.io."));
        assert!(!m.matches("www.kubernetes.io"));
    }

    #[test]
    fn wildcards_match_one_or_more_labels() {
        let m = "*.example.com".parse::<DomainMatch>().unwrap();
        assert_eq!(m.to_string(), "*.example.com");
        assert!(m.matches("www.example.com"));
        assert!(m.matches("a.b.example.com"));
        assert!(!m.matches("example.com"));
        assert!(!m.matches("wwwexample.com"));
        assert!(!m.matches(".example.com"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for p in [
            "",
            "*",
            "*.",
            "www.*.com",
            "a..b",
            "example.*",
            "com",
            "*.com",
            "-api.example.com",
            "api-.example.com",
            "exa mple.com",
        ] {
            assert!(p.parse::<DomainMatch>().is_err(), "{p:?} must be rejected");
        }
    }
}
