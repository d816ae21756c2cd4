use crate::{core::IpNet, Engine};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(
    name = "policy-engine",
    about = "Evaluates traffic against admin network policies"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "policy_engine=info,warn",
        env = "POLICY_ENGINE_LOG"
    )]
    log_level: String,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// Disables validation of admin and baseline policies before they are indexed.
    #[clap(long)]
    admission_disabled: bool,

    /// Network CIDRs of in-cluster addresses.
    ///
    /// External endpoints may not have addresses in these networks. The default includes all
    /// private networks.
    #[clap(
        long,
        default_value = "10.0.0.0/8,100.64.0.0/10,172.16.0.0/12,192.168.0.0/16"
    )]
    cluster_networks: IpNets,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Clone, Debug)]
struct IpNets(Vec<IpNet>);

impl Args {
    /// Initializes logging and builds an engine with an empty policy index.
    pub fn build(self) -> Result<Engine> {
        init_tracing(&self.log_level, self.log_format)?;

        let Self {
            admission_disabled,
            cluster_networks: IpNets(cluster_networks),
            ..
        } = self;
        info!(admission = !admission_disabled, networks = ?cluster_networks, "Starting engine");
        Ok(Engine::new(cluster_networks, !admission_disabled))
    }

    /// Builds an engine without initializing logging.
    pub fn engine(&self) -> Engine {
        Engine::new(self.cluster_networks.0.clone(), !self.admission_disabled)
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;
    let res = match format {
        LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };
    res.map_err(|error| anyhow!("failed to initialize logging: {error}"))
}

impl std::str::FromStr for IpNets {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|n| n.parse().map_err(Into::into))
            .collect::<Result<Vec<IpNet>>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["policy-engine"]).expect("defaults must parse");
        assert_eq!(args.log_format, LogFormat::Plain);
        assert!(!args.admission_disabled);
        assert_eq!(args.cluster_networks.0.len(), 4);
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "policy-engine",
            "--log-level=policy_engine=debug",
            "--log-format=json",
            "--admission-disabled",
            "--cluster-networks=10.42.0.0/16,fd00::/48",
        ])
        .expect("args must parse");
        assert_eq!(args.log_level, "policy_engine=debug");
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.admission_disabled);
        assert_eq!(
            args.cluster_networks.0,
            vec![
                "10.42.0.0/16".parse::<IpNet>().unwrap(),
                "fd00::/48".parse().unwrap()
            ]
        );

        Args::try_parse_from(["policy-engine", "--cluster-networks=10.42.0.0"])
            .expect_err("networks must be CIDRs");
        Args::try_parse_from(["policy-engine", "--log-format=yaml"])
            .expect_err("unknown formats are rejected");
    }
}
