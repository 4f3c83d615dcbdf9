//! Node configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ln_p2p::config::{DEFAULT_DIAL_TIMEOUT, DEFAULT_PORT};
use ln_p2p::{LightningAddress, P2pConfig};
use ln_wire::BitcoinNet;

use crate::cli::Cli;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Peer listen addresses.
    pub listen_addrs: Vec<SocketAddr>,

    /// Network the node frames messages for.
    pub network: BitcoinNet,

    /// Peers to connect to at startup.
    pub connect: Vec<LightningAddress>,

    /// Identity key file. `None` means an ephemeral key.
    pub identity_key_file: Option<PathBuf>,

    /// Outbound dial deadline.
    pub dial_timeout: Duration,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let connect = cli
            .connect
            .iter()
            .map(|s| {
                s.parse::<LightningAddress>()
                    .map_err(|e| anyhow::anyhow!("--connect {}: {}", s, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            listen_addrs: cli.listen.clone(),
            network: cli.network,
            connect,
            identity_key_file: cli.expanded_identity_key_file(),
            dial_timeout: Duration::from_secs(cli.dial_timeout_secs),
            log_level: cli.log_level.clone(),
        })
    }

    /// Build P2P configuration from node config.
    pub fn p2p_config(&self) -> P2pConfig {
        P2pConfig::new(self.listen_addrs.clone())
            .with_network(self.network)
            .with_dial_timeout(self.dial_timeout)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))],
            network: BitcoinNet::default(),
            connect: Vec::new(),
            identity_key_file: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const PKH: &str = "0102030405060708090a0b0c0d0e0f1011121314";

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.listen_addrs[0].port(), DEFAULT_PORT);
        assert_eq!(config.network, BitcoinNet::TestNet3);
        assert!(config.connect.is_empty());
        assert_eq!(config.dial_timeout, DEFAULT_DIAL_TIMEOUT);
    }

    #[test]
    fn test_from_cli() {
        let connect = format!("{}@127.0.0.1:3000", PKH);
        let cli = Cli::parse_from([
            "ln-node",
            "--network",
            "regtest",
            "--listen",
            "127.0.0.1:2000",
            "--connect",
            connect.as_str(),
            "--dial-timeout-secs",
            "3",
        ]);
        let config = NodeConfig::from_cli(&cli).unwrap();

        assert_eq!(config.network, BitcoinNet::RegTest);
        assert_eq!(config.connect.len(), 1);
        assert_eq!(config.connect[0].net_addr.port(), 3000);
        assert!(config.connect[0].pub_key.is_none());

        let p2p = config.p2p_config();
        assert_eq!(p2p.listen_addrs, vec!["127.0.0.1:2000".parse::<SocketAddr>().unwrap()]);
        assert_eq!(p2p.network, BitcoinNet::RegTest);
        assert_eq!(p2p.dial_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_cli_bad_connect() {
        let cli = Cli::parse_from(["ln-node", "--connect", "nonsense"]);
        assert!(NodeConfig::from_cli(&cli).is_err());
    }
}
