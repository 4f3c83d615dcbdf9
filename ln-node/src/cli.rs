//! Command-line argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use ln_wire::BitcoinNet;

/// Lightning peer node.
#[derive(Parser, Debug, Clone)]
#[command(name = "ln-node")]
#[command(about = "Lightning peer node binary")]
#[command(version)]
pub struct Cli {
    /// Comma-separated list of peer listen addresses.
    #[arg(long, value_delimiter = ',', default_value = "0.0.0.0:10011")]
    pub listen: Vec<SocketAddr>,

    /// Network whose magic frames every message (mainnet, testnet3, regtest, simnet).
    #[arg(long, default_value = "testnet3")]
    pub network: BitcoinNet,

    /// Comma-separated list of peers to connect to, as `<pubkey or pkh hex>@<host:port>`.
    #[arg(long, value_delimiter = ',')]
    pub connect: Vec<String>,

    /// File holding the hex-encoded identity secret key. A random key is used if unset.
    #[arg(long)]
    pub identity_key_file: Option<PathBuf>,

    /// Outbound dial deadline in seconds.
    #[arg(long, default_value_t = 10)]
    pub dial_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Expand the key file path (handle ~ for home).
    pub fn expanded_identity_key_file(&self) -> Option<PathBuf> {
        self.identity_key_file.as_ref().map(|path| expand_home(path))
    }
}

fn expand_home(path: &PathBuf) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["ln-node"]);
        assert_eq!(cli.listen.len(), 1);
        assert_eq!(cli.listen[0].port(), 10011);
        assert_eq!(cli.network, BitcoinNet::TestNet3);
        assert!(cli.connect.is_empty());
        assert!(cli.identity_key_file.is_none());
        assert_eq!(cli.dial_timeout_secs, 10);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_listen_list() {
        let cli = Cli::parse_from(["ln-node", "--listen", "127.0.0.1:1000,127.0.0.1:1001"]);
        assert_eq!(cli.listen.len(), 2);
        assert_eq!(cli.listen[1].port(), 1001);
    }

    #[test]
    fn test_network_flag() {
        let cli = Cli::parse_from(["ln-node", "--network", "simnet"]);
        assert_eq!(cli.network, BitcoinNet::SimNet);

        assert!(Cli::try_parse_from(["ln-node", "--network", "litecoin"]).is_err());
    }

    #[test]
    fn test_connect_list() {
        let cli = Cli::parse_from(["ln-node", "--connect", "aa@127.0.0.1:1,bb@127.0.0.1:2"]);
        assert_eq!(cli.connect, vec!["aa@127.0.0.1:1", "bb@127.0.0.1:2"]);
    }

    #[test]
    fn test_key_file_home_expansion() {
        let cli = Cli::parse_from(["ln-node", "--identity-key-file", "~/node.key"]);
        let expanded = cli.expanded_identity_key_file().unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("node.key"));
        }

        let cli = Cli::parse_from(["ln-node", "--identity-key-file", "/tmp/node.key"]);
        assert_eq!(
            cli.expanded_identity_key_file(),
            Some(PathBuf::from("/tmp/node.key"))
        );
    }
}
