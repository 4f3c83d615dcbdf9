//! Bitcoin networks and their frame magic values.

use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// The chain a node operates on. Each network has its own frame magic so
/// nodes on different chains reject each other's traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitcoinNet {
    MainNet,
    #[default]
    TestNet3,
    RegTest,
    SimNet,
}

impl BitcoinNet {
    pub const ALL: [BitcoinNet; 4] = [
        BitcoinNet::MainNet,
        BitcoinNet::TestNet3,
        BitcoinNet::RegTest,
        BitcoinNet::SimNet,
    ];

    /// Magic value written at the start of every frame.
    pub fn magic(self) -> u32 {
        match self {
            BitcoinNet::MainNet => 0xd9b4_bef9,
            BitcoinNet::TestNet3 => 0x0709_110b,
            BitcoinNet::RegTest => 0xdab5_bffa,
            BitcoinNet::SimNet => 0x1214_1c16,
        }
    }

    /// Look up a network by its magic value.
    pub fn from_magic(magic: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|net| net.magic() == magic)
    }

    pub fn name(self) -> &'static str {
        match self {
            BitcoinNet::MainNet => "mainnet",
            BitcoinNet::TestNet3 => "testnet3",
            BitcoinNet::RegTest => "regtest",
            BitcoinNet::SimNet => "simnet",
        }
    }
}

impl fmt::Display for BitcoinNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BitcoinNet {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(BitcoinNet::MainNet),
            "testnet3" | "testnet" => Ok(BitcoinNet::TestNet3),
            "regtest" => Ok(BitcoinNet::RegTest),
            "simnet" => Ok(BitcoinNet::SimNet),
            _ => Err(WireError::UnknownNetwork(s.to_string())),
        }
    }
}
