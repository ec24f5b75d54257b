//! Client Configuration
//!
//! Fixed registry of the two supported networks plus the environment-driven
//! settings (selected network, ragequit opt-in, wallet address).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Unknown network: {0} (expected sepolia or mainnet)")]
    UnknownNetwork(String),
    #[error("{network}.{field} invalid: {reason}")]
    Invalid {
        network: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Sepolia,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Sepolia, Network::Mainnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Sepolia => "sepolia",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn config(&self) -> &'static NetworkConfig {
        match self {
            Network::Sepolia => &SEPOLIA,
            Network::Mainnet => &MAINNET,
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sepolia" => Ok(Network::Sepolia),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Static description of one deployment of the confidential-balance contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    /// Display name
    pub name: &'static str,
    /// JSON-RPC endpoint
    pub rpc_url: &'static str,
    /// Confidential-balance contract address
    pub contract_address: &'static str,
    /// Underlying ERC-20 token address
    pub token_address: &'static str,
    /// Starknet chain identifier
    pub chain_id: &'static str,
    /// Token symbol (STRK or USDC)
    pub token_symbol: &'static str,
    /// Token decimals (18 for STRK, 6 for USDC)
    pub token_decimals: u8,
}

pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia Testnet",
    rpc_url: "https://starknet-sepolia.public.blastapi.io/rpc/v0_7",
    contract_address: "0x00b4cca30f0f641e01140c1c388f55641f1c3fe5515484e622b6cb91d8cee585",
    token_address: "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d",
    chain_id: "SN_SEPOLIA",
    token_symbol: "STRK",
    token_decimals: 18,
};

// Native Circle USDC, not the bridged USDC.e
pub const MAINNET: NetworkConfig = NetworkConfig {
    name: "Starknet Mainnet",
    rpc_url: "https://starknet-mainnet.public.blastapi.io/rpc/v0_7",
    contract_address: "0x026f79017c3c382148832c6ae50c22502e66f7a2f81ccbdb9e1377af31859d3a",
    token_address: "0x033068F6539f8e6e6b131e6B2B814e6c34A5224bC66947c47DaB9dFeE93b35fb",
    chain_id: "SN_MAIN",
    token_symbol: "USDC",
    token_decimals: 6,
};

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Expected decimals for a supported token symbol
pub fn decimals_for_symbol(symbol: &str) -> Option<u8> {
    match symbol {
        "STRK" => Some(18),
        "USDC" => Some(6),
        _ => None,
    }
}

impl NetworkConfig {
    /// Startup health check for one registry entry
    pub fn validate(&self, network: &'static str) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::Invalid {
            network,
            field,
            reason,
        };

        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(invalid("rpc_url", "must start with http:// or https://".into()));
        }
        if !is_hex_address(self.contract_address) {
            return Err(invalid("contract_address", "not a 0x-prefixed hex address".into()));
        }
        if !is_hex_address(self.token_address) {
            return Err(invalid("token_address", "not a 0x-prefixed hex address".into()));
        }
        if self.chain_id.is_empty() {
            return Err(invalid("chain_id", "missing".into()));
        }
        let expected = decimals_for_symbol(self.token_symbol).ok_or_else(|| {
            invalid("token_symbol", format!("{} is not STRK or USDC", self.token_symbol))
        })?;
        if expected != self.token_decimals {
            return Err(invalid(
                "token_decimals",
                format!(
                    "{} uses {} decimals, got {}",
                    self.token_symbol, expected, self.token_decimals
                ),
            ));
        }
        Ok(())
    }
}

/// Validate every registry entry; run once at process start.
pub fn validate_registry() -> Result<(), ConfigError> {
    for network in Network::ALL {
        network.config().validate(network.as_str())?;
    }
    Ok(())
}

/// Environment-driven client settings
#[derive(Clone, Deserialize)]
pub struct ClientSettings {
    /// Selected network (`TONGO_NETWORK`)
    #[serde(default)]
    pub network: Network,

    /// Opt-in for the irreversible full exit (`TONGO_ENABLE_RAGEQUIT`)
    #[serde(default)]
    pub enable_ragequit: bool,

    /// Confidential private key (`TONGO_PRIVATE_KEY`)
    pub private_key: Option<String>,

    /// Wallet address used as sender and payout target (`STARKNET_ACCOUNT_ADDRESS`)
    pub account_address: Option<String>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("network", &self.network)
            .field("enable_ragequit", &self.enable_ragequit)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("account_address", &self.account_address)
            .finish()
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            network: Network::default(),
            enable_ragequit: false,
            private_key: None,
            account_address: None,
        }
    }
}

impl ClientSettings {
    /// Load settings from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TONGO")
                    .try_parsing(true),
            )
            // STARKNET_* also carries the wallet's own signing key, so only
            // the address is taken from that namespace
            .set_override_option(
                "account_address",
                std::env::var("STARKNET_ACCOUNT_ADDRESS").ok(),
            )?
            .build()?;

        let settings: ClientSettings = settings.try_deserialize()?;
        Ok(settings)
    }

    pub fn network_config(&self) -> &'static NetworkConfig {
        self.network.config()
    }
}
