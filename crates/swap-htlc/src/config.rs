//! # Swap Configuration
//!
//! Immutable per-network settings passed into the builder and service.
//! There is no process-wide default network; `network` is required.

use bitcoin::FeeRate;
use serde::{Deserialize, Serialize};

use crate::domain::{validate_expiration, Network, SwapError};

/// Transaction version. Version 2 is required by `OP_CHECKSEQUENCEVERIFY`.
pub const DEFAULT_VERSION: i32 = 2;

/// Default fee rate in sat/vB.
pub const DEFAULT_FEE_RATE_SAT_PER_VB: u64 = 10;

/// Default contract expiration (relative blocks).
pub const DEFAULT_SEQUENCE: u32 = 1000;

/// Default chain client request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Swap configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Target network. Required.
    pub network: Network,

    /// Transaction version.
    #[serde(default = "default_version")]
    pub version: i32,

    /// Absolute lock time of built transactions.
    #[serde(default)]
    pub locktime: u32,

    /// Fee rate in satoshis per virtual byte.
    #[serde(default = "default_fee_rate")]
    pub fee_rate_sat_per_vb: u64,

    /// Default contract expiration.
    #[serde(default = "default_sequence")]
    pub sequence: u32,

    /// BIP-44 coin type used for `KeyPath::Bip44`.
    #[serde(default)]
    pub coin_type: u32,

    /// Chain client request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_version() -> i32 {
    DEFAULT_VERSION
}

fn default_fee_rate() -> u64 {
    DEFAULT_FEE_RATE_SAT_PER_VB
}

fn default_sequence() -> u32 {
    DEFAULT_SEQUENCE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SwapConfig {
    /// Defaults for `network`.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            version: DEFAULT_VERSION,
            locktime: 0,
            fee_rate_sat_per_vb: DEFAULT_FEE_RATE_SAT_PER_VB,
            sequence: DEFAULT_SEQUENCE,
            coin_type: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log: LogConfig::default(),
        }
    }

    /// Create a config for testing (testnet, low fee rate, short lock).
    pub fn for_testing() -> Self {
        Self {
            fee_rate_sat_per_vb: 1,
            sequence: 10,
            timeout_secs: 5,
            log: LogConfig {
                level: "debug".to_string(),
                json: false,
            },
            ..Self::for_network(Network::Testnet)
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, SwapError> {
        let config: Self = toml::from_str(s).map_err(|e| SwapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce unspendable or unrelayable transactions.
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.version < DEFAULT_VERSION {
            return Err(SwapError::InvalidConfig(format!(
                "version {} cannot use relative time-locks, need at least {DEFAULT_VERSION}",
                self.version
            )));
        }
        self.fee_rate()?;
        validate_expiration(self.sequence)
            .map_err(|e| SwapError::InvalidConfig(format!("default sequence: {e}")))?;
        if self.timeout_secs == 0 {
            return Err(SwapError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Fee rate as a `bitcoin` fee rate.
    pub fn fee_rate(&self) -> Result<FeeRate, SwapError> {
        if self.fee_rate_sat_per_vb == 0 {
            return Err(SwapError::InvalidConfig(
                "fee_rate_sat_per_vb must be greater than zero".to_string(),
            ));
        }
        FeeRate::from_sat_per_vb(self.fee_rate_sat_per_vb).ok_or_else(|| {
            SwapError::InvalidConfig(format!(
                "fee rate {} sat/vB overflows",
                self.fee_rate_sat_per_vb
            ))
        })
    }
}
