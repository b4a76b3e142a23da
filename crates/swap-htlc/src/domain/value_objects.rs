//! # Domain Value Objects
//!
//! Immutable value types shared by the builder, solvers and signer.

use super::errors::SwapError;
use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported Bitcoin networks.
///
/// No `Default`. Every entry point that touches chain-specific encoding
/// takes the network explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet.
    Mainnet,
    /// Bitcoin testnet3.
    Testnet,
}

impl Network {
    /// The `bitcoin` crate network for address encoding.
    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }

    /// Lowercase name, as used in config and envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(SwapError::InvalidNetwork(format!(
                "{other}, choose only 'mainnet' or 'testnet'"
            ))),
        }
    }
}

/// The three transaction kinds of the HTLC lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Moves sender funds into the contract output.
    Fund,
    /// Spends the contract output through the hash-lock branch.
    Claim,
    /// Spends the contract output through the time-lock branch.
    Refund,
}

impl TransactionKind {
    /// Human-readable type label, e.g. `bitcoin_claim_unsigned`.
    pub fn label(&self, signed: bool) -> String {
        let kind = match self {
            TransactionKind::Fund => "fund",
            TransactionKind::Claim => "claim",
            TransactionKind::Refund => "refund",
        };
        let state = if signed { "signed" } else { "unsigned" };
        format!("bitcoin_{kind}_{state}")
    }

    /// Spending branch of the contract, if this kind spends one.
    pub fn branch(&self) -> Option<Branch> {
        match self {
            TransactionKind::Fund => None,
            TransactionKind::Claim => Some(Branch::Claim),
            TransactionKind::Refund => Some(Branch::Refund),
        }
    }
}

/// Redeem branch of the HTLC script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Branch {
    /// `OP_IF`: secret preimage plus recipient signature.
    Claim,
    /// `OP_ELSE`: relative time-lock plus sender signature.
    Refund,
}

impl Branch {
    /// Selector pushed just below the witness script.
    ///
    /// `OP_IF` under segwit requires minimal truth values, so the claim
    /// flag is exactly `0x01` and the refund flag is the empty vector.
    pub fn selector(&self) -> &'static [u8] {
        match self {
            Branch::Claim => &[0x01],
            Branch::Refund => &[],
        }
    }
}

/// How much of the contract output a Claim or Refund spends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpendAmount {
    /// The full contract output value; the fee comes out of it.
    #[default]
    Max,
    /// An explicit amount no larger than the contract output value.
    Exact(Amount),
}

/// Fund input selection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSelection {
    /// Spend the largest outputs first until amount plus fee is covered.
    #[default]
    LargestFirst,
    /// Spend every supplied output in the given order.
    All,
}

/// An output being spent, as resolved from the chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriorOutput {
    /// Reference to the output.
    pub outpoint: OutPoint,
    /// Output value.
    pub amount: Amount,
    /// Locking script.
    pub script_pubkey: ScriptBuf,
}

impl PriorOutput {
    /// Create a prior output from its parts.
    pub fn new(outpoint: OutPoint, amount: Amount, script_pubkey: ScriptBuf) -> Self {
        Self {
            outpoint,
            amount,
            script_pubkey,
        }
    }

    /// Take output `vout` of an already-known transaction.
    pub fn from_transaction(tx: &Transaction, vout: u32) -> Result<Self, SwapError> {
        let output = tx.output.get(vout as usize).ok_or_else(|| {
            SwapError::MalformedReference(format!(
                "{} has no output #{vout}",
                tx.compute_txid()
            ))
        })?;
        Ok(Self {
            outpoint: OutPoint::new(tx.compute_txid(), vout),
            amount: output.value,
            script_pubkey: output.script_pubkey.clone(),
        })
    }

    /// The output as the sighash algorithms see it.
    pub fn to_txout(&self) -> TxOut {
        TxOut {
            value: self.amount,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// Parse a `"<txid>:<vout>"` reference.
pub fn parse_outpoint(reference: &str) -> Result<OutPoint, SwapError> {
    let (txid, vout) = reference.split_once(':').ok_or_else(|| {
        SwapError::MalformedReference(format!("expected '<txid>:<vout>', got '{reference}'"))
    })?;
    let txid = Txid::from_str(txid)
        .map_err(|e| SwapError::MalformedReference(format!("bad txid: {e}")))?;
    let vout = vout
        .parse::<u32>()
        .map_err(|e| SwapError::MalformedReference(format!("bad output index: {e}")))?;
    Ok(OutPoint::new(txid, vout))
}

/// Where a signing key lives under a root extended private key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPath {
    /// Full derivation path, e.g. `m/44'/0'/0'/0/0`.
    Explicit(String),
    /// BIP-44 account/change/address under the network coin type.
    Bip44 {
        /// Hardened account index.
        account: u32,
        /// External (false) or internal change (true) chain.
        change: bool,
        /// Address index.
        address: u32,
    },
}

impl KeyPath {
    /// `m/44'/0'/0'/0/0`.
    pub fn default_bip44() -> Self {
        KeyPath::Bip44 {
            account: 0,
            change: false,
            address: 0,
        }
    }

    /// Render as a derivation path string.
    pub fn to_path_string(&self, coin_type: u32) -> String {
        match self {
            KeyPath::Explicit(path) => path.clone(),
            KeyPath::Bip44 {
                account,
                change,
                address,
            } => format!(
                "m/44'/{coin_type}'/{account}'/{}/{address}",
                u8::from(*change)
            ),
        }
    }
}

impl Default for KeyPath {
    fn default() -> Self {
        Self::default_bip44()
    }
}
