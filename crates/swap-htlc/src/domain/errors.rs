//! # Domain Errors
//!
//! Error types for HTLC contract building, spending and signing.

use thiserror::Error;

/// 32-byte hash (hash locks are HASH256).
pub type Hash = [u8; 32];

/// Public key hash type (20-byte HASH160).
pub type PubkeyHash = [u8; 20];

/// Swap error types.
///
/// Messages never carry key material, secrets or the expected hash lock.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Contract fields are out of range.
    #[error("Invalid contract: {0}")]
    InvalidContract(String),

    /// Bytecode does not follow the HTLC template.
    #[error("Malformed bytecode: {0}")]
    MalformedBytecode(String),

    /// Address cannot be parsed or belongs to another network.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Unknown network or network mismatch.
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Inputs do not cover amount plus fee.
    #[error("Insufficient funds: required {required} sat, available {available} sat")]
    InsufficientFunds {
        /// Satoshis required (amount + fee, or dust floor)
        required: u64,
        /// Satoshis available
        available: u64,
    },

    /// Bad prior-transaction reference.
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// Secret does not hash to the contract hash lock.
    #[error("Secret does not match the contract hash lock")]
    SecretMismatch,

    /// Secret has the wrong shape.
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    /// Solver cannot produce a witness for an input.
    #[error("Unsatisfiable input #{index}: {reason}")]
    UnsatisfiableInput {
        /// Input index
        index: usize,
        /// Why the solver gave up
        reason: String,
    },

    /// Direct signing and raw signing produced different transactions.
    #[error("Signature divergence: direct {direct} != designated {designated}")]
    SignatureDivergence {
        /// Witness txid from the in-memory path
        direct: String,
        /// Witness txid from the serialized path
        designated: String,
    },

    /// Attached unlocking data does not satisfy the locking script.
    #[error("Invalid witness on input #{index}: {reason}")]
    InvalidWitness {
        /// Input index
        index: usize,
        /// Failed check
        reason: String,
    },

    /// Serialized transaction envelope cannot be decoded.
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Key material cannot be parsed or derived.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration rejected.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// External chain client failure.
    #[error("Chain client error: {0}")]
    ChainClient(String),
}
