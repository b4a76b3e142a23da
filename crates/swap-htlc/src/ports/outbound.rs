//! # Outbound Ports
//!
//! What the swap core needs from the outside world: a view of the chain and
//! a way to turn a root extended key into a signing key.

use async_trait::async_trait;
use bitcoin::{Address, OutPoint, Transaction, Txid};

use crate::domain::{KeyPath, PriorOutput, SigningKey, SwapError};

/// Chain access - outbound port.
///
/// All failures surface as [`SwapError::ChainClient`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Resolve an outpoint to the output it references.
    async fn resolve_prior_output(&self, outpoint: OutPoint) -> Result<PriorOutput, SwapError>;

    /// Fetch a confirmed or pending transaction.
    async fn get_transaction(&self, txid: Txid) -> Result<Transaction, SwapError>;

    /// Unspent outputs paying to `address`.
    async fn list_unspent(&self, address: &Address) -> Result<Vec<PriorOutput>, SwapError>;

    /// Blocks that confirmed `outpoint`'s transaction, including its own.
    ///
    /// Zero while the transaction is pending.
    async fn current_relative_confirmations(&self, outpoint: OutPoint) -> Result<u32, SwapError>;

    /// Relay a consensus-encoded transaction given as hex.
    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, SwapError>;
}

/// Key derivation - outbound port.
pub trait KeyDeriver: Send + Sync {
    /// Derive the key at `path` (e.g. `m/44'/0'/0'/0/0`) below `root`.
    fn derive_private_key(&self, root: &str, path: &str) -> Result<SigningKey, SwapError>;

    /// Derive the key for a [`KeyPath`], filling in `coin_type` for BIP-44 paths.
    fn derive_key(
        &self,
        root: &str,
        path: &KeyPath,
        coin_type: u32,
    ) -> Result<SigningKey, SwapError> {
        self.derive_private_key(root, &path.to_path_string(coin_type))
    }
}
