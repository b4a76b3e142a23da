//! # Inbound Ports
//!
//! API trait defining what the swap service can do.

use async_trait::async_trait;
use bitcoin::{Amount, Txid};

use crate::domain::{
    CoinSelection, Contract, SignedTransaction, SpendAmount, SwapError, UnsignedTransaction,
};

/// Swap API - inbound port.
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Build a Fund transaction locking `amount` into `contract`, paid from
    /// the unspent outputs of `sender_address`.
    async fn fund(
        &self,
        sender_address: &str,
        contract: &Contract,
        amount: Amount,
        selection: CoinSelection,
    ) -> Result<UnsignedTransaction, SwapError>;

    /// Build a Claim transaction spending the contract output of `fund_txid`.
    async fn claim(
        &self,
        fund_txid: Txid,
        contract: &Contract,
        recipient_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError>;

    /// Build a Refund transaction spending the contract output of `fund_txid`.
    async fn refund(
        &self,
        fund_txid: Txid,
        contract: &Contract,
        sender_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError>;

    /// Whether a refund of the contract output in `fund_txid` would be relayed now.
    async fn is_refund_relayable(
        &self,
        fund_txid: Txid,
        contract: &Contract,
    ) -> Result<bool, SwapError>;

    /// Relay a signed transaction.
    async fn submit(&self, signed: &SignedTransaction) -> Result<Txid, SwapError>;
}
