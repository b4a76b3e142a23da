//! # Swap Service
//!
//! Application service implementing [`SwapApi`] over a [`ChainClient`].
//! Every chain call is bounded by the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::{Amount, OutPoint, Txid};
use tracing::{debug, info};

use crate::algorithms::TransactionBuilder;
use crate::config::SwapConfig;
use crate::domain::{
    invariant_refund_relayable, parse_address, CoinSelection, Contract, Hash, PriorOutput,
    SignedTransaction, SpendAmount, SwapError, UnsignedTransaction,
};
use crate::ports::{ChainClient, SwapApi};

/// Swap service - builds and submits swap transactions.
pub struct SwapService<C: ChainClient> {
    /// Configuration.
    config: SwapConfig,
    /// Transaction builder derived from the configuration.
    builder: TransactionBuilder,
    /// Chain access.
    client: Arc<C>,
}

impl<C: ChainClient> SwapService<C> {
    /// Create a service. Fails if `config` is invalid.
    pub fn new(config: SwapConfig, client: Arc<C>) -> Result<Self, SwapError> {
        config.validate()?;
        let builder = TransactionBuilder::new(&config)?;
        Ok(Self {
            config,
            builder,
            client,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Builder in use.
    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    /// Contract between two addresses of the configured network, expiring
    /// after the configured default sequence.
    pub fn new_contract(
        &self,
        hash_lock: Hash,
        recipient_address: &str,
        sender_address: &str,
    ) -> Result<Contract, SwapError> {
        let contract = Contract::from_addresses(
            hash_lock,
            recipient_address,
            sender_address,
            self.config.sequence,
            self.config.network,
        )?;
        info!(
            "[swap] New contract {} expiring after {}",
            contract.address(self.config.network),
            self.config.sequence
        );
        Ok(contract)
    }

    /// Internal: run a chain call under the configured timeout.
    async fn call<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, SwapError>> + Send,
    ) -> Result<T, SwapError> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(limit, fut).await.map_err(|_| {
            SwapError::ChainClient(format!(
                "{what} timed out after {}s",
                self.config.timeout_secs
            ))
        })?
    }

    /// Find the output of `fund_txid` that pays to `contract`.
    pub async fn locate_contract_output(
        &self,
        fund_txid: Txid,
        contract: &Contract,
    ) -> Result<PriorOutput, SwapError> {
        let tx = self
            .call("get_transaction", self.client.get_transaction(fund_txid))
            .await?;
        let script_pubkey = contract.script_pubkey();
        let vout = tx
            .output
            .iter()
            .position(|output| output.script_pubkey == script_pubkey)
            .ok_or_else(|| {
                SwapError::MalformedReference(format!(
                    "{fund_txid} has no output paying to the contract"
                ))
            })?;
        debug!("[swap] Contract output is {}:{}", fund_txid, vout);
        PriorOutput::from_transaction(&tx, vout as u32)
    }
}

#[async_trait]
impl<C: ChainClient> SwapApi for SwapService<C> {
    async fn fund(
        &self,
        sender_address: &str,
        contract: &Contract,
        amount: Amount,
        selection: CoinSelection,
    ) -> Result<UnsignedTransaction, SwapError> {
        let sender = parse_address(sender_address, self.config.network)?;
        let utxos = self
            .call("list_unspent", self.client.list_unspent(&sender))
            .await?;
        debug!(
            "[swap] {} unspent outputs for {}",
            utxos.len(),
            sender_address
        );
        self.builder
            .build_fund(sender_address, contract, amount, &utxos, selection)
    }

    async fn claim(
        &self,
        fund_txid: Txid,
        contract: &Contract,
        recipient_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError> {
        let prior = self.locate_contract_output(fund_txid, contract).await?;
        self.builder
            .build_claim(contract, &prior, recipient_address, amount)
    }

    async fn refund(
        &self,
        fund_txid: Txid,
        contract: &Contract,
        sender_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError> {
        let prior = self.locate_contract_output(fund_txid, contract).await?;
        self.builder
            .build_refund(contract, &prior, sender_address, amount)
    }

    async fn is_refund_relayable(
        &self,
        fund_txid: Txid,
        contract: &Contract,
    ) -> Result<bool, SwapError> {
        if contract.is_time_based() {
            return Err(SwapError::InvalidContract(
                "relayability is only tracked for block-based expirations".to_string(),
            ));
        }
        let prior = self.locate_contract_output(fund_txid, contract).await?;
        let outpoint: OutPoint = prior.outpoint;
        let confirmations = self
            .call(
                "current_relative_confirmations",
                self.client.current_relative_confirmations(outpoint),
            )
            .await?;
        let relayable = invariant_refund_relayable(confirmations, contract);
        debug!(
            "[swap] {} has {} of {} confirmations",
            outpoint,
            confirmations,
            contract.lock_value()
        );
        Ok(relayable)
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<Txid, SwapError> {
        if signed.network() != self.config.network {
            return Err(SwapError::InvalidNetwork(format!(
                "transaction is for {}, service runs on {}",
                signed.network(),
                self.config.network
            )));
        }
        let txid = self
            .call("broadcast", self.client.broadcast(&signed.raw()))
            .await?;
        info!("[swap] Submitted {} {}", signed.label(), txid);
        Ok(txid)
    }
}
