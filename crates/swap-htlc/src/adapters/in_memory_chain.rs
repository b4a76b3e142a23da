//! In-Memory Chain Adapter
//!
//! Implements `ChainClient` over a simulated chain: funding, block
//! production, unspent tracking and relay policy for BIP-68 block-based
//! relative locks. Scripts are not executed; use the contract verifier for
//! that.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::deserialize;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Transaction, TxIn, TxOut, Txid};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{PriorOutput, SwapError};
use crate::ports::outbound::ChainClient;

/// Height of the first simulated block.
pub const GENESIS_HEIGHT: u32 = 100;

const DISABLE_FLAG: u32 = 1 << 31;

#[derive(Default)]
struct ChainState {
    txs: HashMap<Txid, Transaction>,
    /// Confirmation height per confirmed transaction.
    heights: HashMap<Txid, u32>,
    pending: Vec<Txid>,
    spent: HashSet<OutPoint>,
    tip: u32,
    faucet_nonce: i64,
}

impl ChainState {
    fn confirmations(&self, txid: &Txid) -> u32 {
        self.heights
            .get(txid)
            .map(|height| self.tip + 1 - height)
            .unwrap_or(0)
    }

    fn output(&self, outpoint: &OutPoint) -> Result<&TxOut, SwapError> {
        self.txs
            .get(&outpoint.txid)
            .and_then(|tx| tx.output.get(outpoint.vout as usize))
            .ok_or_else(|| SwapError::ChainClient(format!("unknown output {outpoint}")))
    }
}

/// Simulated chain shared between test parties.
pub struct InMemoryChain {
    state: RwLock<ChainState>,
}

impl InMemoryChain {
    /// Create a chain whose tip is at [`GENESIS_HEIGHT`].
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ChainState {
                tip: GENESIS_HEIGHT,
                ..Default::default()
            }),
        }
    }

    /// Current tip height.
    pub fn tip(&self) -> u32 {
        self.state.read().tip
    }

    /// Number of transactions waiting for a block.
    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Create a confirmed output of `amount` paying to `address`.
    pub fn fund_address(&self, address: &Address, amount: Amount) -> OutPoint {
        let mut state = self.state.write();
        state.faucet_nonce += 1;
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::builder()
                    .push_int(state.faucet_nonce)
                    .into_script(),
                ..Default::default()
            }],
            output: vec![TxOut {
                value: amount,
                script_pubkey: address.script_pubkey(),
            }],
        };
        let txid = tx.compute_txid();
        let height = state.tip;
        state.heights.insert(txid, height);
        state.txs.insert(txid, tx);

        debug!("[swap] Faucet paid {} sat to {}", amount.to_sat(), address);
        OutPoint { txid, vout: 0 }
    }

    /// Confirm every pending transaction in the next block, then advance the
    /// tip by `blocks` in total.
    pub fn mine_blocks(&self, blocks: u32) {
        if blocks == 0 {
            return;
        }
        let mut state = self.state.write();
        let height = state.tip + 1;
        let pending = std::mem::take(&mut state.pending);
        for txid in &pending {
            state.heights.insert(*txid, height);
        }
        state.tip += blocks;
        info!(
            "[swap] Mined {} blocks ({} transactions), tip {}",
            blocks,
            pending.len(),
            state.tip
        );
    }
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn resolve_prior_output(&self, outpoint: OutPoint) -> Result<PriorOutput, SwapError> {
        let state = self.state.read();
        let output = state.output(&outpoint)?;
        Ok(PriorOutput::new(
            outpoint,
            output.value,
            output.script_pubkey.clone(),
        ))
    }

    async fn get_transaction(&self, txid: Txid) -> Result<Transaction, SwapError> {
        self.state
            .read()
            .txs
            .get(&txid)
            .cloned()
            .ok_or_else(|| SwapError::ChainClient(format!("unknown transaction {txid}")))
    }

    async fn list_unspent(&self, address: &Address) -> Result<Vec<PriorOutput>, SwapError> {
        let script_pubkey = address.script_pubkey();
        let state = self.state.read();
        let mut unspent: Vec<PriorOutput> = state
            .txs
            .iter()
            .flat_map(|(txid, tx)| {
                tx.output.iter().enumerate().map(move |(vout, output)| {
                    (OutPoint::new(*txid, vout as u32), output)
                })
            })
            .filter(|(outpoint, output)| {
                output.script_pubkey == script_pubkey && !state.spent.contains(outpoint)
            })
            .map(|(outpoint, output)| {
                PriorOutput::new(outpoint, output.value, output.script_pubkey.clone())
            })
            .collect();
        unspent.sort_by_key(|utxo| utxo.outpoint);
        Ok(unspent)
    }

    async fn current_relative_confirmations(&self, outpoint: OutPoint) -> Result<u32, SwapError> {
        let state = self.state.read();
        state.output(&outpoint)?;
        Ok(state.confirmations(&outpoint.txid))
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, SwapError> {
        let bytes = hex::decode(raw_hex)
            .map_err(|e| SwapError::ChainClient(format!("transaction is not hex: {e}")))?;
        let tx: Transaction = deserialize(&bytes)
            .map_err(|e| SwapError::ChainClient(format!("undecodable transaction: {e}")))?;
        let txid = tx.compute_txid();

        let mut state = self.state.write();
        if state.txs.contains_key(&txid) {
            return Err(SwapError::ChainClient(format!("{txid} already known")));
        }

        let mut input_total = Amount::ZERO;
        let mut seen = HashSet::new();
        for txin in &tx.input {
            let outpoint = txin.previous_output;
            let output = state.output(&outpoint)?;
            if state.spent.contains(&outpoint) || !seen.insert(outpoint) {
                return Err(SwapError::ChainClient(format!("{outpoint} already spent")));
            }
            input_total = input_total
                .checked_add(output.value)
                .ok_or_else(|| SwapError::ChainClient("input value overflows".to_string()))?;

            let sequence = txin.sequence.to_consensus_u32();
            let relative = tx.version.0 >= 2 && sequence & DISABLE_FLAG == 0;
            // time-based locks are not simulated
            if relative && !txin.sequence.is_height_locked() {
                continue;
            }
            if relative {
                let required = sequence & 0xffff;
                let confirmations = state.confirmations(&outpoint.txid);
                if confirmations < required {
                    return Err(SwapError::ChainClient(format!(
                        "non-BIP68-final: {outpoint} has {confirmations} of {required} confirmations"
                    )));
                }
            }
        }

        let output_total = tx
            .output
            .iter()
            .try_fold(Amount::ZERO, |total, output| total.checked_add(output.value))
            .ok_or_else(|| SwapError::ChainClient("output value overflows".to_string()))?;
        if output_total > input_total {
            return Err(SwapError::ChainClient(format!(
                "outputs {} sat exceed inputs {} sat",
                output_total.to_sat(),
                input_total.to_sat()
            )));
        }

        for txin in &tx.input {
            state.spent.insert(txin.previous_output);
        }
        state.txs.insert(txid, tx);
        state.pending.push(txid);

        info!("[swap] Accepted {} into the mempool", txid);
        Ok(txid)
    }
}
