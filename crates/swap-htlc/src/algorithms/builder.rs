//! # Transaction Builder
//!
//! Builds unsigned Fund, Claim and Refund transactions.
//!
//! - **Fund** spends the sender's P2PKH/P2WPKH outputs into the contract
//!   P2WSH output, with optional change back to the sender.
//! - **Claim** spends the contract output to the recipient. Input
//!   sequence is final (`0xffffffff`).
//! - **Refund** spends the contract output back to the sender. Input
//!   sequence equals the contract expiration so `OP_CHECKSEQUENCEVERIFY`
//!   passes once that many blocks have confirmed the fund output.

use std::collections::HashSet;

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, FeeRate, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::{debug, info};

use super::coin_selection::select_inputs;
use super::fee::{estimate_fee, InputShape};
use crate::config::SwapConfig;
use crate::domain::{
    parse_address, Branch, CoinSelection, Contract, Network, PriorOutput, SpendAmount,
    SwapError, TransactionKind, UnsignedTransaction,
};

/// Builder bound to one network and fee policy.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    network: Network,
    version: Version,
    lock_time: LockTime,
    fee_rate: FeeRate,
}

impl TransactionBuilder {
    /// Create a builder from a validated config.
    pub fn new(config: &SwapConfig) -> Result<Self, SwapError> {
        config.validate()?;
        Ok(Self {
            network: config.network,
            version: Version(config.version),
            lock_time: LockTime::from_consensus(config.locktime),
            fee_rate: config.fee_rate()?,
        })
    }

    /// Network outputs are encoded for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Fee rate applied to estimated weight.
    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Build a Fund transaction paying `amount` into `contract`.
    pub fn build_fund(
        &self,
        sender_address: &str,
        contract: &Contract,
        amount: Amount,
        utxos: &[PriorOutput],
        selection: CoinSelection,
    ) -> Result<UnsignedTransaction, SwapError> {
        let change_script = parse_address(sender_address, self.network)?.script_pubkey();
        let contract_script = contract.script_pubkey();

        let contract_dust = contract_script.minimal_non_dust();
        if amount < contract_dust {
            return Err(SwapError::InsufficientFunds {
                required: contract_dust.to_sat(),
                available: amount.to_sat(),
            });
        }
        ensure_distinct(utxos)?;
        fund_shapes(utxos)?;

        let fee_of = |inputs: &[PriorOutput], with_change: bool| {
            let change = with_change.then(|| (change_script.clone(), Amount::ZERO));
            let tx = self.fund_template(inputs, &contract_script, amount, change);
            Ok(estimate_fee(&tx, &fund_shapes(inputs)?, self.fee_rate))
        };
        let selected = select_inputs(
            utxos,
            amount,
            selection,
            change_script.minimal_non_dust(),
            fee_of,
        )?;

        let change = selected.change.map(|value| (change_script.clone(), value));
        let tx = self.fund_template(&selected.inputs, &contract_script, amount, change);
        let prevouts = selected.inputs.iter().map(PriorOutput::to_txout).collect();
        let unsigned = UnsignedTransaction::new(TransactionKind::Fund, self.network, tx, prevouts)?;

        info!(
            "[swap] Built fund {} for {} sat ({} inputs, fee {} sat)",
            unsigned.txid(),
            amount.to_sat(),
            selected.inputs.len(),
            unsigned.fee().to_sat()
        );
        Ok(unsigned)
    }

    /// Fee of a fund transaction spending `utxos` into `contract`.
    pub fn fund_fee(
        &self,
        contract: &Contract,
        utxos: &[PriorOutput],
        change_address: Option<&str>,
    ) -> Result<Amount, SwapError> {
        let change = change_address
            .map(|address| {
                parse_address(address, self.network).map(|a| (a.script_pubkey(), Amount::ZERO))
            })
            .transpose()?;
        ensure_distinct(utxos)?;
        let shapes = fund_shapes(utxos)?;
        let tx = self.fund_template(utxos, &contract.script_pubkey(), Amount::ZERO, change);
        Ok(estimate_fee(&tx, &shapes, self.fee_rate))
    }

    /// Build a Claim transaction spending `prior` to `recipient_address`.
    pub fn build_claim(
        &self,
        contract: &Contract,
        prior: &PriorOutput,
        recipient_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError> {
        self.build_spend(Branch::Claim, contract, prior, recipient_address, amount)
    }

    /// Build a Refund transaction spending `prior` back to `sender_address`.
    pub fn build_refund(
        &self,
        contract: &Contract,
        prior: &PriorOutput,
        sender_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError> {
        self.build_spend(Branch::Refund, contract, prior, sender_address, amount)
    }

    /// Fee of a claim or refund paying to `destination_address`.
    ///
    /// Independent of the contract output value.
    pub fn spend_fee(
        &self,
        branch: Branch,
        contract: &Contract,
        destination_address: &str,
    ) -> Result<Amount, SwapError> {
        let destination = parse_address(destination_address, self.network)?.script_pubkey();
        let (tx, shape) = self.spend_template(branch, contract, None, destination, Amount::ZERO);
        Ok(estimate_fee(&tx, &[shape], self.fee_rate))
    }

    fn build_spend(
        &self,
        branch: Branch,
        contract: &Contract,
        prior: &PriorOutput,
        destination_address: &str,
        amount: SpendAmount,
    ) -> Result<UnsignedTransaction, SwapError> {
        if prior.script_pubkey != contract.script_pubkey() {
            return Err(SwapError::MalformedReference(format!(
                "{} does not pay to the contract",
                prior.outpoint
            )));
        }
        let destination = parse_address(destination_address, self.network)?.script_pubkey();

        let spend = match amount {
            SpendAmount::Max => prior.amount,
            SpendAmount::Exact(value) if value > prior.amount => {
                return Err(SwapError::InsufficientFunds {
                    required: value.to_sat(),
                    available: prior.amount.to_sat(),
                })
            }
            SpendAmount::Exact(value) => value,
        };

        let (template, shape) =
            self.spend_template(branch, contract, Some(prior), destination.clone(), Amount::ZERO);
        let fee = estimate_fee(&template, &[shape], self.fee_rate);
        let dust = destination.minimal_non_dust();
        let required = fee.to_sat().saturating_add(dust.to_sat());
        if spend.to_sat() < required {
            return Err(SwapError::InsufficientFunds {
                required,
                available: spend.to_sat(),
            });
        }

        let (tx, _) = self.spend_template(branch, contract, Some(prior), destination, spend - fee);
        let kind = match branch {
            Branch::Claim => TransactionKind::Claim,
            Branch::Refund => TransactionKind::Refund,
        };
        let unsigned = UnsignedTransaction::new(kind, self.network, tx, vec![prior.to_txout()])?;

        debug!(
            "[swap] Built {} spending {} (fee {} sat)",
            unsigned.label(),
            prior.outpoint,
            unsigned.fee().to_sat()
        );
        Ok(unsigned)
    }

    fn fund_template(
        &self,
        inputs: &[PriorOutput],
        contract_script: &ScriptBuf,
        amount: Amount,
        change: Option<(ScriptBuf, Amount)>,
    ) -> Transaction {
        let mut output = vec![TxOut {
            value: amount,
            script_pubkey: contract_script.clone(),
        }];
        if let Some((script_pubkey, value)) = change {
            output.push(TxOut {
                value,
                script_pubkey,
            });
        }
        Transaction {
            version: self.version,
            lock_time: self.lock_time,
            input: inputs
                .iter()
                .map(|utxo| unsigned_input(utxo, Sequence::MAX))
                .collect(),
            output,
        }
    }

    fn spend_template(
        &self,
        branch: Branch,
        contract: &Contract,
        prior: Option<&PriorOutput>,
        destination: ScriptBuf,
        value: Amount,
    ) -> (Transaction, InputShape) {
        let sequence = match branch {
            Branch::Claim => Sequence::MAX,
            Branch::Refund => Sequence(contract.expiration),
        };
        let input = match prior {
            Some(prior) => unsigned_input(prior, sequence),
            None => TxIn {
                sequence,
                ..TxIn::default()
            },
        };
        let tx = Transaction {
            version: self.version,
            lock_time: self.lock_time,
            input: vec![input],
            output: vec![TxOut {
                value,
                script_pubkey: destination,
            }],
        };
        let shape = InputShape::Contract {
            branch,
            witness_script: contract.script(),
        };
        (tx, shape)
    }
}

fn unsigned_input(prior: &PriorOutput, sequence: Sequence) -> TxIn {
    TxIn {
        previous_output: prior.outpoint,
        script_sig: ScriptBuf::new(),
        sequence,
        witness: Witness::new(),
    }
}

fn fund_shapes(inputs: &[PriorOutput]) -> Result<Vec<InputShape>, SwapError> {
    inputs
        .iter()
        .map(|utxo| InputShape::for_fund_prevout(&utxo.script_pubkey))
        .collect()
}

/// A fund transaction may not spend the same outpoint twice.
fn ensure_distinct(inputs: &[PriorOutput]) -> Result<(), SwapError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    for utxo in inputs {
        if !seen.insert(utxo.outpoint) {
            return Err(SwapError::MalformedReference(format!(
                "{} is listed more than once",
                utxo.outpoint
            )));
        }
    }
    Ok(())
}
