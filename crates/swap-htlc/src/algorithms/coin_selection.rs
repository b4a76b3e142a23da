//! # Coin Selection
//!
//! Picks fund inputs covering `amount + fee` and decides whether a change
//! output is worth creating.

use bitcoin::Amount;

use crate::domain::{CoinSelection, PriorOutput, SwapError};

/// Result of selecting fund inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Inputs to spend, in transaction order.
    pub inputs: Vec<PriorOutput>,
    /// Change returned to the sender, if any.
    pub change: Option<Amount>,
    /// Fee paid (inputs minus amount minus change).
    pub fee: Amount,
}

/// Select inputs for a fund transaction.
///
/// `fee_of(inputs, with_change)` estimates the fee of a fund transaction
/// spending `inputs`, with or without a change output. Its errors abort the
/// selection. Change is created
/// only when it would be at least `change_dust`; otherwise the remainder
/// goes to the fee.
pub fn select_inputs<F>(
    utxos: &[PriorOutput],
    amount: Amount,
    strategy: CoinSelection,
    change_dust: Amount,
    fee_of: F,
) -> Result<Selection, SwapError>
where
    F: Fn(&[PriorOutput], bool) -> Result<Amount, SwapError>,
{
    let mut ordered = utxos.to_vec();
    if strategy == CoinSelection::LargestFirst {
        // Stable: equal amounts keep caller order.
        ordered.sort_by(|a, b| b.amount.cmp(&a.amount));
    }

    let mut selected: Vec<PriorOutput> = Vec::with_capacity(ordered.len());
    let mut total = 0u64;
    for utxo in ordered {
        total = total.saturating_add(utxo.amount.to_sat());
        selected.push(utxo);
        if strategy == CoinSelection::LargestFirst
            && covers(total, amount, fee_of(&selected, false)?)
        {
            return finish(selected, total, amount, change_dust, &fee_of);
        }
    }

    let fee = fee_of(&selected, false)?;
    if strategy == CoinSelection::All && !selected.is_empty() && covers(total, amount, fee) {
        return finish(selected, total, amount, change_dust, &fee_of);
    }
    Err(SwapError::InsufficientFunds {
        required: amount.to_sat().saturating_add(fee.to_sat()),
        available: total,
    })
}

fn covers(total: u64, amount: Amount, fee: Amount) -> bool {
    total >= amount.to_sat().saturating_add(fee.to_sat())
}

fn finish<F>(
    inputs: Vec<PriorOutput>,
    total: u64,
    amount: Amount,
    change_dust: Amount,
    fee_of: &F,
) -> Result<Selection, SwapError>
where
    F: Fn(&[PriorOutput], bool) -> Result<Amount, SwapError>,
{
    let fee_with_change = fee_of(&inputs, true)?.to_sat();
    let spendable = total - amount.to_sat();
    if spendable >= fee_with_change.saturating_add(change_dust.to_sat()) {
        Ok(Selection {
            inputs,
            change: Some(Amount::from_sat(spendable - fee_with_change)),
            fee: Amount::from_sat(fee_with_change),
        })
    } else {
        Ok(Selection {
            inputs,
            change: None,
            fee: Amount::from_sat(spendable),
        })
    }
}
