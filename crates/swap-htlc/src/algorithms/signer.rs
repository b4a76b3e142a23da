//! # Signer
//!
//! Applies a [`Solver`] to an [`UnsignedTransaction`]. Signing is
//! deterministic and all-or-nothing: either every input gets unlocking data
//! or an error is returned and nothing is exposed.

use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::sighash::SighashCache;
use tracing::debug;

use super::solver::{InputUnlock, Solver};
use crate::domain::{SignedTransaction, SwapError, UnsignedTransaction};

/// Transaction signer.
#[derive(Clone, Debug)]
pub struct Signer {
    secp: Secp256k1<All>,
}

impl Signer {
    /// Create a signer with a fresh secp256k1 context.
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Sign every input of `unsigned` with `solver`.
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        solver: &Solver,
    ) -> Result<SignedTransaction, SwapError> {
        if solver.kind() != unsigned.kind() {
            return Err(SwapError::UnsatisfiableInput {
                index: 0,
                reason: format!(
                    "{:?} solver cannot sign a {:?} transaction",
                    solver.kind(),
                    unsigned.kind()
                ),
            });
        }

        let tx = unsigned.transaction();
        let mut cache = SighashCache::new(tx);
        let unlocks = tx
            .input
            .iter()
            .zip(unsigned.prevouts())
            .enumerate()
            .map(|(index, (txin, prevout))| {
                solver.solve_input(&self.secp, &mut cache, index, txin.sequence, prevout)
            })
            .collect::<Result<Vec<InputUnlock>, SwapError>>()?;

        let mut signed = tx.clone();
        for (txin, unlock) in signed.input.iter_mut().zip(unlocks) {
            txin.script_sig = unlock.script_sig;
            txin.witness = unlock.witness;
        }
        let signed = SignedTransaction::new(
            unsigned.kind(),
            unsigned.network(),
            signed,
            unsigned.prevouts().to_vec(),
        )?;

        debug!("[swap] Signed {} {}", signed.label(), signed.txid());
        Ok(signed)
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}
