//! # Signature Object
//!
//! Second signing entry point. Takes the serialized "transaction raw"
//! envelope instead of the in-memory transaction, rebuilds it and signs it
//! with the same [`Signer`]. For the same transaction and solver both
//! entry points produce byte-identical signed transactions;
//! [`verify_signing_equivalence`] checks exactly that at runtime.

use tracing::{debug, warn};

use super::signer::Signer;
use super::solver::Solver;
use crate::domain::{Network, SignedTransaction, SwapError, UnsignedTransaction};

/// Signs serialized unsigned transactions for one network.
#[derive(Clone, Debug)]
pub struct Signature {
    network: Network,
    signer: Signer,
}

impl Signature {
    /// Signature object for `network`.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            signer: Signer::new(),
        }
    }

    /// Network this object accepts.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Decode `transaction_raw` and sign it with `solver`.
    pub fn sign(
        &self,
        transaction_raw: &str,
        solver: &Solver,
    ) -> Result<SignedTransaction, SwapError> {
        let unsigned = UnsignedTransaction::from_raw(transaction_raw)?;
        if unsigned.network() != self.network {
            return Err(SwapError::InvalidNetwork(format!(
                "transaction raw is for {}, expected {}",
                unsigned.network(),
                self.network
            )));
        }
        self.signer.sign(&unsigned, solver)
    }
}

/// Sign `unsigned` directly and through its serialized form, and require
/// both results to be byte-identical.
pub fn verify_signing_equivalence(
    unsigned: &UnsignedTransaction,
    solver: &Solver,
) -> Result<SignedTransaction, SwapError> {
    let direct = Signer::new().sign(unsigned, solver)?;
    let designated = Signature::new(unsigned.network()).sign(&unsigned.to_raw()?, solver)?;

    if direct.to_bytes() != designated.to_bytes() || direct.prevouts() != designated.prevouts() {
        warn!(
            "[swap] Signing paths diverged for {}: {} vs {}",
            unsigned.txid(),
            direct.wtxid(),
            designated.wtxid()
        );
        return Err(SwapError::SignatureDivergence {
            direct: direct.wtxid().to_string(),
            designated: designated.wtxid().to_string(),
        });
    }
    debug!("[swap] Signing paths agree on {}", direct.wtxid());
    Ok(direct)
}
