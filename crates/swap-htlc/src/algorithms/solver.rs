//! # Solvers
//!
//! A solver owns the key material for one spending path and produces the
//! unlocking data for inputs on that path.
//!
//! | Solver | Spends | Unlocking data |
//! |--------|--------|----------------|
//! | Fund | P2PKH | `scriptSig = <sig> <pubkey>` |
//! | Fund | P2WPKH | `[sig, pubkey]` |
//! | Claim | contract | `[sig, pubkey, secret, 0x01, script]` |
//! | Refund | contract | `[sig, pubkey, <empty>, script]` |
//!
//! Solvers are immutable after construction and can be shared across
//! threads to sign many transactions concurrently.

use bitcoin::hashes::Hash as _;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{PublicKey, ScriptBuf, Sequence, Transaction, TxOut, Witness};

use super::secret::verify_claim_secret;
use crate::config::SwapConfig;
use crate::domain::{
    invariant_refund_sequence, Branch, Contract, KeyPath, Secret, SigningKey, SwapError,
    TransactionKind,
};
use crate::ports::KeyDeriver;

/// Unlocking data for one input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputUnlock {
    /// Legacy unlocking script.
    pub script_sig: ScriptBuf,
    /// Segwit witness stack.
    pub witness: Witness,
}

/// Spends the sender's own P2PKH or P2WPKH outputs into a contract.
#[derive(Debug)]
pub struct FundSolver {
    key: SigningKey,
}

impl FundSolver {
    /// Solver for an already-derived key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Derive the key from a root extended private key. BIP-44 paths use
    /// the coin type of `config`.
    pub fn from_root(
        deriver: &dyn KeyDeriver,
        root: &str,
        path: &KeyPath,
        config: &SwapConfig,
    ) -> Result<Self, SwapError> {
        Ok(Self::new(deriver.derive_key(root, path, config.coin_type)?))
    }
}

/// Spends a contract output through the hash-lock branch.
#[derive(Debug)]
pub struct ClaimSolver {
    key: SigningKey,
    secret: Secret,
    contract: Contract,
}

impl ClaimSolver {
    /// Fails with `SecretMismatch` unless `HASH256(secret)` is the contract
    /// hash lock, and with `InvalidSecret` if the preimage cannot be pushed
    /// in a standard witness.
    pub fn new(key: SigningKey, secret: Secret, contract: Contract) -> Result<Self, SwapError> {
        secret.check_pushable()?;
        verify_claim_secret(&secret, &contract)?;
        Ok(Self {
            key,
            secret,
            contract,
        })
    }

    /// Same as [`ClaimSolver::new`] with the contract given as bytecode.
    pub fn from_bytecode(
        key: SigningKey,
        secret: Secret,
        bytecode: &[u8],
    ) -> Result<Self, SwapError> {
        Self::new(key, secret, Contract::decode(bytecode)?)
    }

    /// Derive the key from a root extended private key.
    pub fn from_root(
        deriver: &dyn KeyDeriver,
        root: &str,
        path: &KeyPath,
        config: &SwapConfig,
        secret: Secret,
        contract: Contract,
    ) -> Result<Self, SwapError> {
        Self::new(
            deriver.derive_key(root, path, config.coin_type)?,
            secret,
            contract,
        )
    }
}

/// Spends a contract output through the time-lock branch.
#[derive(Debug)]
pub struct RefundSolver {
    key: SigningKey,
    contract: Contract,
}

impl RefundSolver {
    /// Refund solver for `contract`.
    pub fn new(key: SigningKey, contract: Contract) -> Self {
        Self { key, contract }
    }

    /// Same as [`RefundSolver::new`] with the contract given as bytecode.
    pub fn from_bytecode(key: SigningKey, bytecode: &[u8]) -> Result<Self, SwapError> {
        Ok(Self::new(key, Contract::decode(bytecode)?))
    }

    /// Derive the key from a root extended private key.
    pub fn from_root(
        deriver: &dyn KeyDeriver,
        root: &str,
        path: &KeyPath,
        config: &SwapConfig,
        contract: Contract,
    ) -> Result<Self, SwapError> {
        Ok(Self::new(
            deriver.derive_key(root, path, config.coin_type)?,
            contract,
        ))
    }
}

/// Solver for one of the three transaction kinds.
#[derive(Debug)]
pub enum Solver {
    /// Fund inputs.
    Fund(FundSolver),
    /// Claim input.
    Claim(ClaimSolver),
    /// Refund input.
    Refund(RefundSolver),
}

impl From<FundSolver> for Solver {
    fn from(solver: FundSolver) -> Self {
        Solver::Fund(solver)
    }
}

impl From<ClaimSolver> for Solver {
    fn from(solver: ClaimSolver) -> Self {
        Solver::Claim(solver)
    }
}

impl From<RefundSolver> for Solver {
    fn from(solver: RefundSolver) -> Self {
        Solver::Refund(solver)
    }
}

impl Solver {
    /// Transaction kind this solver signs.
    pub fn kind(&self) -> TransactionKind {
        match self {
            Solver::Fund(_) => TransactionKind::Fund,
            Solver::Claim(_) => TransactionKind::Claim,
            Solver::Refund(_) => TransactionKind::Refund,
        }
    }

    /// Contract spent by this solver.
    pub fn contract(&self) -> Option<&Contract> {
        match self {
            Solver::Fund(_) => None,
            Solver::Claim(s) => Some(&s.contract),
            Solver::Refund(s) => Some(&s.contract),
        }
    }

    /// Contract witness script, re-derived from the contract.
    pub fn witness_script(&self) -> Option<ScriptBuf> {
        self.contract().map(Contract::script)
    }

    /// Signing key.
    pub fn key(&self) -> &SigningKey {
        match self {
            Solver::Fund(s) => &s.key,
            Solver::Claim(s) => &s.key,
            Solver::Refund(s) => &s.key,
        }
    }

    /// Produce the unlocking data for input `index`.
    pub fn solve_input(
        &self,
        secp: &Secp256k1<All>,
        cache: &mut SighashCache<&Transaction>,
        index: usize,
        sequence: Sequence,
        prevout: &TxOut,
    ) -> Result<InputUnlock, SwapError> {
        match self {
            Solver::Fund(s) => solve_fund(&s.key, secp, cache, index, prevout),
            Solver::Claim(s) => {
                let witness_script =
                    contract_input(&s.contract, &s.key, Branch::Claim, index, prevout)?;
                let sig =
                    contract_signature(&s.key, secp, cache, index, &witness_script, prevout)?;
                Ok(InputUnlock {
                    script_sig: ScriptBuf::new(),
                    witness: Witness::from_slice(&[
                        sig,
                        s.key.public_key().to_bytes().to_vec(),
                        s.secret.as_bytes().to_vec(),
                        Branch::Claim.selector().to_vec(),
                        witness_script.into_bytes(),
                    ]),
                })
            }
            Solver::Refund(s) => {
                if !invariant_refund_sequence(sequence, &s.contract) {
                    return Err(SwapError::UnsatisfiableInput {
                        index,
                        reason: format!(
                            "sequence {} does not equal contract expiration {}",
                            sequence.to_consensus_u32(),
                            s.contract.expiration
                        ),
                    });
                }
                let witness_script =
                    contract_input(&s.contract, &s.key, Branch::Refund, index, prevout)?;
                let sig =
                    contract_signature(&s.key, secp, cache, index, &witness_script, prevout)?;
                Ok(InputUnlock {
                    script_sig: ScriptBuf::new(),
                    witness: Witness::from_slice(&[
                        sig,
                        s.key.public_key().to_bytes().to_vec(),
                        Branch::Refund.selector().to_vec(),
                        witness_script.into_bytes(),
                    ]),
                })
            }
        }
    }
}

fn unsatisfiable(index: usize, reason: impl Into<String>) -> SwapError {
    SwapError::UnsatisfiableInput {
        index,
        reason: reason.into(),
    }
}

fn solve_fund(
    key: &SigningKey,
    secp: &Secp256k1<All>,
    cache: &mut SighashCache<&Transaction>,
    index: usize,
    prevout: &TxOut,
) -> Result<InputUnlock, SwapError> {
    let script = &prevout.script_pubkey;
    let bytes = script.as_bytes();
    let pubkey_hash = key.pubkey_hash();

    if script.is_p2pkh() {
        if bytes[3..23] != pubkey_hash {
            return Err(unsatisfiable(index, "key does not control this P2PKH output"));
        }
        let sighash = cache
            .legacy_signature_hash(index, script, EcdsaSighashType::All.to_u32())
            .map_err(|e| unsatisfiable(index, e.to_string()))?;
        let sig = key.sign_sighash(secp, sighash.to_byte_array());
        let sig = PushBytesBuf::try_from(sig).map_err(|e| unsatisfiable(index, e.to_string()))?;
        let script_sig = Builder::new()
            .push_slice(sig)
            .push_key(&PublicKey::new(key.public_key().0))
            .into_script();
        Ok(InputUnlock {
            script_sig,
            witness: Witness::new(),
        })
    } else if script.is_p2wpkh() {
        if bytes[2..22] != pubkey_hash {
            return Err(unsatisfiable(index, "key does not control this P2WPKH output"));
        }
        let sighash = cache
            .p2wpkh_signature_hash(index, script, prevout.value, EcdsaSighashType::All)
            .map_err(|e| unsatisfiable(index, e.to_string()))?;
        let sig = key.sign_sighash(secp, sighash.to_byte_array());
        Ok(InputUnlock {
            script_sig: ScriptBuf::new(),
            witness: Witness::from_slice(&[sig, key.public_key().to_bytes().to_vec()]),
        })
    } else {
        Err(unsatisfiable(
            index,
            "fund solver only spends P2PKH or P2WPKH outputs",
        ))
    }
}

/// Check that `prevout` is the contract output and `key` owns `branch`.
fn contract_input(
    contract: &Contract,
    key: &SigningKey,
    branch: Branch,
    index: usize,
    prevout: &TxOut,
) -> Result<ScriptBuf, SwapError> {
    if prevout.script_pubkey != contract.script_pubkey() {
        return Err(unsatisfiable(index, "input does not spend the contract output"));
    }
    let (expected, party) = match branch {
        Branch::Claim => (contract.recipient_pubkey_hash, "recipient"),
        Branch::Refund => (contract.sender_pubkey_hash, "sender"),
    };
    if key.pubkey_hash() != expected {
        return Err(unsatisfiable(
            index,
            format!("key does not match the contract {party}"),
        ));
    }
    Ok(contract.script())
}

fn contract_signature(
    key: &SigningKey,
    secp: &Secp256k1<All>,
    cache: &mut SighashCache<&Transaction>,
    index: usize,
    witness_script: &ScriptBuf,
    prevout: &TxOut,
) -> Result<Vec<u8>, SwapError> {
    let sighash = cache
        .p2wsh_signature_hash(index, witness_script, prevout.value, EcdsaSighashType::All)
        .map_err(|e| unsatisfiable(index, e.to_string()))?;
    Ok(key.sign_sighash(secp, sighash.to_byte_array()))
}
