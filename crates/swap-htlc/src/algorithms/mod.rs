//! # Algorithms Module
//!
//! Transaction building, fee estimation, solving and signing.

pub mod builder;
pub mod coin_selection;
pub mod fee;
pub mod secret;
pub mod signature;
pub mod signer;
pub mod solver;
pub mod verifier;

pub use builder::TransactionBuilder;
pub use coin_selection::{select_inputs, Selection};
pub use fee::{estimate_fee, estimate_weight, fee_for_weight, InputShape};
pub use secret::{create_hash_lock, generate_random_secret, verify_claim_secret, verify_secret};
pub use signature::{verify_signing_equivalence, Signature};
pub use signer::Signer;
pub use solver::{ClaimSolver, FundSolver, InputUnlock, RefundSolver, Solver};
pub use verifier::verify_contract_spend;
