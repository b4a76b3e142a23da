//! # Swap HTLC
//!
//! Hash time-locked contract core for cross-chain atomic swaps on Bitcoin.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Two parties trade assets across chains without trusting each other:
//! - The sender locks value in a P2WSH contract (Fund)
//! - The recipient takes it by revealing the HASH256 preimage (Claim)
//! - After the relative time-lock the sender takes it back (Refund)
//!
//! ## Signing Paths
//!
//! | Path | Input | Entry point |
//! |------|-------|-------------|
//! | Direct | `UnsignedTransaction` | [`Signer::sign`] |
//! | Signature object | base64 "transaction raw" | [`Signature::sign`] |
//!
//! Both paths produce byte-identical signed transactions for the same
//! transaction and solver.
//!
//! ## Module Structure
//!
//! ```text
//! swap-htlc/
//! ├── domain/          # Contract, Secret, SigningKey, transactions, errors
//! ├── algorithms/      # Builder, fees, coin selection, solvers, signing
//! ├── ports/           # SwapApi, ChainClient, KeyDeriver
//! ├── adapters/        # Bip32KeyDeriver, InMemoryChain
//! ├── application/     # SwapService
//! ├── config.rs        # SwapConfig (TOML)
//! └── telemetry.rs     # tracing subscriber
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

// Re-exports
pub use adapters::{Bip32KeyDeriver, InMemoryChain};
pub use algorithms::{
    create_hash_lock, generate_random_secret, verify_claim_secret, verify_contract_spend,
    verify_secret, verify_signing_equivalence, ClaimSolver, FundSolver, RefundSolver, Signature,
    Signer, Solver, TransactionBuilder,
};
pub use application::SwapService;
pub use config::{LogConfig, SwapConfig};
pub use domain::{
    Branch, CoinSelection, Contract, Hash, KeyPath, Network, PriorOutput, PubkeyHash, Secret,
    SignedTransaction, SigningKey, SpendAmount, SwapError, TransactionKind, UnsignedTransaction,
};
pub use ports::{ChainClient, KeyDeriver, SwapApi};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
