//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: BIP-32 key derivation and a simulated
//! chain for tests and demos.

mod bip32_deriver;
mod in_memory_chain;

pub use bip32_deriver::Bip32KeyDeriver;
pub use in_memory_chain::{InMemoryChain, GENESIS_HEIGHT};
