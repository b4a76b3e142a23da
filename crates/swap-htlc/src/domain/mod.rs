//! # Domain Module
//!
//! Core domain types: contract, transactions, secrets and errors.

pub mod address;
pub mod contract;
pub mod errors;
pub mod invariants;
pub mod secure_secret;
pub mod signing_key;
pub mod transaction;
pub mod value_objects;

pub use address::*;
pub use contract::*;
pub use errors::*;
pub use invariants::*;
pub use secure_secret::{hash256, Secret, MAX_SECRET_LEN};
pub use signing_key::SigningKey;
pub use transaction::*;
pub use value_objects::*;
