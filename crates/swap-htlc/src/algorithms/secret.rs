//! # Secret Generation and Verification
//!
//! Preimages for contract hash locks: generation and checks.

use rand::RngCore;

use crate::domain::{Contract, Hash, Secret, SwapError};

/// Length of generated secrets.
pub const RANDOM_SECRET_LEN: usize = 32;

/// Generate a cryptographically secure random secret.
pub fn generate_random_secret() -> Secret {
    let mut bytes = vec![0u8; RANDOM_SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    Secret::new(bytes)
}

/// Create a hashlock from a secret using HASH256.
pub fn create_hash_lock(secret: &Secret) -> Hash {
    secret.hash_lock()
}

/// Verify that a secret matches a hashlock.
pub fn verify_secret(secret: &Secret, hash_lock: &Hash) -> bool {
    ct_eq(&secret.hash_lock(), hash_lock)
}

/// Check a claim secret against a contract.
///
/// The error never says which hash was expected.
pub fn verify_claim_secret(secret: &Secret, contract: &Contract) -> Result<(), SwapError> {
    if !verify_secret(secret, &contract.hash_lock) {
        return Err(SwapError::SecretMismatch);
    }
    Ok(())
}

/// Compare without early exit.
fn ct_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_secret() {
        let s1 = generate_random_secret();
        let s2 = generate_random_secret();
        assert_ne!(s1, s2); // Should be different
        assert_eq!(s1.len(), RANDOM_SECRET_LEN);
    }

    #[test]
    fn test_create_hash_lock_deterministic() {
        let secret = Secret::new(vec![0xABu8; 32]);
        assert_eq!(create_hash_lock(&secret), create_hash_lock(&secret));
    }

    #[test]
    fn test_create_hash_lock_different_secrets() {
        let s1 = Secret::new(vec![0xABu8; 32]);
        let s2 = Secret::new(vec![0xCDu8; 32]);
        assert_ne!(create_hash_lock(&s1), create_hash_lock(&s2));
    }

    #[test]
    fn test_verify_secret_valid() {
        let secret = generate_random_secret();
        let hash_lock = create_hash_lock(&secret);
        assert!(verify_secret(&secret, &hash_lock));
    }

    #[test]
    fn test_verify_secret_invalid() {
        let secret = Secret::new(vec![0xABu8; 32]);
        assert!(!verify_secret(&secret, &[0xCDu8; 32]));
    }

    #[test]
    fn test_verify_claim_secret() {
        let secret = Secret::from_passphrase("Hello Meheret!");
        let contract = Contract::build(secret.hash_lock(), [1u8; 20], [2u8; 20], 10).unwrap();
        assert!(verify_claim_secret(&secret, &contract).is_ok());

        let wrong = Secret::from_passphrase("Hello Meheret?");
        assert!(matches!(
            verify_claim_secret(&wrong, &contract),
            Err(SwapError::SecretMismatch)
        ));
    }
}
