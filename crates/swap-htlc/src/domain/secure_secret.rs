//! # Secure Secret Type
//!
//! Wrapper for HTLC preimages that zeroizes memory on drop.
//!
//! A preimage is an opaque byte string of any length; a passphrase is used
//! as-is. The hash lock is HASH256 (double SHA-256) of those bytes, which is
//! what `OP_HASH256` computes when the claim witness is evaluated.
//!
//! The raw secret only ever leaves this type when it is pushed into a
//! claim witness. `Debug` is redacted so it cannot end up in logs.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::{Hash, SwapError};

/// Largest preimage a claim witness may push.
///
/// Matches the standardness limit on P2WSH witness stack items, so longer
/// claims would not relay.
pub const MAX_SECRET_LEN: usize = 80;

/// An HTLC preimage that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    inner: Vec<u8>,
}

impl Secret {
    /// Wrap raw preimage bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { inner: bytes }
    }

    /// Copy a preimage out of a slice.
    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            inner: slice.to_vec(),
        }
    }

    /// Parse a hex-encoded preimage.
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let bytes = hex::decode(s).map_err(|e| SwapError::InvalidSecret(e.to_string()))?;
        Ok(Self { inner: bytes })
    }

    /// Use the UTF-8 bytes of `passphrase` as the preimage.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::from_slice(passphrase.as_bytes())
    }

    /// Raw preimage bytes. Use immediately and let go.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Preimage length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True for the empty preimage.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check the preimage fits in a standard claim witness.
    pub fn check_pushable(&self) -> Result<(), SwapError> {
        if self.inner.is_empty() || self.inner.len() > MAX_SECRET_LEN {
            return Err(SwapError::InvalidSecret(format!(
                "preimage must be 1 to {MAX_SECRET_LEN} bytes, got {}",
                self.inner.len()
            )));
        }
        Ok(())
    }

    /// Hash lock committing to this secret: `SHA-256(SHA-256(secret))`.
    pub fn hash_lock(&self) -> Hash {
        hash256(&self.inner)
    }
}

/// HASH256 of `bytes`, as `OP_HASH256` computes it.
pub fn hash256(bytes: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(Sha256::digest(bytes)));
    hash
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the actual secret
        f.write_str("Secret(***)")
    }
}
