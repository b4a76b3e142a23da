//! # Signing Key
//!
//! secp256k1 private key owned by a solver. Erased on drop, never printed.

use bitcoin::ecdsa;
use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use bitcoin::CompressedPublicKey;

use super::errors::{PubkeyHash, SwapError};

/// A private key together with its compressed public key.
pub struct SigningKey {
    secret_key: SecretKey,
    public_key: CompressedPublicKey,
}

impl SigningKey {
    /// Wrap an already-derived secret key.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = CompressedPublicKey(secret_key.public_key(&secp));
        Self {
            secret_key,
            public_key,
        }
    }

    /// Parse 32 raw private key bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SwapError> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|_| SwapError::InvalidKey("not a valid secp256k1 private key".to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let bytes = hex::decode(s)
            .map_err(|_| SwapError::InvalidKey("private key is not valid hex".to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Compressed public key.
    pub fn public_key(&self) -> CompressedPublicKey {
        self.public_key
    }

    /// HASH160 of the compressed public key.
    pub fn pubkey_hash(&self) -> PubkeyHash {
        self.public_key.pubkey_hash().to_byte_array()
    }

    /// Sign a 32-byte sighash with `SIGHASH_ALL`.
    ///
    /// RFC-6979 nonces ground to low R, normalized low S: the DER encoding
    /// plus sighash byte is at most 72 bytes and identical on every call.
    pub fn sign_sighash(&self, secp: &Secp256k1<All>, sighash: [u8; 32]) -> Vec<u8> {
        let message = Message::from_digest(sighash);
        let signature = secp.sign_ecdsa_low_r(&message, &self.secret_key);
        ecdsa::Signature::sighash_all(signature).to_vec()
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &hex::encode(self.public_key.to_bytes()))
            .field("secret_key", &"***")
            .finish()
    }
}
