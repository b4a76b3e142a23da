//! BIP-32 Key Deriver Adapter
//!
//! Implements `KeyDeriver` on top of the `bitcoin` crate's BIP-32 support.

use std::str::FromStr;

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{All, Secp256k1};
use tracing::debug;

use crate::domain::{SigningKey, SwapError};
use crate::ports::outbound::KeyDeriver;

/// Derives child keys from a base58 `xprv`/`tprv` root.
pub struct Bip32KeyDeriver {
    secp: Secp256k1<All>,
}

impl Bip32KeyDeriver {
    /// Create a deriver.
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Bip32KeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDeriver for Bip32KeyDeriver {
    fn derive_private_key(&self, root: &str, path: &str) -> Result<SigningKey, SwapError> {
        let root = Xpriv::from_str(root)
            .map_err(|e| SwapError::InvalidKey(format!("root extended private key: {e}")))?;
        let path = DerivationPath::from_str(path)
            .map_err(|e| SwapError::InvalidKey(format!("derivation path {path:?}: {e}")))?;
        let child = root
            .derive_priv(&self.secp, &path)
            .map_err(|e| SwapError::InvalidKey(format!("derivation failed: {e}")))?;

        debug!("[swap] Derived key at {}", path);
        Ok(SigningKey::from_secret_key(child.private_key))
    }
}
