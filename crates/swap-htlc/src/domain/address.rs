//! # Addresses
//!
//! Network-checked address parsing for contract parties and outputs.

use bitcoin::address::NetworkUnchecked;
use bitcoin::Address;
use std::str::FromStr;

use super::errors::{PubkeyHash, SwapError};
use super::value_objects::Network;

/// Parse an address and require it to belong to `network`.
pub fn parse_address(address: &str, network: Network) -> Result<Address, SwapError> {
    let unchecked = Address::<NetworkUnchecked>::from_str(address)
        .map_err(|e| SwapError::InvalidAddress(format!("{address}: {e}")))?;
    if !unchecked.is_valid_for_network(network.to_bitcoin()) {
        return Err(SwapError::InvalidNetwork(format!(
            "{address} is not a {network} address"
        )));
    }
    Ok(unchecked.assume_checked())
}

/// Extract the HASH160 of the key behind a P2PKH or P2WPKH address.
pub fn pubkey_hash_of(address: &str, network: Network) -> Result<PubkeyHash, SwapError> {
    let script = parse_address(address, network)?.script_pubkey();
    let bytes = script.as_bytes();
    let hash = if script.is_p2pkh() {
        // OP_DUP OP_HASH160 <20> ... OP_EQUALVERIFY OP_CHECKSIG
        &bytes[3..23]
    } else if script.is_p2wpkh() {
        // OP_0 <20>
        &bytes[2..22]
    } else {
        return Err(SwapError::InvalidAddress(format!(
            "{address} is not a P2PKH or P2WPKH address"
        )));
    };
    let mut out = [0u8; 20];
    out.copy_from_slice(hash);
    Ok(out)
}
