//! # Domain Invariants
//!
//! Rules every contract spend must respect.

use bitcoin::{Sequence, TxIn};

use super::contract::{Contract, SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG};
use super::errors::Hash;
use super::secure_secret::hash256;

/// BIP-68 disable flag.
const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// Invariant: Secret matches hashlock.
///
/// HASH256(secret) must equal hashlock for valid claim. The secret may be
/// any length.
pub fn invariant_secret_matches(secret: &[u8], hashlock: &Hash) -> bool {
    hash256(secret) == *hashlock
}

/// Invariant: a refund input carries the contract expiration as its sequence.
pub fn invariant_refund_sequence(sequence: Sequence, contract: &Contract) -> bool {
    sequence.to_consensus_u32() == contract.expiration
}

/// Invariant: `OP_CHECKSEQUENCEVERIFY` accepts `sequence` against `expiration`.
///
/// Follows BIP-112. Relative locks need version 2 and a clear disable flag.
/// Units must agree before values are compared.
pub fn invariant_relative_timelock_satisfied(
    tx_version: i32,
    sequence: Sequence,
    expiration: u32,
) -> bool {
    let sequence = sequence.to_consensus_u32();
    if tx_version < 2 || sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
        return false;
    }
    let unit_mask = SEQUENCE_LOCKTIME_TYPE_FLAG;
    if sequence & unit_mask != expiration & unit_mask {
        return false;
    }
    sequence & SEQUENCE_LOCKTIME_MASK >= expiration & SEQUENCE_LOCKTIME_MASK
}

/// Invariant: a signed input carries a witness or a scriptSig.
pub fn invariant_input_unlocked(txin: &TxIn) -> bool {
    !txin.witness.is_empty() || !txin.script_sig.is_empty()
}

/// Invariant: a refund may be relayed once enough blocks confirmed the fund output.
///
/// Block-based locks only; time-based locks need median time past.
pub fn invariant_refund_relayable(confirmations: u32, contract: &Contract) -> bool {
    confirmations >= contract.lock_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(expiration: u32) -> Contract {
        Contract::build([1u8; 32], [2u8; 20], [3u8; 20], expiration).unwrap()
    }

    #[test]
    fn test_secret_matches() {
        let hashlock: Hash =
            hex::decode("821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e0158")
                .unwrap()
                .try_into()
                .unwrap();
        assert!(invariant_secret_matches(b"Hello Meheret!", &hashlock));
        assert!(!invariant_secret_matches(b"Hello Meheret", &hashlock));
        // single SHA-256 of the passphrase is not a valid preimage
        let single =
            hex::decode("3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb").unwrap();
        assert!(!invariant_secret_matches(&single, &hashlock));
    }

    #[test]
    fn test_input_unlocked() {
        let mut segwit = TxIn::default();
        assert!(!invariant_input_unlocked(&segwit));
        segwit.witness.push([1u8]);
        assert!(invariant_input_unlocked(&segwit));

        let legacy = TxIn {
            script_sig: bitcoin::ScriptBuf::from_bytes(vec![0x51]),
            ..Default::default()
        };
        assert!(invariant_input_unlocked(&legacy));
    }

    #[test]
    fn test_refund_sequence() {
        let c = contract(1000);
        assert!(invariant_refund_sequence(Sequence(1000), &c));
        assert!(!invariant_refund_sequence(Sequence(999), &c));
        assert!(!invariant_refund_sequence(Sequence::MAX, &c));
    }

    #[test]
    fn test_relative_timelock() {
        assert!(invariant_relative_timelock_satisfied(2, Sequence(1000), 1000));
        assert!(invariant_relative_timelock_satisfied(2, Sequence(1001), 1000));
        assert!(!invariant_relative_timelock_satisfied(2, Sequence(999), 1000));
        assert!(!invariant_relative_timelock_satisfied(1, Sequence(1000), 1000));
        assert!(!invariant_relative_timelock_satisfied(2, Sequence::MAX, 1000));
    }

    #[test]
    fn test_relative_timelock_units_must_match() {
        let time_lock = SEQUENCE_LOCKTIME_TYPE_FLAG | 10;
        assert!(invariant_relative_timelock_satisfied(2, Sequence(time_lock), time_lock));
        assert!(!invariant_relative_timelock_satisfied(2, Sequence(10), time_lock));
        assert!(!invariant_relative_timelock_satisfied(2, Sequence(time_lock), 10));
    }

    #[test]
    fn test_refund_relayable() {
        let c = contract(6);
        assert!(!invariant_refund_relayable(5, &c));
        assert!(invariant_refund_relayable(6, &c));
        assert!(invariant_refund_relayable(100, &c));
    }
}
