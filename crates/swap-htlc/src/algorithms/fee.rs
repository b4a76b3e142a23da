//! # Fee Estimation
//!
//! Fees are computed before any unlocking data exists. Each input is
//! filled with worst-case placeholder data for its spend path, the weight
//! of that transaction is measured and the fee rate applied, rounding up.
//!
//! | Input | Placeholder |
//! |-------|-------------|
//! | P2PKH | `scriptSig = <sig:72> <pubkey:33>` |
//! | P2WPKH | `[sig:72, pubkey:33]` |
//! | Contract claim | `[sig:72, pubkey:33, secret:80, 0x01, script]` |
//! | Contract refund | `[sig:72, pubkey:33, <empty>, script]` |
//!
//! Signatures are always low-R and at most 72 bytes with the sighash
//! byte, so the real transaction is never heavier than the estimate.

use bitcoin::{Amount, FeeRate, ScriptBuf, Transaction, Weight, Witness};

use crate::domain::{Branch, SwapError, MAX_SECRET_LEN};

/// DER signature plus sighash byte, worst case.
pub const SIGNATURE_PLACEHOLDER_LEN: usize = 72;

/// Compressed public key.
pub const PUBKEY_LEN: usize = 33;

/// How an input will be unlocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputShape {
    /// Legacy pay-to-pubkey-hash.
    P2pkh,
    /// Segwit v0 pay-to-witness-pubkey-hash.
    P2wpkh,
    /// HTLC contract output spent through `branch`.
    Contract {
        /// Branch taken.
        branch: Branch,
        /// Contract witness script.
        witness_script: ScriptBuf,
    },
}

impl InputShape {
    /// Shape of a fund input, from the locking script it spends.
    pub fn for_fund_prevout(script_pubkey: &ScriptBuf) -> Result<Self, SwapError> {
        if script_pubkey.is_p2pkh() {
            Ok(InputShape::P2pkh)
        } else if script_pubkey.is_p2wpkh() {
            Ok(InputShape::P2wpkh)
        } else {
            Err(SwapError::MalformedReference(
                "fund inputs must spend P2PKH or P2WPKH outputs".to_string(),
            ))
        }
    }

    fn placeholder(&self) -> (ScriptBuf, Witness) {
        let sig = vec![0u8; SIGNATURE_PLACEHOLDER_LEN];
        let pubkey = vec![0u8; PUBKEY_LEN];
        match self {
            InputShape::P2pkh => {
                let mut script_sig = Vec::with_capacity(2 + sig.len() + pubkey.len());
                script_sig.push(sig.len() as u8);
                script_sig.extend_from_slice(&sig);
                script_sig.push(pubkey.len() as u8);
                script_sig.extend_from_slice(&pubkey);
                (ScriptBuf::from_bytes(script_sig), Witness::new())
            }
            InputShape::P2wpkh => (ScriptBuf::new(), Witness::from_slice(&[sig, pubkey])),
            InputShape::Contract {
                branch: Branch::Claim,
                witness_script,
            } => (
                ScriptBuf::new(),
                Witness::from_slice(&[
                    sig,
                    pubkey,
                    vec![0u8; MAX_SECRET_LEN],
                    Branch::Claim.selector().to_vec(),
                    witness_script.to_bytes(),
                ]),
            ),
            InputShape::Contract {
                branch: Branch::Refund,
                witness_script,
            } => (
                ScriptBuf::new(),
                Witness::from_slice(&[
                    sig,
                    pubkey,
                    Branch::Refund.selector().to_vec(),
                    witness_script.to_bytes(),
                ]),
            ),
        }
    }
}

/// Weight of `tx` once every input carries its placeholder unlocking data.
pub fn estimate_weight(tx: &Transaction, shapes: &[InputShape]) -> Weight {
    let mut filled = tx.clone();
    for (txin, shape) in filled.input.iter_mut().zip(shapes) {
        let (script_sig, witness) = shape.placeholder();
        txin.script_sig = script_sig;
        txin.witness = witness;
    }
    filled.weight()
}

/// `ceil(weight × rate / 1000)` with the rate in sat per 1000 weight units.
pub fn fee_for_weight(weight: Weight, fee_rate: FeeRate) -> Amount {
    let numerator = weight.to_wu().saturating_mul(fee_rate.to_sat_per_kwu());
    Amount::from_sat(numerator.div_ceil(1000))
}

/// Estimated fee of `tx` unlocked as `shapes`.
pub fn estimate_fee(tx: &Transaction, shapes: &[InputShape], fee_rate: FeeRate) -> Amount {
    fee_for_weight(estimate_weight(tx, shapes), fee_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{OutPoint, Sequence, TxIn, TxOut};

    fn one_in_one_out() -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::ZERO,
                script_pubkey: ScriptBuf::from_bytes(vec![0u8; 22]),
            }],
        }
    }

    fn contract_shape(branch: Branch) -> InputShape {
        InputShape::Contract {
            branch,
            witness_script: ScriptBuf::from_bytes(vec![0x51; 93]),
        }
    }

    #[test]
    fn test_fee_rounds_up() {
        let rate = FeeRate::from_sat_per_vb(1).unwrap();
        assert_eq!(fee_for_weight(Weight::from_wu(4), rate), Amount::from_sat(1));
        assert_eq!(fee_for_weight(Weight::from_wu(5), rate), Amount::from_sat(2));
        assert_eq!(fee_for_weight(Weight::from_wu(0), rate), Amount::ZERO);
    }

    #[test]
    fn test_fee_matches_vsize_times_rate() {
        let rate = FeeRate::from_sat_per_vb(10).unwrap();
        let tx = one_in_one_out();
        let weight = estimate_weight(&tx, &[InputShape::P2wpkh]);
        let vbytes = weight.to_wu().div_ceil(4);
        let fee = fee_for_weight(weight, rate).to_sat();
        assert!(fee <= vbytes * 10);
        assert!(fee > (vbytes - 1) * 10);
    }

    #[test]
    fn test_claim_witness_heavier_than_refund() {
        let tx = one_in_one_out();
        let claim = estimate_weight(&tx, &[contract_shape(Branch::Claim)]);
        let refund = estimate_weight(&tx, &[contract_shape(Branch::Refund)]);
        // longest secret (1 + 80) plus selector byte (1)
        assert_eq!(claim.to_wu() - refund.to_wu(), 1 + MAX_SECRET_LEN as u64 + 1);
    }

    #[test]
    fn test_legacy_input_counts_four_times() {
        let tx = one_in_one_out();
        let legacy = estimate_weight(&tx, &[InputShape::P2pkh]);
        let bare = tx.weight();
        // 107-byte scriptSig, its length prefix stays one byte
        assert_eq!(legacy.to_wu() - bare.to_wu(), 107 * 4);
    }

    #[test]
    fn test_fund_shapes() {
        let p2pkh = ScriptBuf::from_bytes(
            hex::decode("76a91433ecab3d67f0e2bde43e52f41ec1ecbdc73f11f888ac").unwrap(),
        );
        assert_eq!(InputShape::for_fund_prevout(&p2pkh).unwrap(), InputShape::P2pkh);
        let p2wpkh = ScriptBuf::from_bytes(
            hex::decode("001433ecab3d67f0e2bde43e52f41ec1ecbdc73f11f8").unwrap(),
        );
        assert_eq!(InputShape::for_fund_prevout(&p2wpkh).unwrap(), InputShape::P2wpkh);
        let p2wsh = ScriptBuf::from_bytes(
            hex::decode("0020c7f6546c0f089ed1847f4389412911270fcaa3c9fc425884f59475a7d92581bb")
                .unwrap(),
        );
        assert!(matches!(
            InputShape::for_fund_prevout(&p2wsh),
            Err(SwapError::MalformedReference(_))
        ));
    }
}
