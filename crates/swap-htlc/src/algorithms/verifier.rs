//! # Contract Spend Verifier
//!
//! Re-checks a signed claim or refund against the contract it spends, the
//! way `OP_IF ... OP_ELSE ... OP_ENDIF` would evaluate it under segwit
//! v0 rules.

use bitcoin::ecdsa;
use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::CompressedPublicKey;

use super::fee::{PUBKEY_LEN, SIGNATURE_PLACEHOLDER_LEN};
use crate::domain::{
    invariant_relative_timelock_satisfied, invariant_secret_matches, Branch, Contract,
    SignedTransaction, SwapError, MAX_SECRET_LEN,
};

fn invalid(index: usize, reason: impl Into<String>) -> SwapError {
    SwapError::InvalidWitness {
        index,
        reason: reason.into(),
    }
}

/// Verify every input of `signed` that spends `contract`.
///
/// Returns the branch taken. Fails if no input spends the contract.
pub fn verify_contract_spend(
    signed: &SignedTransaction,
    contract: &Contract,
) -> Result<Branch, SwapError> {
    let secp = Secp256k1::verification_only();
    let tx = signed.transaction();
    let contract_script = contract.script();
    let contract_spk = contract.script_pubkey();
    let mut cache = SighashCache::new(tx);
    let mut branch = None;

    for (index, (txin, prevout)) in tx.input.iter().zip(signed.prevouts()).enumerate() {
        if prevout.script_pubkey != contract_spk {
            continue;
        }
        let items: Vec<&[u8]> = txin.witness.iter().collect();
        if !txin.script_sig.is_empty() {
            return Err(invalid(index, "segwit input with non-empty scriptSig"));
        }
        let (script, rest) = items
            .split_last()
            .ok_or_else(|| invalid(index, "empty witness"))?;
        if *script != contract_script.as_bytes() {
            return Err(invalid(index, "witness script does not match the contract"));
        }

        let taken = match rest {
            [sig, pubkey, secret, selector] if *selector == Branch::Claim.selector() => {
                if secret.len() > MAX_SECRET_LEN {
                    return Err(invalid(
                        index,
                        format!("secret longer than {MAX_SECRET_LEN} bytes"),
                    ));
                }
                if !invariant_secret_matches(secret, &contract.hash_lock) {
                    return Err(invalid(index, "secret does not match the hash lock"));
                }
                check_key(index, pubkey, &contract.recipient_pubkey_hash)?;
                (Branch::Claim, *sig, *pubkey)
            }
            [sig, pubkey, selector] if selector.is_empty() => {
                if !invariant_relative_timelock_satisfied(
                    tx.version.0,
                    txin.sequence,
                    contract.expiration,
                ) {
                    return Err(invalid(index, "relative time-lock not satisfied"));
                }
                check_key(index, pubkey, &contract.sender_pubkey_hash)?;
                (Branch::Refund, *sig, *pubkey)
            }
            _ => return Err(invalid(index, "witness does not select a contract branch")),
        };
        let (taken, sig, pubkey) = taken;

        if sig.len() > SIGNATURE_PLACEHOLDER_LEN {
            return Err(invalid(index, "signature longer than 72 bytes"));
        }
        let sig = ecdsa::Signature::from_slice(sig)
            .map_err(|e| invalid(index, format!("bad signature encoding: {e}")))?;
        if sig.sighash_type != EcdsaSighashType::All {
            return Err(invalid(index, "signature is not SIGHASH_ALL"));
        }
        let sighash = cache
            .p2wsh_signature_hash(index, &contract_script, prevout.value, EcdsaSighashType::All)
            .map_err(|e| invalid(index, e.to_string()))?;
        let pubkey = PublicKey::from_slice(pubkey)
            .map_err(|e| invalid(index, format!("bad public key: {e}")))?;
        secp.verify_ecdsa(
            &Message::from_digest(sighash.to_byte_array()),
            &sig.signature,
            &pubkey,
        )
        .map_err(|_| invalid(index, "signature does not verify"))?;

        branch = Some(taken);
    }

    branch.ok_or_else(|| invalid(0, "no input spends the contract"))
}

fn check_key(index: usize, pubkey: &[u8], expected: &[u8; 20]) -> Result<(), SwapError> {
    if pubkey.len() != PUBKEY_LEN {
        return Err(invalid(index, "public key must be compressed"));
    }
    let key = CompressedPublicKey::from_slice(pubkey)
        .map_err(|e| invalid(index, format!("bad public key: {e}")))?;
    if key.pubkey_hash().to_byte_array() != *expected {
        return Err(invalid(index, "public key does not match the contract party"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::builder::TransactionBuilder;
    use crate::algorithms::signer::Signer;
    use crate::algorithms::solver::{ClaimSolver, RefundSolver, Solver};
    use crate::config::SwapConfig;
    use crate::domain::{
        parse_outpoint, Network, PriorOutput, Secret, SigningKey, SpendAmount,
    };
    use bitcoin::{Amount, Sequence};

    const BYTECODE: &str = "63aa20821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e01588876a9140e259e08f2ec9fc99a92b6f66fdfcb3c7914fd6888ac6702e803b27576a91433ecab3d67f0e2bde43e52f41ec1ecbdc73f11f888ac68";
    const SENDER_KEY: &str = "adf0218f7e7276ed0f40b6919f2473497dd2bf7dcd4cabff4d4ef0e11948cde7";
    const RECIPIENT_KEY: &str = "e76217755bda661a945b6410c8ec005ce8f08de8087057a99123c2474c16fd6c";
    const SENDER: &str = "mkFWGt4hT11XS8dJKzzRFsTrqjjAwZfQAC";
    const RECIPIENT: &str = "mgokpSJoX7npmAK1Zj8ze1926CLxYDt1iF";
    const TXID: &str = "a211d21110756b266925fee2fbf2dc81529beef5e410311b38578dc3a076fb31";

    fn contract() -> Contract {
        Contract::from_hex(BYTECODE).unwrap()
    }

    fn prior() -> PriorOutput {
        PriorOutput::new(
            parse_outpoint(&format!("{TXID}:0")).unwrap(),
            Amount::from_sat(50_000),
            contract().script_pubkey(),
        )
    }

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(&SwapConfig::for_network(Network::Testnet)).unwrap()
    }

    fn signed_claim() -> SignedTransaction {
        let unsigned = builder()
            .build_claim(&contract(), &prior(), RECIPIENT, SpendAmount::Max)
            .unwrap();
        let solver: Solver = ClaimSolver::new(
            SigningKey::from_hex(RECIPIENT_KEY).unwrap(),
            Secret::from_passphrase("Hello Meheret!"),
            contract(),
        )
        .unwrap()
        .into();
        Signer::new().sign(&unsigned, &solver).unwrap()
    }

    fn signed_refund() -> SignedTransaction {
        let unsigned = builder()
            .build_refund(&contract(), &prior(), SENDER, SpendAmount::Max)
            .unwrap();
        let solver: Solver =
            RefundSolver::new(SigningKey::from_hex(SENDER_KEY).unwrap(), contract()).into();
        Signer::new().sign(&unsigned, &solver).unwrap()
    }

    fn with_tx(
        signed: &SignedTransaction,
        edit: impl FnOnce(&mut bitcoin::Transaction),
    ) -> SignedTransaction {
        let mut tx = signed.transaction().clone();
        edit(&mut tx);
        SignedTransaction::new(signed.kind(), signed.network(), tx, signed.prevouts().to_vec())
            .unwrap()
    }

    #[test]
    fn test_claim_verifies() {
        assert_eq!(
            verify_contract_spend(&signed_claim(), &contract()).unwrap(),
            Branch::Claim
        );
    }

    #[test]
    fn test_refund_verifies() {
        assert_eq!(
            verify_contract_spend(&signed_refund(), &contract()).unwrap(),
            Branch::Refund
        );
    }

    #[test]
    fn test_refund_sequence_too_low() {
        // changing the sequence also invalidates the signature; the lock check fires first
        let tampered = with_tx(&signed_refund(), |tx| tx.input[0].sequence = Sequence(999));
        let err = verify_contract_spend(&tampered, &contract()).unwrap_err();
        assert!(err.to_string().contains("time-lock"));
    }

    #[test]
    fn test_tampered_output_breaks_signature() {
        let tampered = with_tx(&signed_claim(), |tx| {
            tx.output[0].value = tx.output[0].value - Amount::from_sat(1)
        });
        let err = verify_contract_spend(&tampered, &contract()).unwrap_err();
        assert!(err.to_string().contains("does not verify"));
    }

    #[test]
    fn test_wrong_secret_in_witness() {
        let tampered = with_tx(&signed_claim(), |tx| {
            let mut items: Vec<Vec<u8>> = tx.input[0].witness.iter().map(<[u8]>::to_vec).collect();
            items[2] = vec![0u8; 32];
            tx.input[0].witness = bitcoin::Witness::from_slice(&items);
        });
        let err = verify_contract_spend(&tampered, &contract()).unwrap_err();
        assert!(matches!(err, SwapError::InvalidWitness { index: 0, .. }));
        assert!(err.to_string().contains("hash lock"));
    }

    #[test]
    fn test_claim_pushes_raw_passphrase() {
        let signed = signed_claim();
        let witness = &signed.transaction().input[0].witness;
        assert_eq!(witness.len(), 5);
        assert_eq!(witness.nth(2).unwrap(), b"Hello Meheret!");
        assert_eq!(witness.nth(3).unwrap(), &[0x01u8]);
        assert_eq!(hex::encode(witness.nth(4).unwrap()), BYTECODE);
        assert_eq!(verify_contract_spend(&signed, &contract()).unwrap(), Branch::Claim);
    }

    #[test]
    fn test_single_sha256_preimage_rejected() {
        let tampered = with_tx(&signed_claim(), |tx| {
            let mut items: Vec<Vec<u8>> = tx.input[0].witness.iter().map(<[u8]>::to_vec).collect();
            items[2] = hex::decode(
                "3a26da82ead15a80533a02696656b14b5dbfd84eb14790f2e1be5e9e45820eeb",
            )
            .unwrap();
            tx.input[0].witness = bitcoin::Witness::from_slice(&items);
        });
        let err = verify_contract_spend(&tampered, &contract()).unwrap_err();
        assert!(err.to_string().contains("hash lock"));
    }

    #[test]
    fn test_oversized_secret_rejected() {
        let tampered = with_tx(&signed_claim(), |tx| {
            let mut items: Vec<Vec<u8>> = tx.input[0].witness.iter().map(<[u8]>::to_vec).collect();
            items[2] = vec![0u8; MAX_SECRET_LEN + 1];
            tx.input[0].witness = bitcoin::Witness::from_slice(&items);
        });
        let err = verify_contract_spend(&tampered, &contract()).unwrap_err();
        assert!(err.to_string().contains("longer than 80"));
    }

    #[test]
    fn test_other_contract_not_spent() {
        let other = Contract::build([9u8; 32], [1u8; 20], [2u8; 20], 10).unwrap();
        assert!(verify_contract_spend(&signed_claim(), &other).is_err());
    }
}
