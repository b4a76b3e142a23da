//! Both signing paths on the reference contract, with keys derived from
//! BIP-32 roots.

use bitcoin::{Amount, Sequence, Witness};
use swap_htlc::domain::parse_outpoint;
use swap_htlc::{
    verify_contract_spend, verify_signing_equivalence, Bip32KeyDeriver, Branch, ClaimSolver,
    Contract, KeyPath, Network, PriorOutput, RefundSolver, Secret, Signature, SignedTransaction,
    Signer, Solver, SpendAmount, SwapConfig, SwapError, TransactionBuilder, UnsignedTransaction,
};

const BYTECODE: &str = "63aa20821124b554d13f247b1e5d10b84e44fb1296f18f38bbaa1bea34a12c843e01588876a9140e259e08f2ec9fc99a92b6f66fdfcb3c7914fd6888ac6702e803b27576a91433ecab3d67f0e2bde43e52f41ec1ecbdc73f11f888ac68";
const SENDER_ROOT: &str = "tprv8ZgxMBicQKsPeLxEBy2sJ8CqLdc76FUzeaiY5egrW4JdpM4F9b9A3L6AQhsY1TRsqJAfTdH7DdRAt5hRdcdhn5LnMZPiaGRR7Snrmd8CLqR";
const RECIPIENT_ROOT: &str = "xprv9s21ZrQH143K4Kpce43z5guPyxLrFoc2i8aQAq835Zzp4Rt7i6nZaMCnVSDyHT6MnmJJGKHMrCUqaYpGojrug1ZN5qQDdShQffmkyv5xyUR";
const SENDER: &str = "mkFWGt4hT11XS8dJKzzRFsTrqjjAwZfQAC";
const RECIPIENT: &str = "mgokpSJoX7npmAK1Zj8ze1926CLxYDt1iF";
const FUND_TXID: &str = "a211d21110756b266925fee2fbf2dc81529beef5e410311b38578dc3a076fb31";

fn contract() -> Contract {
    Contract::from_hex(BYTECODE).unwrap()
}

fn contract_output() -> PriorOutput {
    PriorOutput::new(
        parse_outpoint(&format!("{FUND_TXID}:0")).unwrap(),
        Amount::from_sat(10_000),
        contract().script_pubkey(),
    )
}

fn config() -> SwapConfig {
    SwapConfig::for_network(Network::Testnet)
}

fn builder() -> TransactionBuilder {
    TransactionBuilder::new(&config()).unwrap()
}

fn refund_solver() -> Solver {
    RefundSolver::from_root(
        &Bip32KeyDeriver::new(),
        SENDER_ROOT,
        &KeyPath::default(),
        &config(),
        contract(),
    )
    .unwrap()
    .into()
}

fn claim_solver() -> Solver {
    ClaimSolver::from_root(
        &Bip32KeyDeriver::new(),
        RECIPIENT_ROOT,
        &KeyPath::Explicit("m/44'/0'/0'/0/0".to_string()),
        &config(),
        Secret::from_passphrase("Hello Meheret!"),
        contract(),
    )
    .unwrap()
    .into()
}

fn unsigned_refund() -> UnsignedTransaction {
    builder()
        .build_refund(&contract(), &contract_output(), SENDER, SpendAmount::Max)
        .unwrap()
}

fn unsigned_claim() -> UnsignedTransaction {
    builder()
        .build_claim(&contract(), &contract_output(), RECIPIENT, SpendAmount::Max)
        .unwrap()
}

#[test]
fn test_refund_paths_are_byte_identical() {
    let unsigned = unsigned_refund();
    let solver = refund_solver();

    let direct = Signer::new().sign(&unsigned, &solver).unwrap();
    let designated = Signature::new(Network::Testnet)
        .sign(&unsigned.to_raw().unwrap(), &solver)
        .unwrap();

    assert_eq!(direct.to_bytes(), designated.to_bytes());
    assert_eq!(direct.raw(), designated.raw());
    assert_eq!(direct.fee(), designated.fee());
    assert_eq!(direct.label(), "bitcoin_refund_signed");
}

#[test]
fn test_claim_paths_are_byte_identical() {
    let signed = verify_signing_equivalence(&unsigned_claim(), &claim_solver()).unwrap();
    assert_eq!(signed.label(), "bitcoin_claim_signed");
    assert_eq!(
        verify_contract_spend(&signed, &contract()).unwrap(),
        Branch::Claim
    );
}

#[test]
fn test_refund_verifies_against_contract() {
    let signed = Signer::new().sign(&unsigned_refund(), &refund_solver()).unwrap();
    let txin = &signed.transaction().input[0];
    assert_eq!(txin.sequence, Sequence(1000));
    assert_eq!(
        verify_contract_spend(&signed, &contract()).unwrap(),
        Branch::Refund
    );
}

#[test]
fn test_signed_envelope_reloads() {
    let signed = Signer::new().sign(&unsigned_refund(), &refund_solver()).unwrap();
    let reloaded = SignedTransaction::from_raw(&signed.to_raw().unwrap()).unwrap();
    assert_eq!(reloaded.to_bytes(), signed.to_bytes());
    assert!(UnsignedTransaction::from_raw(&signed.to_raw().unwrap()).is_err());
}

#[test]
fn test_solvers_are_bound_to_their_branch() {
    let claim = Signer::new().sign(&unsigned_refund(), &claim_solver());
    assert!(matches!(claim, Err(SwapError::UnsatisfiableInput { .. })));
    let refund = Signer::new().sign(&unsigned_claim(), &refund_solver());
    assert!(matches!(refund, Err(SwapError::UnsatisfiableInput { .. })));
}

#[test]
fn test_claim_signature_cannot_take_refund_branch() {
    let signed = Signer::new().sign(&unsigned_claim(), &claim_solver()).unwrap();
    let mut tx = signed.transaction().clone();
    let items: Vec<Vec<u8>> = tx.input[0].witness.iter().map(<[u8]>::to_vec).collect();
    // drop the secret and select the refund branch
    tx.input[0].witness = Witness::from_slice(&[
        items[0].clone(),
        items[1].clone(),
        Vec::new(),
        items[4].clone(),
    ]);
    let forged =
        SignedTransaction::new(signed.kind(), signed.network(), tx, signed.prevouts().to_vec())
            .unwrap();
    assert!(matches!(
        verify_contract_spend(&forged, &contract()),
        Err(SwapError::InvalidWitness { index: 0, .. })
    ));
}

#[test]
fn test_wrong_secret_never_builds_a_solver() {
    let result = ClaimSolver::from_root(
        &Bip32KeyDeriver::new(),
        RECIPIENT_ROOT,
        &KeyPath::default(),
        &config(),
        Secret::from_passphrase("wrong"),
        contract(),
    );
    assert!(matches!(result, Err(SwapError::SecretMismatch)));
}

#[test]
fn test_claim_pushes_passphrase_preimage() {
    let signed = Signer::new().sign(&unsigned_claim(), &claim_solver()).unwrap();
    let witness = &signed.transaction().input[0].witness;
    assert_eq!(witness.nth(2).unwrap(), b"Hello Meheret!");
    assert_eq!(
        verify_contract_spend(&signed, &contract()).unwrap(),
        Branch::Claim
    );
}

#[test]
fn test_refund_sequence_ignores_key_path() {
    let unsigned = unsigned_refund();
    assert_eq!(unsigned.transaction().input[0].sequence, Sequence(1000));

    let explicit: Solver = RefundSolver::from_root(
        &Bip32KeyDeriver::new(),
        SENDER_ROOT,
        &KeyPath::Explicit("m/44'/0'/0'/0/0".to_string()),
        &config(),
        contract(),
    )
    .unwrap()
    .into();
    let bip44 = Signer::new().sign(&unsigned, &refund_solver()).unwrap();
    let signed = Signer::new().sign(&unsigned, &explicit).unwrap();
    assert_eq!(signed.to_bytes(), bip44.to_bytes());
    assert_eq!(signed.transaction().input[0].sequence, Sequence(1000));

    // another account or coin type holds a different key, never a different lock
    let mut testnet_coin = config();
    testnet_coin.coin_type = 1;
    for (path, settings) in [
        (
            KeyPath::Bip44 {
                account: 3,
                change: true,
                address: 7,
            },
            config(),
        ),
        (KeyPath::default(), testnet_coin),
    ] {
        let solver: Solver =
            RefundSolver::from_root(&Bip32KeyDeriver::new(), SENDER_ROOT, &path, &settings, contract())
                .unwrap()
                .into();
        assert!(matches!(
            Signer::new().sign(&unsigned, &solver),
            Err(SwapError::UnsatisfiableInput { .. })
        ));
        assert_eq!(unsigned.transaction().input[0].sequence, Sequence(1000));
    }
}
