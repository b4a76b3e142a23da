//! Property tests for the contract model and spend amounts.

use bitcoin::hashes::Hash as _;
use bitcoin::{Amount, OutPoint, Txid};
use proptest::prelude::*;
use swap_htlc::{
    Branch, Contract, Network, PriorOutput, SpendAmount, SwapConfig, TransactionBuilder,
};

const RECIPIENT: &str = "mgokpSJoX7npmAK1Zj8ze1926CLxYDt1iF";

fn expiration() -> impl Strategy<Value = u32> {
    prop_oneof![1u32..=0xffff, (1u32..=0xffff).prop_map(|v| v | (1 << 22))]
}

proptest! {
    #[test]
    fn test_bytecode_round_trip(
        hash_lock in any::<[u8; 32]>(),
        recipient in any::<[u8; 20]>(),
        sender in any::<[u8; 20]>(),
        expiration in expiration(),
    ) {
        let contract = Contract::build(hash_lock, recipient, sender, expiration).unwrap();
        let decoded = Contract::decode(&contract.bytecode()).unwrap();
        prop_assert_eq!(decoded, contract);
        prop_assert_eq!(decoded.to_hex(), contract.to_hex());
    }

    #[test]
    fn test_max_claim_pays_value_minus_fee(value in 2_000u64..100_000_000) {
        let contract = Contract::build([7u8; 32], [1u8; 20], [2u8; 20], 144).unwrap();
        let builder = TransactionBuilder::new(&SwapConfig::for_testing()).unwrap();
        let prior = PriorOutput::new(
            OutPoint::new(Txid::from_byte_array([3u8; 32]), 0),
            Amount::from_sat(value),
            contract.script_pubkey(),
        );
        let unsigned = builder
            .build_claim(&contract, &prior, RECIPIENT, SpendAmount::Max)
            .unwrap();
        let fee = builder.spend_fee(Branch::Claim, &contract, RECIPIENT).unwrap();

        prop_assert_eq!(unsigned.fee(), fee);
        prop_assert_eq!(
            unsigned.transaction().output[0].value,
            Amount::from_sat(value) - fee
        );
        prop_assert_eq!(unsigned.network(), Network::Testnet);
    }
}
