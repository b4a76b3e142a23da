//! # Transactions
//!
//! Unsigned and signed transactions of the three HTLC kinds, plus the
//! base64 "transaction raw" envelope used to move an unsigned transaction
//! across a process or counterparty boundary.
//!
//! The envelope is base64 of a JSON object:
//!
//! ```json
//! {"fee": 1044, "kind": "refund", "network": "testnet",
//!  "raw": "<consensus hex>", "outputs": [{"amount": 10000, "script": "0020..."}],
//!  "signed": false}
//! ```
//!
//! `outputs` are the prior outputs being spent, which segwit signature
//! hashes commit to and which cannot be recovered from the raw bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bitcoin::consensus::encode::{deserialize, serialize, serialize_hex};
use bitcoin::{Amount, ScriptBuf, Transaction, TxOut, Txid, Wtxid};
use serde::{Deserialize, Serialize};

use super::errors::SwapError;
use super::invariants::invariant_input_unlocked;
use super::value_objects::{Network, TransactionKind};

/// Wire form of a prior output inside the envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct EnvelopeOutput {
    amount: u64,
    script: String,
}

/// Wire form of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Envelope {
    fee: u64,
    kind: TransactionKind,
    network: Network,
    raw: String,
    outputs: Vec<EnvelopeOutput>,
    signed: bool,
}

impl Envelope {
    fn new(
        kind: TransactionKind,
        network: Network,
        tx: &Transaction,
        prevouts: &[TxOut],
        fee: Amount,
        signed: bool,
    ) -> Self {
        Self {
            fee: fee.to_sat(),
            kind,
            network,
            raw: serialize_hex(tx),
            outputs: prevouts
                .iter()
                .map(|out| EnvelopeOutput {
                    amount: out.value.to_sat(),
                    script: hex::encode(out.script_pubkey.as_bytes()),
                })
                .collect(),
            signed,
        }
    }

    fn encode(&self) -> Result<String, SwapError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SwapError::MalformedTransaction(e.to_string()))?;
        Ok(BASE64.encode(json))
    }

    fn decode(raw: &str) -> Result<Self, SwapError> {
        let json = BASE64
            .decode(raw.trim())
            .map_err(|e| SwapError::MalformedTransaction(format!("invalid base64: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| SwapError::MalformedTransaction(format!("invalid envelope: {e}")))
    }

    fn parts(&self) -> Result<(Transaction, Vec<TxOut>), SwapError> {
        let bytes = hex::decode(&self.raw)
            .map_err(|e| SwapError::MalformedTransaction(format!("invalid raw hex: {e}")))?;
        let tx: Transaction = deserialize(&bytes)
            .map_err(|e| SwapError::MalformedTransaction(format!("invalid transaction: {e}")))?;
        let prevouts = self
            .outputs
            .iter()
            .map(|out| {
                let script = hex::decode(&out.script).map_err(|e| {
                    SwapError::MalformedTransaction(format!("invalid output script: {e}"))
                })?;
                Ok(TxOut {
                    value: Amount::from_sat(out.amount),
                    script_pubkey: ScriptBuf::from_bytes(script),
                })
            })
            .collect::<Result<Vec<_>, SwapError>>()?;
        Ok((tx, prevouts))
    }
}

/// Total value of the prior outputs minus the transaction outputs.
fn implied_fee(tx: &Transaction, prevouts: &[TxOut]) -> Result<Amount, SwapError> {
    let input_total = prevouts
        .iter()
        .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
        .ok_or_else(|| SwapError::MalformedTransaction("input total overflows".to_string()))?;
    let output_total = tx
        .output
        .iter()
        .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
        .ok_or_else(|| SwapError::MalformedTransaction("output total overflows".to_string()))?;
    input_total.checked_sub(output_total).ok_or_else(|| {
        SwapError::MalformedTransaction(format!(
            "outputs {output_total} exceed inputs {input_total}"
        ))
    })
}

/// A built transaction waiting for unlocking data.
///
/// Immutable once built. Signing produces a new [`SignedTransaction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    kind: TransactionKind,
    network: Network,
    transaction: Transaction,
    prevouts: Vec<TxOut>,
    fee: Amount,
}

impl UnsignedTransaction {
    /// Wrap a transaction and the outputs its inputs spend.
    pub fn new(
        kind: TransactionKind,
        network: Network,
        transaction: Transaction,
        prevouts: Vec<TxOut>,
    ) -> Result<Self, SwapError> {
        if transaction.input.is_empty() || transaction.output.is_empty() {
            return Err(SwapError::MalformedTransaction(
                "transaction needs at least one input and one output".to_string(),
            ));
        }
        if prevouts.len() != transaction.input.len() {
            return Err(SwapError::MalformedTransaction(format!(
                "{} inputs but {} prior outputs",
                transaction.input.len(),
                prevouts.len()
            )));
        }
        if transaction
            .input
            .iter()
            .any(|txin| !txin.witness.is_empty() || !txin.script_sig.is_empty())
        {
            return Err(SwapError::MalformedTransaction(
                "unsigned transaction already carries unlocking data".to_string(),
            ));
        }
        let fee = implied_fee(&transaction, &prevouts)?;
        Ok(Self {
            kind,
            network,
            transaction,
            prevouts,
            fee,
        })
    }

    /// Transaction kind.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Network the outputs were encoded for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Fee paid to the network (inputs minus outputs).
    pub fn fee(&self) -> Amount {
        self.fee
    }

    /// The bare transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Outputs spent by each input, in input order.
    pub fn prevouts(&self) -> &[TxOut] {
        &self.prevouts
    }

    /// Transaction id. Unchanged by signing for segwit-only spends.
    pub fn txid(&self) -> Txid {
        self.transaction.compute_txid()
    }

    /// Consensus-encoded hex.
    pub fn raw(&self) -> String {
        serialize_hex(&self.transaction)
    }

    /// Type label such as `bitcoin_fund_unsigned`.
    pub fn label(&self) -> String {
        self.kind.label(false)
    }

    /// Serialize into the base64 envelope.
    pub fn to_raw(&self) -> Result<String, SwapError> {
        Envelope::new(
            self.kind,
            self.network,
            &self.transaction,
            &self.prevouts,
            self.fee,
            false,
        )
        .encode()
    }

    /// Rebuild from the base64 envelope.
    pub fn from_raw(raw: &str) -> Result<Self, SwapError> {
        let envelope = Envelope::decode(raw)?;
        if envelope.signed {
            return Err(SwapError::MalformedTransaction(
                "envelope holds a signed transaction".to_string(),
            ));
        }
        let (tx, prevouts) = envelope.parts()?;
        let unsigned = Self::new(envelope.kind, envelope.network, tx, prevouts)?;
        if unsigned.fee.to_sat() != envelope.fee {
            return Err(SwapError::MalformedTransaction(format!(
                "envelope fee {} does not match inputs minus outputs {}",
                envelope.fee,
                unsigned.fee.to_sat()
            )));
        }
        Ok(unsigned)
    }
}

/// A transaction whose every input carries unlocking data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    kind: TransactionKind,
    network: Network,
    transaction: Transaction,
    prevouts: Vec<TxOut>,
    fee: Amount,
}

impl SignedTransaction {
    /// Wrap a signed transaction. Fails if any input has no unlocking data.
    pub fn new(
        kind: TransactionKind,
        network: Network,
        transaction: Transaction,
        prevouts: Vec<TxOut>,
    ) -> Result<Self, SwapError> {
        if prevouts.len() != transaction.input.len() {
            return Err(SwapError::MalformedTransaction(format!(
                "{} inputs but {} prior outputs",
                transaction.input.len(),
                prevouts.len()
            )));
        }
        if let Some(index) = transaction
            .input
            .iter()
            .position(|txin| !invariant_input_unlocked(txin))
        {
            return Err(SwapError::UnsatisfiableInput {
                index,
                reason: "input has no unlocking data".to_string(),
            });
        }
        let fee = implied_fee(&transaction, &prevouts)?;
        Ok(Self {
            kind,
            network,
            transaction,
            prevouts,
            fee,
        })
    }

    /// Transaction kind.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Network.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Fee paid to the network.
    pub fn fee(&self) -> Amount {
        self.fee
    }

    /// The bare transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Outputs spent by each input.
    pub fn prevouts(&self) -> &[TxOut] {
        &self.prevouts
    }

    /// Transaction id.
    pub fn txid(&self) -> Txid {
        self.transaction.compute_txid()
    }

    /// Witness transaction id. Covers the unlocking data too.
    pub fn wtxid(&self) -> Wtxid {
        self.transaction.compute_wtxid()
    }

    /// Consensus-encoded bytes, ready for broadcast.
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize(&self.transaction)
    }

    /// Consensus-encoded hex, ready for broadcast.
    pub fn raw(&self) -> String {
        serialize_hex(&self.transaction)
    }

    /// Type label such as `bitcoin_claim_signed`.
    pub fn label(&self) -> String {
        self.kind.label(true)
    }

    /// Serialize into the base64 envelope.
    pub fn to_raw(&self) -> Result<String, SwapError> {
        Envelope::new(
            self.kind,
            self.network,
            &self.transaction,
            &self.prevouts,
            self.fee,
            true,
        )
        .encode()
    }

    /// Rebuild from the base64 envelope.
    pub fn from_raw(raw: &str) -> Result<Self, SwapError> {
        let envelope = Envelope::decode(raw)?;
        if !envelope.signed {
            return Err(SwapError::MalformedTransaction(
                "envelope holds an unsigned transaction".to_string(),
            ));
        }
        let (tx, prevouts) = envelope.parts()?;
        Self::new(envelope.kind, envelope.network, tx, prevouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{OutPoint, Sequence, TxIn, Witness};

    fn sample_tx() -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence(1000),
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(9_000),
                script_pubkey: ScriptBuf::from_bytes(vec![0x00, 0x14, 0x01]),
            }],
        }
    }

    fn sample_prevouts() -> Vec<TxOut> {
        vec![TxOut {
            value: Amount::from_sat(10_000),
            script_pubkey: ScriptBuf::from_bytes(vec![0x00, 0x20, 0x02]),
        }]
    }

    #[test]
    fn test_unsigned_fee_is_inputs_minus_outputs() {
        let unsigned = UnsignedTransaction::new(
            TransactionKind::Refund,
            Network::Testnet,
            sample_tx(),
            sample_prevouts(),
        )
        .unwrap();
        assert_eq!(unsigned.fee(), Amount::from_sat(1_000));
        assert_eq!(unsigned.label(), "bitcoin_refund_unsigned");
    }

    #[test]
    fn test_envelope_round_trip() {
        let unsigned = UnsignedTransaction::new(
            TransactionKind::Refund,
            Network::Testnet,
            sample_tx(),
            sample_prevouts(),
        )
        .unwrap();
        let raw = unsigned.to_raw().unwrap();
        assert_eq!(UnsignedTransaction::from_raw(&raw).unwrap(), unsigned);
    }

    #[test]
    fn test_outputs_exceeding_inputs_rejected() {
        let mut prevouts = sample_prevouts();
        prevouts[0].value = Amount::from_sat(100);
        let result = UnsignedTransaction::new(
            TransactionKind::Claim,
            Network::Testnet,
            sample_tx(),
            prevouts,
        );
        assert!(matches!(result, Err(SwapError::MalformedTransaction(_))));
    }

    #[test]
    fn test_prevout_count_mismatch_rejected() {
        let result = UnsignedTransaction::new(
            TransactionKind::Claim,
            Network::Testnet,
            sample_tx(),
            vec![],
        );
        assert!(matches!(result, Err(SwapError::MalformedTransaction(_))));
    }

    #[test]
    fn test_signed_requires_unlocking_data() {
        let result = SignedTransaction::new(
            TransactionKind::Refund,
            Network::Testnet,
            sample_tx(),
            sample_prevouts(),
        );
        assert!(matches!(
            result,
            Err(SwapError::UnsatisfiableInput { index: 0, .. })
        ));
    }

    #[test]
    fn test_signed_reports_first_bare_input() {
        let mut tx = sample_tx();
        tx.input.push(tx.input[0].clone());
        tx.input[0].witness.push([0x01]);
        let mut prevouts = sample_prevouts();
        prevouts.push(prevouts[0].clone());
        let result = SignedTransaction::new(TransactionKind::Fund, Network::Testnet, tx, prevouts);
        assert!(matches!(
            result,
            Err(SwapError::UnsatisfiableInput { index: 1, .. })
        ));
    }

    #[test]
    fn test_signed_envelope_not_accepted_as_unsigned() {
        let mut tx = sample_tx();
        tx.input[0].witness.push([0x01]);
        let signed = SignedTransaction::new(
            TransactionKind::Refund,
            Network::Testnet,
            tx,
            sample_prevouts(),
        )
        .unwrap();
        let raw = signed.to_raw().unwrap();
        assert!(matches!(
            UnsignedTransaction::from_raw(&raw),
            Err(SwapError::MalformedTransaction(_))
        ));
        assert_eq!(SignedTransaction::from_raw(&raw).unwrap(), signed);
    }

    #[test]
    fn test_garbage_envelope() {
        assert!(matches!(
            UnsignedTransaction::from_raw("!!!"),
            Err(SwapError::MalformedTransaction(_))
        ));
        let not_json = BASE64.encode(b"hello");
        assert!(UnsignedTransaction::from_raw(&not_json).is_err());
    }

    #[test]
    fn test_tampered_fee_rejected() {
        let unsigned = UnsignedTransaction::new(
            TransactionKind::Refund,
            Network::Testnet,
            sample_tx(),
            sample_prevouts(),
        )
        .unwrap();
        let mut envelope = Envelope::decode(&unsigned.to_raw().unwrap()).unwrap();
        envelope.fee += 1;
        let raw = envelope.encode().unwrap();
        assert!(UnsignedTransaction::from_raw(&raw).is_err());
    }
}
