//! # HTLC Contract
//!
//! Canonical in-memory form of the hash time-locked contract and its
//! P2WSH witness script encoding:
//!
//! ```text
//! OP_IF
//!     OP_HASH256 <hash_lock> OP_EQUALVERIFY
//!     OP_DUP OP_HASH160 <recipient_pubkey_hash> OP_EQUALVERIFY OP_CHECKSIG
//! OP_ELSE
//!     <expiration> OP_CHECKSEQUENCEVERIFY OP_DROP
//!     OP_DUP OP_HASH160 <sender_pubkey_hash> OP_EQUALVERIFY OP_CHECKSIG
//! OP_ENDIF
//! ```

use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CSV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF, OP_EQUALVERIFY, OP_HASH160,
    OP_HASH256, OP_IF, OP_PUSHNUM_1, OP_PUSHNUM_16,
};
use bitcoin::opcodes::Opcode;
use bitcoin::script::{Builder, Instruction};
use bitcoin::{Address, Script, ScriptBuf};
use serde::{Deserialize, Serialize};

use super::address::pubkey_hash_of;
use super::errors::{Hash, PubkeyHash, SwapError};
use super::value_objects::Network;

/// BIP-68 relative lock value bits.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// BIP-68 flag selecting 512-second units instead of blocks.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// Number of instructions in the template.
const TEMPLATE_LEN: usize = 19;

/// Hash time-locked contract.
///
/// The secret itself is never part of the contract, only its hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    /// HASH256 (double SHA-256) of the secret.
    pub hash_lock: Hash,
    /// HASH160 of the key allowed to claim.
    pub recipient_pubkey_hash: PubkeyHash,
    /// HASH160 of the key allowed to refund.
    pub sender_pubkey_hash: PubkeyHash,
    /// Relative time-lock, in BIP-68 sequence encoding.
    pub expiration: u32,
}

impl Contract {
    /// Build a contract from fixed-width fields.
    pub fn build(
        hash_lock: Hash,
        recipient_pubkey_hash: PubkeyHash,
        sender_pubkey_hash: PubkeyHash,
        expiration: u32,
    ) -> Result<Self, SwapError> {
        validate_expiration(expiration)?;
        Ok(Self {
            hash_lock,
            recipient_pubkey_hash,
            sender_pubkey_hash,
            expiration,
        })
    }

    /// Build from byte slices, checking each width.
    pub fn from_slices(
        hash_lock: &[u8],
        recipient_pubkey_hash: &[u8],
        sender_pubkey_hash: &[u8],
        expiration: u32,
    ) -> Result<Self, SwapError> {
        Self::build(
            fixed(hash_lock, "hash lock")?,
            fixed(recipient_pubkey_hash, "recipient public key hash")?,
            fixed(sender_pubkey_hash, "sender public key hash")?,
            expiration,
        )
    }

    /// Build from the parties' P2PKH or P2WPKH addresses on `network`.
    pub fn from_addresses(
        hash_lock: Hash,
        recipient_address: &str,
        sender_address: &str,
        expiration: u32,
        network: Network,
    ) -> Result<Self, SwapError> {
        Self::build(
            hash_lock,
            pubkey_hash_of(recipient_address, network)?,
            pubkey_hash_of(sender_address, network)?,
            expiration,
        )
    }

    /// Witness script.
    pub fn script(&self) -> ScriptBuf {
        Builder::new()
            .push_opcode(OP_IF)
            .push_opcode(OP_HASH256)
            .push_slice(self.hash_lock)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(self.recipient_pubkey_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ELSE)
            .push_int(i64::from(self.expiration))
            .push_opcode(OP_CSV)
            .push_opcode(OP_DROP)
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(self.sender_pubkey_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ENDIF)
            .into_script()
    }

    /// Witness script bytes.
    pub fn bytecode(&self) -> Vec<u8> {
        self.script().into_bytes()
    }

    /// Witness script as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytecode())
    }

    /// Decode canonical bytecode back into a contract.
    pub fn decode(bytecode: &[u8]) -> Result<Self, SwapError> {
        let script = Script::from_bytes(bytecode);
        let ins = script
            .instructions()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SwapError::MalformedBytecode(e.to_string()))?;
        if ins.len() != TEMPLATE_LEN {
            return Err(SwapError::MalformedBytecode(format!(
                "expected {TEMPLATE_LEN} instructions, found {}",
                ins.len()
            )));
        }

        expect_op(&ins[0], OP_IF, 0)?;
        expect_op(&ins[1], OP_HASH256, 1)?;
        let hash_lock = expect_push::<32>(&ins[2], 2)?;
        expect_op(&ins[3], OP_EQUALVERIFY, 3)?;
        expect_op(&ins[4], OP_DUP, 4)?;
        expect_op(&ins[5], OP_HASH160, 5)?;
        let recipient = expect_push::<20>(&ins[6], 6)?;
        expect_op(&ins[7], OP_EQUALVERIFY, 7)?;
        expect_op(&ins[8], OP_CHECKSIG, 8)?;
        expect_op(&ins[9], OP_ELSE, 9)?;
        let expiration = expect_number(&ins[10], 10)?;
        expect_op(&ins[11], OP_CSV, 11)?;
        expect_op(&ins[12], OP_DROP, 12)?;
        expect_op(&ins[13], OP_DUP, 13)?;
        expect_op(&ins[14], OP_HASH160, 14)?;
        let sender = expect_push::<20>(&ins[15], 15)?;
        expect_op(&ins[16], OP_EQUALVERIFY, 16)?;
        expect_op(&ins[17], OP_CHECKSIG, 17)?;
        expect_op(&ins[18], OP_ENDIF, 18)?;

        let contract = Self::build(hash_lock, recipient, sender, expiration)
            .map_err(|e| SwapError::MalformedBytecode(e.to_string()))?;

        // Non-minimal pushes parse fine but would hash to another address.
        if contract.bytecode() != bytecode {
            return Err(SwapError::MalformedBytecode(
                "bytecode is not canonically encoded".to_string(),
            ));
        }
        Ok(contract)
    }

    /// Decode from hex.
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let bytes = hex::decode(s).map_err(|e| SwapError::MalformedBytecode(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// P2WSH locking script paying to this contract.
    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2wsh(&self.script().wscript_hash())
    }

    /// Bech32 P2WSH address of this contract on `network`.
    pub fn address(&self, network: Network) -> Address {
        Address::p2wsh(&self.script(), network.to_bitcoin())
    }

    /// Whether the refund lock counts 512-second units rather than blocks.
    pub fn is_time_based(&self) -> bool {
        self.expiration & SEQUENCE_LOCKTIME_TYPE_FLAG != 0
    }

    /// The lock value with the type flag stripped.
    pub fn lock_value(&self) -> u32 {
        self.expiration & SEQUENCE_LOCKTIME_MASK
    }
}

/// Expiration must be a non-zero BIP-68 relative lock.
pub fn validate_expiration(expiration: u32) -> Result<(), SwapError> {
    if expiration == 0 {
        return Err(SwapError::InvalidContract(
            "expiration must be greater than zero".to_string(),
        ));
    }
    if expiration & !(SEQUENCE_LOCKTIME_MASK | SEQUENCE_LOCKTIME_TYPE_FLAG) != 0 {
        return Err(SwapError::InvalidContract(format!(
            "expiration {expiration:#x} sets bits outside the relative lock-time fields"
        )));
    }
    if expiration & SEQUENCE_LOCKTIME_MASK == 0 {
        return Err(SwapError::InvalidContract(
            "expiration lock value must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], SwapError> {
    bytes.try_into().map_err(|_| {
        SwapError::InvalidContract(format!(
            "{what} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

fn expect_op(ins: &Instruction<'_>, op: Opcode, at: usize) -> Result<(), SwapError> {
    match ins {
        Instruction::Op(found) if *found == op => Ok(()),
        other => Err(SwapError::MalformedBytecode(format!(
            "expected {op:?} at instruction {at}, found {other:?}"
        ))),
    }
}

fn expect_push<const N: usize>(ins: &Instruction<'_>, at: usize) -> Result<[u8; N], SwapError> {
    match ins {
        Instruction::PushBytes(bytes) => bytes.as_bytes().try_into().map_err(|_| {
            SwapError::MalformedBytecode(format!(
                "expected {N}-byte push at instruction {at}, found {} bytes",
                bytes.len()
            ))
        }),
        other => Err(SwapError::MalformedBytecode(format!(
            "expected {N}-byte push at instruction {at}, found {other:?}"
        ))),
    }
}

/// Positive script number, either `OP_1..OP_16` or a push of up to 4 bytes.
fn expect_number(ins: &Instruction<'_>, at: usize) -> Result<u32, SwapError> {
    match ins {
        Instruction::Op(op)
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8()) =>
        {
            Ok(u32::from(op.to_u8() - OP_PUSHNUM_1.to_u8() + 1))
        }
        Instruction::PushBytes(bytes) => {
            let bytes = bytes.as_bytes();
            if bytes.is_empty() || bytes.len() > 4 {
                return Err(SwapError::MalformedBytecode(format!(
                    "expiration push at instruction {at} has {} bytes",
                    bytes.len()
                )));
            }
            let last = bytes[bytes.len() - 1];
            if last & 0x80 != 0 {
                return Err(SwapError::MalformedBytecode(
                    "expiration must be positive".to_string(),
                ));
            }
            Ok(bytes
                .iter()
                .rev()
                .fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
        }
        other => Err(SwapError::MalformedBytecode(format!(
            "expected expiration at instruction {at}, found {other:?}"
        ))),
    }
}
