//! Block header and hash types.
//!
//! The header is the 80-byte Bitcoin layout. Every integer field is
//! little-endian on the wire, including the compact `bits` at bytes 72..76.

use crate::arith::{U256Ext, U256};
use crate::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Serialized header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// A 256-bit hash in internal (little-endian) byte order.
///
/// Displayed byte-reversed, the way block explorers print hashes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash (genesis parent).
    pub const fn zero() -> Self {
        Hash256([0u8; 32])
    }

    /// Double SHA-256 of `data`.
    pub fn sha256d(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        Hash256(out)
    }

    /// Interpret the hash as a little-endian 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_le_bytes(&self.0)
    }

    /// Build from a 256-bit integer.
    pub fn from_u256(value: &U256) -> Self {
        Hash256(value.to_le_bytes())
    }

    /// Parse display (byte-reversed) hex.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes: [u8; 32] = hex::decode(s).ok()?.try_into().ok()?;
        bytes.reverse();
        Some(Hash256(bytes))
    }

    /// Display (byte-reversed) hex.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

/// Block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the parent header.
    pub prev_block_hash: Hash256,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash256,
    /// Unix timestamp in seconds.
    pub time: u32,
    /// Claimed compact target.
    pub bits: u32,
    /// Mining nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize to the 80-byte wire format.
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_block_hash.0);
        out[36..68].copy_from_slice(&self.merkle_root.0);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Parse the 80-byte wire format.
    pub fn deserialize(bytes: &[u8]) -> ConsensusResult<Self> {
        if bytes.len() != HEADER_SIZE {
            return Err(ConsensusError::InvalidHeader(format!(
                "expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let hash_at = |at: usize| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&bytes[at..at + 32]);
            Hash256(hash)
        };

        Ok(Self {
            version: u32_at(0) as i32,
            prev_block_hash: hash_at(4),
            merkle_root: hash_at(36),
            time: u32_at(68),
            bits: u32_at(72),
            nonce: u32_at(76),
        })
    }

    /// Block identifier: double SHA-256 of the serialized header.
    ///
    /// This is not the proof-of-work hash; see [`crate::PowHasher`].
    pub fn block_hash(&self) -> Hash256 {
        Hash256::sha256d(&self.serialize())
    }

    /// Timestamp as signed seconds, the unit retargeting works in.
    pub fn block_time(&self) -> i64 {
        i64::from(self.time)
    }
}
