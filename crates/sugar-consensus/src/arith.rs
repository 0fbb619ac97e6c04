//! Fixed-width 256-bit arithmetic.
//!
//! Retarget code treats `U256` as a 256-bit register: products and sums are
//! reduced modulo 2^256 and division truncates. The `uint` operators panic on
//! overflow, so the wrapping forms in [`U256Ext`] are used wherever consensus
//! results depend on register semantics.

#![allow(clippy::manual_div_ceil)]

use uint::construct_uint;

construct_uint! {
    /// Unsigned 256-bit integer.
    /// Consists of 4x64-bit words, least significant first.
    pub struct U256(4);
}

/// Register-style helpers for [`U256`].
pub trait U256Ext: Sized {
    /// `self * rhs` modulo 2^256.
    fn wrapping_mul(self, rhs: U256) -> U256;
    /// `self + rhs` modulo 2^256.
    fn wrapping_add(self, rhs: U256) -> U256;
    /// `self - rhs` modulo 2^256.
    fn wrapping_sub(self, rhs: U256) -> U256;
    /// Read a 32-byte little-endian value (hash storage order).
    fn from_le_bytes(bytes: &[u8; 32]) -> Self;
    /// Write as 32 little-endian bytes.
    fn to_le_bytes(&self) -> [u8; 32];
    /// Write as 32 big-endian bytes.
    fn to_be_bytes(&self) -> [u8; 32];
    /// Lowercase, zero-padded 64 digit hex.
    fn to_hex(&self) -> String;
    /// Parse big-endian hex, with or without a `0x` prefix.
    fn from_hex(s: &str) -> Option<Self>;
}

impl U256Ext for U256 {
    fn wrapping_mul(self, rhs: U256) -> U256 {
        self.overflowing_mul(rhs).0
    }

    fn wrapping_add(self, rhs: U256) -> U256 {
        self.overflowing_add(rhs).0
    }

    fn wrapping_sub(self, rhs: U256) -> U256 {
        self.overflowing_sub(rhs).0
    }

    fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        U256::from_little_endian(bytes)
    }

    fn to_le_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.byte(i);
        }
        out
    }

    fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = self.to_le_bytes();
        out.reverse();
        out
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if s.is_empty() || s.len() > 64 {
            return None;
        }
        U256::from_str_radix(s, 16).ok()
    }
}

/// Non-negative seconds as a 256-bit multiplier. Negative spans become zero.
pub(crate) fn timespan(secs: i64) -> U256 {
    U256::from(secs.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_mul_discards_carry() {
        let top = U256::one() << 255usize;
        assert_eq!(top.wrapping_mul(U256::from(2u64)), U256::zero());
        assert_eq!(
            top.wrapping_mul(U256::from(3u64)),
            top,
            "3 * 2^255 mod 2^256 == 2^255"
        );
    }

    #[test]
    fn test_wrapping_add_and_sub() {
        assert_eq!(U256::MAX.wrapping_add(U256::one()), U256::zero());
        assert_eq!(U256::zero().wrapping_sub(U256::one()), U256::MAX);
    }

    #[test]
    fn test_byte_order_helpers() {
        let value = U256::from(0x0102u64);
        let le = value.to_le_bytes();
        assert_eq!(le[0], 0x02);
        assert_eq!(le[1], 0x01);
        let be = value.to_be_bytes();
        assert_eq!(be[31], 0x02);
        assert_eq!(be[30], 0x01);
        assert_eq!(U256::from_le_bytes(&le), value);
    }

    #[test]
    fn test_hex_roundtrip() {
        let limit = U256::from_hex(
            "0007ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .unwrap();
        assert_eq!(
            limit.to_hex(),
            "0007ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
        assert_eq!(U256::from_hex("0x10"), Some(U256::from(16u64)));
        assert_eq!(U256::from_hex(""), None);
        assert_eq!(U256::from_hex("zz"), None);
    }

    #[test]
    fn test_timespan_clamps_negative() {
        assert_eq!(timespan(-5), U256::zero());
        assert_eq!(timespan(2550), U256::from(2550u64));
    }
}
