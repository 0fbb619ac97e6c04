//! Compact target ("nBits") encoding.
//!
//! nBits format: 0x[size][word]
//! - size: 1 byte, the byte length of the target (base-256 exponent)
//! - word: 3 bytes, the most significant bytes of the target
//!
//! The top bit of the word (0x00800000) is a sign bit. Targets are never
//! negative, so the encoder avoids setting it by moving to a larger size.

use crate::arith::U256;

/// Sign bit inside the 3-byte mantissa.
const SIGN_BIT: u32 = 0x0080_0000;

/// Mantissa bits without the sign.
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// A decoded compact value plus the range flags callers must check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactTarget {
    /// Decoded magnitude.
    pub target: U256,
    /// Sign bit set on a non-zero mantissa.
    pub negative: bool,
    /// Value does not fit in 256 bits.
    pub overflow: bool,
}

impl CompactTarget {
    /// True when the value is usable as a proof-of-work target.
    pub fn is_valid_target(&self) -> bool {
        !self.negative && !self.overflow && !self.target.is_zero()
    }
}

/// Decode compact bits into a 256-bit target.
///
/// Never fails: malformed input is reported through the `negative` and
/// `overflow` flags, and the magnitude is still returned.
pub fn decode_compact_bits(bits: u32) -> CompactTarget {
    let size = (bits >> 24) as usize;
    let mut word = bits & MANTISSA_MASK;

    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        U256::from(word)
    } else {
        // Shifts of 256 bits or more leave zero, like a 256-bit register.
        U256::from(word) << (8 * (size - 3))
    };

    let negative = word != 0 && (bits & SIGN_BIT) != 0;
    let overflow = word != 0
        && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

    CompactTarget {
        target,
        negative,
        overflow,
    }
}

/// Encode a target as compact bits.
///
/// Only the three most significant bytes survive, so encoding is lossy for
/// arbitrary targets but exact for any value produced by
/// [`decode_compact_bits`] of an encoder output.
pub fn encode_compact_bits(target: &U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;

    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (*target >> (8 * (size - 3))).low_u64() as u32
    };

    // The sign bit would make the value negative: shift into a larger size.
    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    debug_assert_eq!(compact & !MANTISSA_MASK, 0);
    debug_assert!(size < 256);

    compact | ((size as u32) << 24)
}
