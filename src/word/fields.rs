//! Bit-field codecs for 16-bit instruction words.
//!
//! Field positions are inclusive `[hi, lo]` ranges, matching the way the
//! LC-3 reference sheets draw them (`IR[11:9]`). Extraction never fails:
//! any bit pattern is a valid field value at this level. Whether a value
//! is meaningful (a register index, a trap vector) is decided by the
//! types built on top of these functions.

use super::{SignedWord, Word, WORD_BITS};

/// Width of the ADD/AND immediate field.
pub const IMM5: u32 = 5;
/// Width of the LDR/STR base offset field.
pub const OFFSET6: u32 = 6;
/// Width of the BR/LD/LDI/LEA/ST/STI PC offset field.
pub const PC_OFFSET9: u32 = 9;
/// Width of the JSR PC offset field.
pub const PC_OFFSET11: u32 = 11;
/// Width of the TRAP vector field.
pub const TRAP_VECT8: u32 = 8;

/// Mask with the low `width` bits set.
#[inline]
pub const fn mask(width: u32) -> Word {
    if width >= WORD_BITS {
        Word::MAX
    } else {
        (1 << width) - 1
    }
}

/// Extract bits `hi..=lo` of `word`, shifted down to bit 0.
#[inline]
pub const fn bits(word: Word, hi: u32, lo: u32) -> Word {
    debug_assert!(hi < WORD_BITS && lo <= hi);
    (word >> lo) & mask(hi - lo + 1)
}

/// Test a single bit.
#[inline]
pub const fn bit(word: Word, n: u32) -> bool {
    bits(word, n, n) == 1
}

/// The opcode field, `IR[15:12]`.
#[inline]
pub const fn opcode(word: Word) -> Word {
    bits(word, 15, 12)
}

/// The destination / source register field, `IR[11:9]`.
#[inline]
pub const fn dr(word: Word) -> Word {
    bits(word, 11, 9)
}

/// The first source / base register field, `IR[8:6]`.
#[inline]
pub const fn sr1(word: Word) -> Word {
    bits(word, 8, 6)
}

/// The second source register field, `IR[2:0]`.
#[inline]
pub const fn sr2(word: Word) -> Word {
    bits(word, 2, 0)
}

/// Sign-extend the low `width` bits of `value` to a full signed word.
///
/// The bit at position `width - 1` is replicated into every higher bit.
/// Bits of `value` above `width` are ignored.
#[inline]
pub const fn sign_extend(value: Word, width: u32) -> SignedWord {
    debug_assert!(width > 0 && width <= WORD_BITS);
    let shift = WORD_BITS - width;
    ((value << shift) as SignedWord) >> shift
}

/// Reduce a signed value to its low `width` bits (two's complement).
///
/// Inverse of [`sign_extend`] for values that fit in `width` bits.
#[inline]
pub const fn truncate(value: SignedWord, width: u32) -> Word {
    (value as Word) & mask(width)
}

/// Replace bits `hi..=lo` of `word` with the low bits of `value`.
#[inline]
pub const fn insert(word: Word, value: Word, hi: u32, lo: u32) -> Word {
    let field = mask(hi - lo + 1);
    (word & !(field << lo)) | ((value & field) << lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_opcode_and_register_fields() {
        // ADD R1, R0, #0
        let word = 0x1220;
        assert_eq!(opcode(word), 0b0001);
        assert_eq!(dr(word), 1);
        assert_eq!(sr1(word), 0);
        assert!(bit(word, 5));
        assert_eq!(bits(word, 4, 0), 0);
    }

    #[test]
    fn test_sign_extend_known_values() {
        assert_eq!(sign_extend(0b01111, IMM5), 15);
        assert_eq!(sign_extend(0b10000, IMM5), -16);
        assert_eq!(sign_extend(0b11111, IMM5), -1);
        assert_eq!(sign_extend(0x1FF, PC_OFFSET9), -1);
        assert_eq!(sign_extend(0x0FF, PC_OFFSET9), 255);
        assert_eq!(sign_extend(0x400, PC_OFFSET11), -1024);
        assert_eq!(sign_extend(0x20, OFFSET6), -32);
    }

    #[test]
    fn test_sign_extend_ignores_high_garbage() {
        assert_eq!(sign_extend(0xFFE1, IMM5), 1);
    }

    proptest! {
        #[test]
        fn prop_sign_extend_matches_arithmetic_shift(value: u16, width in 1u32..=16) {
            let low = value & mask(width);
            let expected = if width < 16 && low & (1 << (width - 1)) != 0 {
                i32::from(low) - (1i32 << width)
            } else if width == 16 {
                i32::from(low as i16)
            } else {
                i32::from(low)
            };
            prop_assert_eq!(i32::from(sign_extend(value, width)), expected);
        }

        #[test]
        fn prop_truncate_inverts_sign_extend(value: u16, width in 1u32..=16) {
            let low = value & mask(width);
            prop_assert_eq!(truncate(sign_extend(low, width), width), low);
        }

        #[test]
        fn prop_insert_then_extract(word: u16, value: u16, lo in 0u32..16, len in 1u32..=16) {
            let hi = (lo + len - 1).min(15);
            let updated = insert(word, value, hi, lo);
            prop_assert_eq!(bits(updated, hi, lo), value & mask(hi - lo + 1));
            // Bits outside the field are untouched.
            let outside = !(mask(hi - lo + 1) << lo);
            prop_assert_eq!(updated & outside, word & outside);
        }
    }
}
