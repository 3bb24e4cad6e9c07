//! # Flags — Feature Selection Bitfield
//!
//! A sieve run is configured by a 20-bit flag word: seven count bits, seven
//! print bits, a status bit and four callback bits. Bit positions are fixed
//! and form part of the public ABI, so they are plain `u32` constants rather
//! than an enum. Bit 19 is reserved (accepted, ignored).

use crate::error::{Result, SieveError};

/// Count prime numbers.
pub const COUNT_PRIMES: u32 = 1 << 0;
/// Count twin primes (p, p+2).
pub const COUNT_TWINS: u32 = 1 << 1;
/// Count prime triplets (p, p+2, p+6) and (p, p+4, p+6).
pub const COUNT_TRIPLETS: u32 = 1 << 2;
/// Count prime quadruplets (p, p+2, p+6, p+8).
pub const COUNT_QUADRUPLETS: u32 = 1 << 3;
/// Count prime quintuplets.
pub const COUNT_QUINTUPLETS: u32 = 1 << 4;
/// Count prime sextuplets.
pub const COUNT_SEXTUPLETS: u32 = 1 << 5;
/// Count prime septuplets.
pub const COUNT_SEPTUPLETS: u32 = 1 << 6;

/// Print primes to the output stream, one per line.
pub const PRINT_PRIMES: u32 = 1 << 7;
/// Print twin primes as `(p1, p2)`.
pub const PRINT_TWINS: u32 = 1 << 8;
/// Print prime triplets.
pub const PRINT_TRIPLETS: u32 = 1 << 9;
/// Print prime quadruplets.
pub const PRINT_QUADRUPLETS: u32 = 1 << 10;
/// Print prime quintuplets.
pub const PRINT_QUINTUPLETS: u32 = 1 << 11;
/// Print prime sextuplets.
pub const PRINT_SEXTUPLETS: u32 = 1 << 12;
/// Print prime septuplets.
pub const PRINT_SEPTUPLETS: u32 = 1 << 13;

/// Write `\r<N>%` to stdout whenever the integer completion percent grows.
pub const PRINT_STATUS: u32 = 1 << 14;

/// Stream primes to a plain `fn(u32)` callback.
pub const CALLBACK32_PRIMES: u32 = 1 << 15;
/// Stream primes to a stateful `FnMut(u32)` callback.
pub const CALLBACK32_CTX_PRIMES: u32 = 1 << 16;
/// Stream primes to a plain `fn(u64)` callback.
pub const CALLBACK64_PRIMES: u32 = 1 << 17;
/// Stream primes to a stateful `FnMut(u64)` callback.
pub const CALLBACK64_CTX_PRIMES: u32 = 1 << 18;

/// All seven count bits.
pub const COUNT_FLAGS: u32 = 0x7f;
/// The six k-tuplet count bits (twins through septuplets).
pub const COUNT_TUPLET_FLAGS: u32 = COUNT_FLAGS & !COUNT_PRIMES;
/// All seven print bits.
pub const PRINT_FLAGS: u32 = 0x7f << 7;
/// All four callback bits.
pub const CALLBACK_FLAGS: u32 =
    CALLBACK32_PRIMES | CALLBACK32_CTX_PRIMES | CALLBACK64_PRIMES | CALLBACK64_CTX_PRIMES;
/// The 32-bit callback bits, which additionally require `stop <= u32::MAX`.
pub const CALLBACK32_FLAGS: u32 = CALLBACK32_PRIMES | CALLBACK32_CTX_PRIMES;

/// Mask of every meaningful bit, including the reserved bit 19.
pub const VALID_FLAGS: u32 = (1 << 20) - 1;

/// Reject flag words with bits at position 20 or above.
pub fn validate(flags: u32) -> Result<()> {
    if flags & !VALID_FLAGS != 0 {
        return Err(SieveError::InvalidArgument("flag bits >= 20 are invalid"));
    }
    Ok(())
}

/// True if any bit of `mask` is set in `flags`.
#[inline]
pub fn any_set(flags: u32, mask: u32) -> bool {
    flags & mask != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Bit Positions ──────────────────────────────────────────────

    /// The bit layout is a wire-level contract: counts at 0..=6, prints at
    /// 7..=13, status at 14, callbacks at 15..=18.
    #[test]
    fn bit_positions_are_fixed() {
        assert_eq!(COUNT_PRIMES, 1);
        assert_eq!(COUNT_SEPTUPLETS, 1 << 6);
        assert_eq!(PRINT_PRIMES, 1 << 7);
        assert_eq!(PRINT_SEPTUPLETS, 1 << 13);
        assert_eq!(PRINT_STATUS, 1 << 14);
        assert_eq!(CALLBACK32_PRIMES, 1 << 15);
        assert_eq!(CALLBACK64_CTX_PRIMES, 1 << 18);
    }

    /// Each print bit is its count bit shifted left by 7, which the k-tuplet
    /// dispatch relies on (`COUNT_PRIMES << k` / `PRINT_PRIMES << k`).
    #[test]
    fn print_bits_mirror_count_bits() {
        for k in 0..7 {
            assert_eq!(COUNT_PRIMES << (k + 7), PRINT_PRIMES << k);
        }
    }

    /// The masks partition the valid word: no overlap, and together with the
    /// reserved bit 19 they cover exactly VALID_FLAGS.
    #[test]
    fn masks_partition_the_flag_word() {
        assert_eq!(COUNT_FLAGS & PRINT_FLAGS, 0);
        assert_eq!(COUNT_FLAGS & CALLBACK_FLAGS, 0);
        assert_eq!(PRINT_FLAGS & CALLBACK_FLAGS, 0);
        assert_eq!(
            COUNT_FLAGS | PRINT_FLAGS | PRINT_STATUS | CALLBACK_FLAGS | (1 << 19),
            VALID_FLAGS
        );
    }

    // ── Validation ─────────────────────────────────────────────────

    /// Words using only bits 0..=19 pass; any bit at 20+ fails. The reserved
    /// bit 19 is accepted for forward compatibility.
    #[test]
    fn validate_rejects_high_bits() {
        assert!(validate(0).is_ok());
        assert!(validate(VALID_FLAGS).is_ok());
        assert!(validate(1 << 19).is_ok());
        assert!(validate(1 << 20).is_err());
        assert!(validate(u32::MAX).is_err());
    }
}
