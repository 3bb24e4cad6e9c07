//! # PreSieve — Tiled Small-Prime Pattern
//!
//! Multiples of the smallest wheel primes (7 up to a configurable limit in
//! [13, 23]) are not crossed off per segment. Instead a bit pattern of their
//! combined divisibility is computed once and tiled into every segment as
//! its initialization, replacing millions of strikes with a memcpy.
//!
//! The pattern's period is `Q = 7 * 11 * ... * limit` bytes: the
//! divisibility pattern repeats every Q numbers, and since gcd(Q, 30) = 1
//! the byte-aligned period is Q bytes (30Q numbers). The sizes are 1001
//! bytes at limit 13 and about 7 MB at limit 23; the default 19 uses 316 KB.
//!
//! The pattern clears the pattern primes themselves (7 is a multiple of 7),
//! so applying the tile at segment low 0 restores their bits afterwards.
//! Multiples of 2, 3 and 5 need no treatment at all: the wheel encoding has
//! no bits for them.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SieveError};
use crate::wheel;

/// Candidate pattern primes; the configured limit selects a prefix.
const PATTERN_PRIMES: [u32; 6] = [7, 11, 13, 17, 19, 23];

/// Read-only pre-sieve pattern, shared across all workers of a run.
pub struct PreSieveTable {
    limit: u32,
    pattern: Vec<u8>,
    /// Bits of the pattern primes themselves, restored in the low-0 tile.
    restore_mask: u8,
}

impl PreSieveTable {
    /// Build the pattern for all primes 7..=limit (limit clamped to [13, 23]).
    pub fn new(limit: u32) -> Result<Arc<Self>> {
        let limit = limit.clamp(13, 23);
        let primes: Vec<u32> = PATTERN_PRIMES.iter().copied().filter(|&p| p <= limit).collect();
        let period: usize = primes.iter().map(|&p| p as usize).product();

        let mut pattern = Vec::new();
        pattern
            .try_reserve_exact(period)
            .map_err(|_| SieveError::alloc("pre-sieve pattern", period))?;
        pattern.resize(period, 0xff);

        let mut restore_mask = 0u8;
        let high = period as u64 * 30 + 1;
        for &p in &primes {
            restore_mask |= 1 << wheel::bit_index(p % 30);
            // strike every multiple p*f with f coprime to 30, starting at f=1
            let p = p as u64;
            let mut f = 1u64;
            let mut spoke = 0;
            while p * f <= high {
                let v = p * f;
                pattern[((v - 7) / 30) as usize] &= !(1u8 << wheel::bit_index((v % 30) as u32));
                f += SPOKE_GAPS[spoke] as u64;
                spoke = (spoke + 1) % 8;
            }
        }

        debug!(limit, bytes = period, "pre-sieve pattern built");
        Ok(Arc::new(PreSieveTable { limit, pattern, restore_mask }))
    }

    /// Largest prime whose multiples the pattern covers.
    #[inline]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Initialize a segment buffer by tiling the pattern, phase-aligned to
    /// the segment's absolute position.
    pub fn apply(&self, sieve: &mut [u8], segment_low: u64) {
        let period = self.pattern.len();
        let mut offset = ((segment_low / 30) as usize) % period;
        let mut pos = 0;
        while pos < sieve.len() {
            let n = (period - offset).min(sieve.len() - pos);
            sieve[pos..pos + n].copy_from_slice(&self.pattern[offset..offset + n]);
            pos += n;
            offset = 0;
        }
        // The tile at absolute 0 contains the pattern primes as values;
        // give them their candidate bits back.
        if segment_low == 0 {
            sieve[0] |= self.restore_mask;
        }
    }
}

/// Gaps between consecutive mod-30 spokes (1, 7, 11, ..., 29, then 31).
const SPOKE_GAPS: [u32; 8] = [6, 4, 2, 4, 2, 4, 6, 2];
