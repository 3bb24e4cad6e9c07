//! # Segment — The Segmented Sieve Driver
//!
//! A [`Segmenter`] owns one cache-resident sieve buffer and the three
//! cross-off engines, and walks a 30-aligned window left to right across
//! its interval. Sieving primes are delivered in ascending order through
//! [`Segmenter::sieve`]; the driver exploits that ordering for its
//! segment-ready rule: once an incoming prime satisfies p^2 > segmentHigh,
//! no prime seen later can have a multiple inside the current segment, so
//! the segment is sieved and handed to the consumer.
//!
//! Per segment: pre-sieve tile, small/medium/big cross-off, boundary
//! masking for the first and last segment, consumer callback, progress.
//!
//! Consumers implement the single-method [`SegmentConsumer`] capability.
//! The counting/printing sink and the prime relay that feeds a downstream
//! Segmenter are the two implementations in this crate.

use std::sync::Arc;

use crate::erat_big::EratBig;
use crate::erat_medium::EratMedium;
use crate::erat_small::EratSmall;
use crate::error::{Result, SieveError};
use crate::isqrt;
use crate::presieve::PreSieveTable;
use crate::status::SieveStatus;
use crate::wheel::{self, NUMBERS_PER_BYTE};

/// Receiver of finished segments.
pub trait SegmentConsumer {
    /// Called once per processed segment with the sieved bit buffer and the
    /// value of the segment's first 30-block. Set bits are primes.
    fn on_segment(&mut self, sieve: &[u8], segment_low: u64);
}

/// Segmented sieve over one contiguous interval.
pub struct Segmenter<C: SegmentConsumer> {
    /// Effective interval start: max(caller start, 7).
    start: u64,
    stop: u64,
    sqrt_stop: u64,
    segment_low: u64,
    segment_high: u64,
    sieve: Vec<u8>,
    pre: Arc<PreSieveTable>,
    small: EratSmall,
    medium: EratMedium,
    big: EratBig,
    /// Largest prime for EratSmall: 2x the byte count (sieveSize*30/15).
    limit_small: u64,
    /// Largest prime for EratMedium: the segment span.
    limit_medium: u64,
    consumer: C,
    status: Option<Arc<SieveStatus>>,
    first_segment: bool,
}

impl<C: SegmentConsumer> Segmenter<C> {
    /// `sieve_len` is the buffer size in bytes (a power of two).
    pub fn new(
        start: u64,
        stop: u64,
        sieve_len: usize,
        pre: Arc<PreSieveTable>,
        consumer: C,
        status: Option<Arc<SieveStatus>>,
    ) -> Result<Self> {
        debug_assert!(sieve_len.is_power_of_two());
        let start = start.max(7);
        if stop < start {
            return Err(SieveError::InvalidArgument("STOP must be >= START"));
        }

        // Largest 30-aligned low that keeps every candidate >= start
        // representable; values 0 and 1 mod 30 live in the byte of the
        // preceding 30-block, hence the extra step down.
        let mut remainder = start % 30;
        if remainder <= 1 {
            remainder += 30;
        }
        let segment_low = start - remainder;
        let segment_high = segment_low + sieve_len as u64 * NUMBERS_PER_BYTE + 1;

        let mut sieve = Vec::new();
        sieve
            .try_reserve_exact(sieve_len)
            .map_err(|_| SieveError::alloc("sieve buffer", sieve_len))?;
        sieve.resize(sieve_len, 0);

        let sqrt_stop = isqrt(stop);
        Ok(Segmenter {
            start,
            stop,
            sqrt_stop,
            segment_low,
            segment_high,
            sieve,
            pre,
            small: EratSmall::new(),
            medium: EratMedium::new(),
            big: EratBig::new(sieve_len, sqrt_stop)?,
            limit_small: 2 * sieve_len as u64,
            limit_medium: sieve_len as u64 * NUMBERS_PER_BYTE,
            consumer,
            status,
            first_segment: true,
        })
    }

    /// Interval end, inclusive.
    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// Deliver the next sieving prime. Primes must arrive in ascending
    /// order and not exceed sqrt(stop). Primes at or below the pre-sieve
    /// limit are already covered by the tiled pattern and are ignored.
    pub fn sieve(&mut self, prime: u64) {
        debug_assert!(prime <= self.sqrt_stop);
        if prime <= self.pre.limit() as u64 {
            return;
        }
        let square = prime * prime;
        while square > self.segment_high && self.segment_low <= self.stop {
            self.sieve_segment();
        }
        if self.segment_low > self.stop {
            return;
        }
        if prime <= self.limit_small {
            self.small.add_prime(prime, self.segment_low);
        } else if prime <= self.limit_medium {
            self.medium.add_prime(prime, self.segment_low);
        } else {
            self.big.add_prime(prime, self.segment_low);
        }
    }

    /// Sieve all remaining segments and flush them to the consumer.
    pub fn finish(&mut self) {
        while self.segment_low <= self.stop {
            self.sieve_segment();
        }
    }

    /// Recover the consumer (and its accumulated state) after finish().
    pub fn into_consumer(self) -> C {
        self.consumer
    }

    fn sieve_segment(&mut self) {
        let low = self.segment_low;
        self.pre.apply(&mut self.sieve, low);
        self.small.cross_off(&mut self.sieve);
        self.medium.cross_off(&mut self.sieve);
        self.big.cross_off(&mut self.sieve);

        if self.first_segment {
            self.mask_below_start();
            self.first_segment = false;
        }
        if self.segment_high > self.stop {
            self.mask_above_stop();
        }

        self.consumer.on_segment(&self.sieve, low);
        if let Some(status) = &self.status {
            status.segment_done(self.sieve.len() as u64 * NUMBERS_PER_BYTE);
        }

        let span = self.sieve.len() as u64 * NUMBERS_PER_BYTE;
        self.segment_low += span;
        self.segment_high += span;
    }

    /// Clear candidates below `start`; by construction of the first
    /// segment low they all sit in byte 0.
    fn mask_below_start(&mut self) {
        let low = self.segment_low;
        for bit in 0..8 {
            if low + (wheel::BIT_RESIDUES[bit] as u64) < self.start {
                self.sieve[0] &= !(1u8 << bit);
            }
        }
    }

    /// Clear candidates above `stop` in the (partial) last segment.
    fn mask_above_stop(&mut self) {
        let low = self.segment_low;
        if self.stop >= low + 7 {
            let last = ((self.stop - low - 7) / 30) as usize;
            let base = low + last as u64 * 30;
            for bit in 0..8 {
                if base + wheel::BIT_RESIDUES[bit] as u64 > self.stop {
                    self.sieve[last] &= !(1u8 << bit);
                }
            }
            for byte in &mut self.sieve[last + 1..] {
                *byte = 0;
            }
        } else {
            // stop falls into the sub-7 gap below this segment's first
            // candidate; nothing in the buffer is in range
            self.sieve.fill(0);
        }
    }
}
