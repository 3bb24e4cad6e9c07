//! # Generator — Bootstrapping the Sieving Primes
//!
//! Sieving [start, stop] needs every prime up to sqrt(stop); sieving those
//! needs primes up to stop^(1/4), and at that size a plain odds-only bitmap
//! is instant. The chain is therefore:
//!
//! - level 0: odds-only sieve up to stop^(1/4) (at most 2^16 for u64),
//! - level 1: a [`Segmenter`] over [7, sqrt(stop)] whose consumer relays
//!   every prime it finds into level 2,
//! - level 2: the caller's Segmenter over [start, stop] feeding its sink.
//!
//! Levels are driven bottom-up: each level's `sieve(p)` calls advance the
//! level above lazily, and `finish()` cascades. The composition replaces
//! the inheritance the problem is usually written with: the relay is just
//! another [`SegmentConsumer`].

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::isqrt;
use crate::presieve::PreSieveTable;
use crate::segment::{SegmentConsumer, Segmenter};
use crate::status::SieveStatus;
use crate::wheel;

/// Consumer that feeds every prime of a processed segment into the next
/// Segmenter of the chain.
struct PrimeRelay<'a, C: SegmentConsumer> {
    target: &'a mut Segmenter<C>,
}

impl<C: SegmentConsumer> SegmentConsumer for PrimeRelay<'_, C> {
    fn on_segment(&mut self, sieve: &[u8], segment_low: u64) {
        wheel::for_each_prime_in(sieve, segment_low, |p| self.target.sieve(p));
    }
}

/// Odds-only sieve of [3, limit]: one bit per integer, odd bits set, even
/// bits dead from the start.
fn bootstrap_primes(limit: u64) -> Vec<u64> {
    let n = limit as usize;
    if n < 3 {
        return Vec::new();
    }
    let mut bits = vec![0xaaaa_aaaau32; n / 32 + 1];
    let alive = |bits: &[u32], i: usize| bits[i >> 5] & (1 << (i & 31)) != 0;
    let mut i = 3usize;
    while i * i <= n {
        if alive(&bits, i) {
            let mut j = i * i;
            while j <= n {
                bits[j >> 5] &= !(1 << (j & 31));
                j += 2 * i;
            }
        }
        i += 2;
    }
    let mut primes = Vec::new();
    let mut v = 3usize;
    while v <= n {
        if alive(&bits, v) {
            primes.push(v as u64);
        }
        v += 2;
    }
    primes
}

/// Sieve [start, stop] into `consumer`: builds the finder Segmenter, runs
/// the generator chain above it, and returns the consumer with its
/// accumulated state. `stop >= 7` and `stop >= start` are the caller's
/// responsibility (the sub-7 primes never reach a Segmenter).
pub fn sieve_interval<C: SegmentConsumer>(
    start: u64,
    stop: u64,
    sieve_len: usize,
    pre: &Arc<PreSieveTable>,
    status: Option<Arc<SieveStatus>>,
    consumer: C,
) -> Result<C> {
    let mut finder = Segmenter::new(start, stop, sieve_len, Arc::clone(pre), consumer, status)?;
    let sqrt_stop = isqrt(stop);
    if sqrt_stop > pre.limit() as u64 {
        // the generator segmenter produces the sieving primes for the
        // finder; its own sieving primes come from the level-0 bitmap
        let mut generator = Segmenter::new(
            7,
            sqrt_stop,
            sieve_len,
            Arc::clone(pre),
            PrimeRelay { target: &mut finder },
            None,
        )?;
        let seeds = bootstrap_primes(isqrt(sqrt_stop));
        debug!(sqrt_stop, seeds = seeds.len(), "generator chain bootstrapped");
        for p in seeds {
            generator.sieve(p);
        }
        generator.finish();
    }
    finder.finish();
    Ok(finder.into_consumer())
}
