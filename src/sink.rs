//! # Sink — Counting, Printing and Streaming Consumer
//!
//! The [`PrimeSink`] receives each processed segment and applies whatever
//! the flag word asks for: popcount-based prime counting, table-driven
//! k-tuplet counting, line-per-prime printing, tuplet printing, and
//! callback streaming. Which of these run is decided once per segment from
//! the flags and the callback tag, never inside the per-prime loops.
//!
//! ## k-tuplet recognition
//!
//! Every admissible k-tuplet pattern (k in 2..=7) is a fixed set of
//! residues inside one 30-block, and because residue 31 shares the byte of
//! residue 29, each pattern is a single byte mask:
//!
//! - twins: (11,13) (17,19) (29,31)
//! - triplets: (7,11,13) (11,13,17) (13,17,19) (17,19,23)
//! - quadruplets: (11,13,17,19)
//! - quintuplets: (7,...,19) (11,...,23)
//! - sextuplets: (7,...,23)
//! - septuplets: (11,...,31)
//!
//! Counting a segment is then one 256-entry table lookup per byte per
//! enabled k; the tables are derived from the masks on first use.

use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use crate::flags::{self, CALLBACK_FLAGS, COUNT_PRIMES, COUNT_TUPLET_FLAGS, COUNT_TWINS, PRINT_PRIMES, PRINT_TWINS};
use crate::segment::SegmentConsumer;
use crate::wheel;

/// (byte mask, member residues) per admissible pattern, twins first.
const TUPLET_PATTERNS: [&[(u8, &[u32])]; 6] = [
    &[(0x06, &[11, 13]), (0x18, &[17, 19]), (0xc0, &[29, 31])],
    &[
        (0x07, &[7, 11, 13]),
        (0x0e, &[11, 13, 17]),
        (0x1c, &[13, 17, 19]),
        (0x38, &[17, 19, 23]),
    ],
    &[(0x1e, &[11, 13, 17, 19])],
    &[(0x1f, &[7, 11, 13, 17, 19]), (0x3e, &[11, 13, 17, 19, 23])],
    &[(0x3f, &[7, 11, 13, 17, 19, 23])],
    &[(0xfe, &[11, 13, 17, 19, 23, 29, 31])],
];

/// `tuplet_counts()[k][byte]` = number of (k+2)-tuplets led inside `byte`.
fn tuplet_counts() -> &'static [[u8; 256]; 6] {
    static TABLES: OnceLock<[[u8; 256]; 6]> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut tables = [[0u8; 256]; 6];
        for (k, patterns) in TUPLET_PATTERNS.iter().enumerate() {
            for byte in 0..256usize {
                tables[k][byte] = patterns
                    .iter()
                    .filter(|&&(mask, _)| byte as u8 & mask == mask)
                    .count() as u8;
            }
        }
        tables
    })
}

/// How found primes leave the sink, decided once per run.
pub enum EmitMode<'a> {
    /// No callback registered.
    None,
    /// Single-worker streaming.
    Exclusive(&'a mut dyn FnMut(u64)),
    /// Multi-worker streaming for callbacks declared thread-safe; the lock
    /// serializes one segment's emission at a time.
    Shared(Arc<Mutex<&'a mut (dyn FnMut(u64) + Send)>>),
}

/// Segment consumer that counts, prints and/or streams.
pub struct PrimeSink<'a> {
    flags: u32,
    counts: [u64; 7],
    out: Option<&'a mut dyn Write>,
    emit: EmitMode<'a>,
}

impl<'a> PrimeSink<'a> {
    pub fn new(flags: u32, out: Option<&'a mut dyn Write>, emit: EmitMode<'a>) -> Self {
        PrimeSink { flags, counts: [0; 7], out, emit }
    }

    /// Count-only sink for parallel workers.
    pub fn counting(flags: u32) -> Self {
        PrimeSink::new(flags & flags::COUNT_FLAGS, None, EmitMode::None)
    }

    /// The seven counters: primes, twins, ..., septuplets.
    pub fn counts(&self) -> [u64; 7] {
        self.counts
    }

    pub fn into_counts(self) -> [u64; 7] {
        self.counts
    }
}

impl SegmentConsumer for PrimeSink<'_> {
    fn on_segment(&mut self, sieve: &[u8], segment_low: u64) {
        if flags::any_set(self.flags, COUNT_PRIMES) {
            self.counts[0] += sieve
                .chunks_exact(8)
                .map(|w| u64::from_le_bytes(w.try_into().unwrap()).count_ones() as u64)
                .sum::<u64>();
        }

        if flags::any_set(self.flags, COUNT_TUPLET_FLAGS) {
            let tables = tuplet_counts();
            for k in 0..6 {
                if flags::any_set(self.flags, COUNT_TWINS << k) {
                    self.counts[k + 1] += sieve
                        .iter()
                        .map(|&b| tables[k][b as usize] as u64)
                        .sum::<u64>();
                }
            }
        }

        if let Some(out) = self.out.as_deref_mut() {
            if flags::any_set(self.flags, PRINT_PRIMES) {
                wheel::for_each_prime_in(sieve, segment_low, |v| {
                    let _ = writeln!(out, "{}", v);
                });
            }
            for k in 0..6 {
                if flags::any_set(self.flags, PRINT_TWINS << k) {
                    print_tuplets(out, sieve, segment_low, TUPLET_PATTERNS[k]);
                }
            }
        }

        if flags::any_set(self.flags, CALLBACK_FLAGS) {
            match &mut self.emit {
                EmitMode::None => {}
                EmitMode::Exclusive(f) => {
                    wheel::for_each_prime_in(sieve, segment_low, |v| f(v));
                }
                EmitMode::Shared(shared) => {
                    let mut f = shared.lock().unwrap();
                    wheel::for_each_prime_in(sieve, segment_low, |v| (*f)(v));
                }
            }
        }
    }
}

fn print_tuplets(out: &mut dyn Write, sieve: &[u8], low: u64, patterns: &[(u8, &[u32])]) {
    for (i, &byte) in sieve.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for &(mask, residues) in patterns {
            if byte & mask == mask {
                let base = low + i as u64 * 30;
                let members: Vec<String> =
                    residues.iter().map(|&r| (base + r as u64).to_string()).collect();
                let _ = writeln!(out, "({})", members.join(", "));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! The tuplet tables are checked against the raw patterns, and the
    //! print/emit paths against hand-assembled segment buffers, so the sink
    //! can be validated without running a sieve.

    use super::*;
    use crate::flags::*;

    fn set_bit(sieve: &mut [u8], low: u64, v: u64) {
        let byte = ((v - low - 7) / 30) as usize;
        let bit = wheel::bit_index((v % 30) as u32);
        sieve[byte] |= 1 << bit;
    }

    // ── Tuplet Count Tables ─────────────────────────────────────────

    /// A fully set byte contains every pattern: 3 twins, 4 triplets,
    /// 1 quadruplet, 2 quintuplets, 1 sextuplet, 1 septuplet.
    #[test]
    fn full_byte_pattern_counts() {
        let t = tuplet_counts();
        assert_eq!(t[0][0xff], 3);
        assert_eq!(t[1][0xff], 4);
        assert_eq!(t[2][0xff], 1);
        assert_eq!(t[3][0xff], 2);
        assert_eq!(t[4][0xff], 1);
        assert_eq!(t[5][0xff], 1);
    }

    /// Partial bytes count exactly the fully contained patterns; a cleared
    /// member kills every pattern it participates in.
    #[test]
    fn partial_byte_pattern_counts() {
        let t = tuplet_counts();
        // bits 1,2 = (11,13) twin only
        assert_eq!(t[0][0x06], 1);
        assert_eq!(t[1][0x06], 0);
        // bits 1..=4 = (11,13,17,19): 2 twins, 2 triplets, 1 quadruplet
        assert_eq!(t[0][0x1e], 2);
        assert_eq!(t[1][0x1e], 2);
        assert_eq!(t[2][0x1e], 1);
        assert_eq!(t[3][0x1e], 0);
        // clearing bit 2 (residue 13) from 0xff leaves twin (17,19) + (29,31)
        assert_eq!(t[0][0xfb], 2);
        assert_eq!(t[1][0xfb], 1); // only (17,19,23)
        assert_eq!(t[2][0xfb], 0);
        assert_eq!(t[5][0xfb], 0);
    }

    /// The table agrees with a bit-level recount for every byte value.
    #[test]
    fn tables_match_mask_scan() {
        let t = tuplet_counts();
        for b in 0..256usize {
            for k in 0..6 {
                let expect = TUPLET_PATTERNS[k]
                    .iter()
                    .filter(|&&(m, _)| b as u8 & m == m)
                    .count() as u8;
                assert_eq!(t[k][b], expect, "byte {:#x}, k {}", b, k);
            }
        }
    }

    // ── Counting ────────────────────────────────────────────────────

    /// The constellation 101, 103, 107, 109, 113: two twins, three
    /// triplets, the quadruplet (101, 103, 107, 109) and the quintuplet
    /// (101, ..., 113).
    #[test]
    fn counts_known_constellation() {
        let mut sieve = vec![0u8; 8];
        for v in [101u64, 103, 107, 109, 113] {
            set_bit(&mut sieve, 90, v);
        }
        let mut sink = PrimeSink::new(
            COUNT_PRIMES | COUNT_TWINS | COUNT_TRIPLETS | COUNT_QUADRUPLETS | COUNT_QUINTUPLETS,
            None,
            EmitMode::None,
        );
        sink.on_segment(&sieve, 90);
        assert_eq!(sink.counts(), [5, 2, 3, 1, 1, 0, 0]);
    }

    /// Counters accumulate across segments and only enabled counters move.
    #[test]
    fn counting_respects_flags_and_accumulates() {
        let mut sieve = vec![0u8; 8];
        set_bit(&mut sieve, 0, 11);
        set_bit(&mut sieve, 0, 13);
        let mut sink = PrimeSink::new(COUNT_TWINS, None, EmitMode::None);
        sink.on_segment(&sieve, 0);
        sink.on_segment(&sieve, 240);
        assert_eq!(sink.counts(), [0, 2, 0, 0, 0, 0, 0]);
    }

    // ── Printing ────────────────────────────────────────────────────

    /// PRINT_PRIMES emits one value per line, ascending.
    #[test]
    fn prints_primes_line_per_value() {
        let mut sieve = vec![0u8; 8];
        for v in [7u64, 31, 97, 239] {
            set_bit(&mut sieve, 0, v);
        }
        let mut buf = Vec::new();
        let mut sink = PrimeSink::new(PRINT_PRIMES, Some(&mut buf), EmitMode::None);
        sink.on_segment(&sieve, 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "7\n31\n97\n239\n");
    }

    /// Tuplets print as a parenthesized member list.
    #[test]
    fn prints_tuplets_with_members() {
        let mut sieve = vec![0u8; 8];
        for v in [11u64, 13, 17, 19] {
            set_bit(&mut sieve, 0, v);
        }
        let mut buf = Vec::new();
        let mut sink = PrimeSink::new(PRINT_QUADRUPLETS, Some(&mut buf), EmitMode::None);
        sink.on_segment(&sieve, 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "(11, 13, 17, 19)\n");
    }

    // ── Callback Streaming ──────────────────────────────────────────

    /// The exclusive emitter sees every set bit in ascending order.
    #[test]
    fn exclusive_emitter_streams_ascending() {
        let mut sieve = vec![0u8; 16];
        for v in [37u64, 41, 241, 251, 467] {
            set_bit(&mut sieve, 30, v);
        }
        let mut got = Vec::new();
        {
            let mut push = |v: u64| got.push(v);
            let mut sink = PrimeSink::new(CALLBACK64_PRIMES, None, EmitMode::Exclusive(&mut push));
            sink.on_segment(&sieve, 30);
        }
        assert_eq!(got, vec![37, 41, 241, 251, 467]);
    }

    /// The shared emitter delivers under its lock; a single worker using it
    /// must behave identically to the exclusive path.
    #[test]
    fn shared_emitter_matches_exclusive() {
        let mut sieve = vec![0u8; 8];
        for v in [11u64, 29, 31] {
            set_bit(&mut sieve, 0, v);
        }
        let mut got: Vec<u64> = Vec::new();
        {
            let mut push = |v: u64| got.push(v);
            let shared: Arc<Mutex<&mut (dyn FnMut(u64) + Send)>> = Arc::new(Mutex::new(&mut push));
            let mut sink = PrimeSink::new(CALLBACK64_CTX_PRIMES, None, EmitMode::Shared(shared));
            sink.on_segment(&sieve, 0);
        }
        assert_eq!(got, vec![11, 29, 31]);
    }
}
