//! # PrimeSieve — Top-Level Driver and Public API
//!
//! [`PrimeSieve`] is the crate's front door: configure an interval, a flag
//! word and optional tuning (sieve size, pre-sieve limit, worker count),
//! then call [`PrimeSieve::sieve`] and read the counters. The heavy lifting
//! is delegated: the generator chain bootstraps the sieving primes, the
//! Segmenter walks the interval, the sink consumes segments, and the
//! parallel driver fans chunks out to workers.
//!
//! The driver itself owns exactly two pieces of sieving logic. First, the
//! finitely many primes and k-tuplets with a member below 7 come from a
//! fixed table, emitted once before any worker forks (the wheel encoding
//! cannot represent 2, 3 or 5). Second, it enforces every argument
//! precondition up front so the engines can run unchecked.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use crate::error::{Result, SieveError};
use crate::flags::{self, *};
use crate::generator;
use crate::parallel::{self, SharedCallback};
use crate::presieve::PreSieveTable;
use crate::sink::{EmitMode, PrimeSink};
use crate::status::SieveStatus;

/// Upper bound (exclusive) for start and stop. The headroom keeps the
/// next-multiple arithmetic of the cross-off engines inside u64: a sieving
/// prime is below 2^32 and never advances a multiple by more than 10p.
pub const MAX_STOP: u64 = u64::MAX - 10 * (u32::MAX as u64);

/// Primes and k-tuplets with a member below 7, applied iff
/// start <= min && stop >= max: (min, max, counter index, text form).
const SMALL_PRIMES: [(u64, u64, usize, &str); 8] = [
    (2, 2, 0, "2"),
    (3, 3, 0, "3"),
    (5, 5, 0, "5"),
    (3, 5, 1, "(3, 5)"),
    (5, 7, 1, "(5, 7)"),
    (5, 11, 2, "(5, 7, 11)"),
    (5, 13, 3, "(5, 7, 11, 13)"),
    (5, 17, 4, "(5, 7, 11, 13, 17)"),
];

/// Segmented sieve of Eratosthenes over a 64-bit interval.
pub struct PrimeSieve {
    start: u64,
    stop: u64,
    /// Segment buffer size in KiB, power of two in [1, 4096].
    sieve_size_kib: u32,
    pre_sieve_limit: u32,
    flags: u32,
    num_threads: usize,
    callbacks_thread_safe: bool,
    counts: [u64; 7],
    status_percent: f64,
    time_elapsed: f64,
}

impl Default for PrimeSieve {
    fn default() -> Self {
        PrimeSieve {
            start: 0,
            stop: 0,
            sieve_size_kib: 32,
            pre_sieve_limit: 19,
            flags: COUNT_PRIMES,
            num_threads: 1,
            callbacks_thread_safe: false,
            counts: [0; 7],
            status_percent: 0.0,
            time_elapsed: 0.0,
        }
    }
}

impl PrimeSieve {
    pub fn new() -> Self {
        PrimeSieve::default()
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Set the interval start; must be below 2^64 - 1 - 10 * (2^32 - 1).
    pub fn set_start(&mut self, start: u64) -> Result<()> {
        if start >= MAX_STOP {
            return Err(SieveError::InvalidArgument(
                "START must be < 2^64 - 1 - 10 * (2^32 - 1)",
            ));
        }
        self.start = start;
        Ok(())
    }

    /// Set the interval end; same bound as the start.
    pub fn set_stop(&mut self, stop: u64) -> Result<()> {
        if stop >= MAX_STOP {
            return Err(SieveError::InvalidArgument(
                "STOP must be < 2^64 - 1 - 10 * (2^32 - 1)",
            ));
        }
        self.stop = stop;
        Ok(())
    }

    /// Set the segment buffer size in KiB: clamped to [1, 4096] and rounded
    /// up to the next power of two. Best throughput is usually the L1 data
    /// cache size for small stops and the L2 size above ~10^14.
    pub fn set_sieve_size(&mut self, kib: u32) {
        self.sieve_size_kib = kib.clamp(1, 4096).next_power_of_two();
    }

    /// Set the pre-sieve limit, clamped to [13, 23]. Higher limits cost
    /// more one-time initialization (the pattern at 23 is 7 MB) and speed
    /// up long runs.
    pub fn set_pre_sieve_limit(&mut self, limit: u32) {
        self.pre_sieve_limit = limit.clamp(13, 23);
    }

    /// Replace the flag word. Bits at position 20 and above are rejected.
    pub fn set_flags(&mut self, flags: u32) -> Result<()> {
        flags::validate(flags)?;
        self.flags = flags;
        Ok(())
    }

    /// Or additional flags into the current word; same validation.
    pub fn add_flags(&mut self, flags: u32) -> Result<()> {
        flags::validate(flags)?;
        self.flags |= flags;
        Ok(())
    }

    /// Number of chunk workers for eligible runs (counting without print
    /// or callbacks, unless callbacks are declared thread-safe).
    pub fn set_num_threads(&mut self, threads: usize) {
        self.num_threads = threads.max(1);
    }

    /// Declare registered callbacks safe to invoke from worker threads.
    /// Emission is then serialized per segment but unordered across chunks.
    pub fn set_callbacks_thread_safe(&mut self, thread_safe: bool) {
        self.callbacks_thread_safe = thread_safe;
    }

    // ── Getters ────────────────────────────────────────────────────

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// Effective segment buffer size in KiB (clamped, power of two).
    pub fn sieve_size(&self) -> u32 {
        self.sieve_size_kib
    }

    pub fn pre_sieve_limit(&self) -> u32 {
        self.pre_sieve_limit
    }

    /// The low 20 flag bits.
    pub fn flags(&self) -> u32 {
        self.flags & VALID_FLAGS
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn prime_count(&self) -> u64 {
        self.counts[0]
    }

    pub fn twin_count(&self) -> u64 {
        self.counts[1]
    }

    pub fn triplet_count(&self) -> u64 {
        self.counts[2]
    }

    pub fn quadruplet_count(&self) -> u64 {
        self.counts[3]
    }

    pub fn quintuplet_count(&self) -> u64 {
        self.counts[4]
    }

    pub fn sextuplet_count(&self) -> u64 {
        self.counts[5]
    }

    pub fn septuplet_count(&self) -> u64 {
        self.counts[6]
    }

    /// Counter by index: 0 primes, 1 twins, ..., 6 septuplets.
    pub fn counts(&self, index: u32) -> Result<u64> {
        if index >= 7 {
            return Err(SieveError::OutOfRange(index));
        }
        Ok(self.counts[index as usize])
    }

    /// Completion percent of the last (or running) sieve() call.
    pub fn status_percent(&self) -> f64 {
        self.status_percent
    }

    /// Wall-clock seconds of the last sieve() call.
    pub fn time_elapsed(&self) -> f64 {
        self.time_elapsed
    }

    // ── Sieving ────────────────────────────────────────────────────

    /// Sieve [start, stop] with the configured flags.
    pub fn sieve(&mut self) -> Result<()> {
        self.run(None)
    }

    /// Sieve the given interval with the configured flags.
    pub fn sieve_range(&mut self, start: u64, stop: u64) -> Result<()> {
        self.set_start(start)?;
        self.set_stop(stop)?;
        self.sieve()
    }

    /// Count the primes in [start, stop].
    pub fn count_primes(&mut self, start: u64, stop: u64) -> Result<u64> {
        self.set_flags(COUNT_PRIMES)?;
        self.sieve_range(start, stop)?;
        Ok(self.counts[0])
    }

    /// Stream each prime in [start, stop] to a plain function.
    pub fn generate_primes32(&mut self, start: u32, stop: u32, callback: fn(u32)) -> Result<()> {
        let mut adapted = move |v: u64| callback(v as u32);
        self.run_callback(start as u64, stop as u64, CALLBACK32_PRIMES, &mut adapted)
    }

    /// Stream each prime in [start, stop] to a stateful closure.
    pub fn for_each_prime32<F>(&mut self, start: u32, stop: u32, mut callback: F) -> Result<()>
    where
        F: FnMut(u32) + Send,
    {
        let mut adapted = move |v: u64| callback(v as u32);
        self.run_callback(start as u64, stop as u64, CALLBACK32_CTX_PRIMES, &mut adapted)
    }

    /// Stream each prime in [start, stop] to a plain function.
    pub fn generate_primes64(&mut self, start: u64, stop: u64, callback: fn(u64)) -> Result<()> {
        let mut adapted = move |v: u64| callback(v);
        self.run_callback(start, stop, CALLBACK64_PRIMES, &mut adapted)
    }

    /// Stream each prime in [start, stop] to a stateful closure.
    pub fn for_each_prime64<F>(&mut self, start: u64, stop: u64, mut callback: F) -> Result<()>
    where
        F: FnMut(u64) + Send,
    {
        let mut adapted = |v: u64| callback(v);
        self.run_callback(start, stop, CALLBACK64_CTX_PRIMES, &mut adapted)
    }

    fn run_callback(
        &mut self,
        start: u64,
        stop: u64,
        flag: u32,
        callback: &mut (dyn FnMut(u64) + Send),
    ) -> Result<()> {
        self.set_start(start)?;
        self.set_stop(stop)?;
        self.flags = flag;
        // streaming workloads are usually short; a small pattern beats a
        // thorough one, and the configured limit comes back afterwards
        let configured_limit = self.pre_sieve_limit;
        self.pre_sieve_limit = 13;
        let result = self.run(Some(callback));
        self.pre_sieve_limit = configured_limit;
        result
    }

    fn run(&mut self, mut callback: Option<&mut (dyn FnMut(u64) + Send)>) -> Result<()> {
        if self.stop < self.start {
            return Err(SieveError::InvalidArgument("STOP must be >= START"));
        }
        if flags::any_set(self.flags, CALLBACK_FLAGS) {
            if callback.is_none() {
                return Err(SieveError::InvalidArgument(
                    "callback flags are set but no callback is registered",
                ));
            }
            if flags::any_set(self.flags, CALLBACK32_FLAGS) && self.stop > u32::MAX as u64 {
                return Err(SieveError::InvalidArgument(
                    "32-bit callbacks require STOP <= 2^32 - 1",
                ));
            }
        }

        let timer = Instant::now();
        self.counts = [0; 7];
        let status = SieveStatus::new(self.start, self.stop, flags::any_set(self.flags, PRINT_STATUS));

        let wants_print = flags::any_set(self.flags, PRINT_FLAGS);
        let mut out_buf = if wants_print {
            Some(io::BufWriter::new(io::stdout().lock()))
        } else {
            None
        };

        if self.start <= 5 {
            self.emit_small_primes(
                out_buf.as_mut().map(|w| w as &mut dyn Write),
                callback.as_deref_mut(),
            );
        }

        if self.stop >= 7 {
            let pre = PreSieveTable::new(self.pre_sieve_limit)?;
            let sieve_len = self.sieve_size_kib as usize * 1024;
            let parallel_ok = self.num_threads > 1
                && !wants_print
                && (!flags::any_set(self.flags, CALLBACK_FLAGS) || self.callbacks_thread_safe);

            let counts = if parallel_ok {
                let shared: Option<SharedCallback<'_>> =
                    callback.map(|cb| Arc::new(Mutex::new(cb)));
                parallel::sieve_chunked(
                    self.start,
                    self.stop,
                    self.flags,
                    sieve_len,
                    &pre,
                    &status,
                    self.num_threads,
                    shared,
                )?
            } else {
                let emit = match callback {
                    Some(cb) => EmitMode::Exclusive(cb),
                    None => EmitMode::None,
                };
                let out = out_buf.as_mut().map(|w| w as &mut dyn Write);
                let sink = PrimeSink::new(self.flags, out, emit);
                generator::sieve_interval(
                    self.start,
                    self.stop,
                    sieve_len,
                    &pre,
                    Some(Arc::clone(&status)),
                    sink,
                )?
                .into_counts()
            };
            for (total, part) in self.counts.iter_mut().zip(counts) {
                *total += part;
            }
        }

        status.finish();
        self.status_percent = status.percent();
        if let Some(out) = out_buf.as_mut() {
            let _ = out.flush();
        }
        self.time_elapsed = timer.elapsed().as_secs_f64();
        debug!(
            start = self.start,
            stop = self.stop,
            primes = self.counts[0],
            elapsed = self.time_elapsed,
            "sieve finished"
        );
        Ok(())
    }

    /// Emit the primes/tuplets with a member below 7 exactly once, before
    /// any worker forks.
    fn emit_small_primes(
        &mut self,
        mut out: Option<&mut dyn Write>,
        mut callback: Option<&mut (dyn FnMut(u64) + Send + '_)>,
    ) {
        for &(min, max, k, text) in SMALL_PRIMES.iter() {
            if self.start <= min && self.stop >= max {
                if flags::any_set(self.flags, CALLBACK_FLAGS) {
                    if k == 0 {
                        if let Some(cb) = callback.as_deref_mut() {
                            cb(min);
                        }
                    }
                } else {
                    if flags::any_set(self.flags, COUNT_PRIMES << k) {
                        self.counts[k] += 1;
                    }
                    if flags::any_set(self.flags, PRINT_PRIMES << k) {
                        if let Some(out) = out.as_deref_mut() {
                            let _ = writeln!(out, "{}", text);
                        }
                    }
                }
            }
        }
    }
}
