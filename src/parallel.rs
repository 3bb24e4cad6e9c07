//! # Parallel — Chunked Multi-Worker Driver
//!
//! Splits [start, stop] into per-worker chunks and runs an independent
//! segmented sieve over each on a dedicated rayon pool, summing the seven
//! count vectors afterwards. Workers share only read-only state (flags,
//! the pre-sieve pattern) plus the atomic progress counter; there is no
//! other communication.
//!
//! ## Chunk alignment
//!
//! Interior chunk boundaries are placed at values 2 (mod 30): the chunk
//! before ends at 30k+1 and the next begins at 30k+2, so a sieve byte
//! (which covers 30k+7 ..= 30k+31) always belongs wholly to one worker.
//! Since every k-tuplet pattern lives inside one byte, tuplet counts are
//! exact under any worker count, and no value is lost in between: the
//! skipped 30k+2 ..= 30k+6 are all divisible by 2, 3 or 5.

use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, SieveError};
use crate::generator;
use crate::presieve::PreSieveTable;
use crate::sink::{EmitMode, PrimeSink};
use crate::status::SieveStatus;

/// A callback declared thread-safe by the caller, shared across workers;
/// each worker serializes one segment's emission at a time behind the lock.
pub(crate) type SharedCallback<'a> = Arc<Mutex<&'a mut (dyn FnMut(u64) + Send)>>;

/// Chunks below this span are not worth a worker of their own.
const MIN_CHUNK: u64 = 30 * 1024;

/// Split [start, stop] into at most `workers` non-overlapping chunks that
/// jointly cover the interval, interior boundaries at 2 (mod 30).
pub(crate) fn partition(start: u64, stop: u64, workers: usize) -> Vec<(u64, u64)> {
    let total = stop - start + 1;
    let workers = (workers.max(1) as u64).min(total / MIN_CHUNK).max(1);
    let mut chunks = Vec::with_capacity(workers as usize);
    let mut prev = start;
    for i in 1..workers {
        let target = start + (total / workers) * i;
        let boundary = target - target % 30 + 2;
        if boundary <= prev || boundary > stop {
            continue;
        }
        chunks.push((prev, boundary - 1));
        prev = boundary;
    }
    chunks.push((prev, stop));
    chunks
}

/// Sieve [start, stop] across up to `workers` chunks and return the summed
/// counts. With a shared callback the emission order across chunks is
/// unspecified; counts are partition-independent either way.
pub(crate) fn sieve_chunked(
    start: u64,
    stop: u64,
    flags: u32,
    sieve_len: usize,
    pre: &Arc<PreSieveTable>,
    status: &Arc<SieveStatus>,
    workers: usize,
    shared: Option<SharedCallback<'_>>,
) -> Result<[u64; 7]> {
    let chunks = partition(start, stop, workers);
    debug!(chunks = chunks.len(), workers, "interval partitioned");

    fn worker_sink<'a>(flags: u32, shared: &Option<SharedCallback<'a>>) -> PrimeSink<'a> {
        match shared {
            Some(cb) => PrimeSink::new(flags, None, EmitMode::Shared(Arc::clone(cb))),
            None => PrimeSink::counting(flags),
        }
    }

    if chunks.len() == 1 {
        let (lo, hi) = chunks[0];
        let sink = worker_sink(flags, &shared);
        return generator::sieve_interval(lo, hi, sieve_len, pre, Some(Arc::clone(status)), sink)
            .map(PrimeSink::into_counts);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(chunks.len())
        .build()
        .map_err(|_| SieveError::alloc("worker thread pool", 0))?;

    pool.install(|| {
        chunks
            .par_iter()
            .map(|&(lo, hi)| {
                let sink = worker_sink(flags, &shared);
                generator::sieve_interval(lo, hi, sieve_len, pre, Some(Arc::clone(status)), sink)
                    .map(PrimeSink::into_counts)
            })
            .try_reduce(
                || [0u64; 7],
                |a, b| {
                    let mut sum = [0u64; 7];
                    for i in 0..7 {
                        sum[i] = a[i] + b[i];
                    }
                    Ok(sum)
                },
            )
    })
}
