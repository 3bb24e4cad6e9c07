use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primescan::flags::{COUNT_FLAGS, COUNT_TWINS};
use primescan::PrimeSieve;

fn bench_count_primes_10m(c: &mut Criterion) {
    c.bench_function("count_primes(0, 10^7)", |b| {
        let mut ps = PrimeSieve::new();
        b.iter(|| ps.count_primes(black_box(0), black_box(10_000_000)).unwrap());
    });
}

fn bench_count_primes_100m(c: &mut Criterion) {
    let mut group = c.benchmark_group("large");
    group.sample_size(10);
    group.bench_function("count_primes(0, 10^8)", |b| {
        let mut ps = PrimeSieve::new();
        b.iter(|| ps.count_primes(black_box(0), black_box(100_000_000)).unwrap());
    });
    group.finish();
}

fn bench_count_twins_10m(c: &mut Criterion) {
    c.bench_function("count_twins(0, 10^7)", |b| {
        let mut ps = PrimeSieve::new();
        ps.set_flags(COUNT_TWINS).unwrap();
        b.iter(|| {
            ps.sieve_range(black_box(0), black_box(10_000_000)).unwrap();
            ps.twin_count()
        });
    });
}

fn bench_all_counters_10m(c: &mut Criterion) {
    c.bench_function("count_all_tuplets(0, 10^7)", |b| {
        let mut ps = PrimeSieve::new();
        ps.set_flags(COUNT_FLAGS).unwrap();
        b.iter(|| {
            ps.sieve_range(black_box(0), black_box(10_000_000)).unwrap();
            ps.prime_count()
        });
    });
}

fn bench_offset_window(c: &mut Criterion) {
    // sieving primes up to 10^6; dominated by the bucket engine
    c.bench_function("count_primes(10^12, 10^12 + 10^7)", |b| {
        let mut ps = PrimeSieve::new();
        b.iter(|| {
            ps.count_primes(black_box(1_000_000_000_000), black_box(1_000_010_000_000))
                .unwrap()
        });
    });
}

fn bench_stream_callback(c: &mut Criterion) {
    c.bench_function("for_each_prime64(0, 10^7)", |b| {
        let mut ps = PrimeSieve::new();
        b.iter(|| {
            let mut sum = 0u64;
            ps.for_each_prime64(black_box(0), black_box(10_000_000), |p| sum += p).unwrap();
            sum
        });
    });
}

criterion_group!(
    benches,
    bench_count_primes_10m,
    bench_count_primes_100m,
    bench_count_twins_10m,
    bench_all_counters_10m,
    bench_offset_window,
    bench_stream_callback,
);
criterion_main!(benches);
