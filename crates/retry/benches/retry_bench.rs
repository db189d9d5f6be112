//! Retry engine benchmarks
//!
//! Measures the per-call overhead of the engine on the happy path and across
//! retries, plus the cost of stop and wait strategy evaluation.
//!
//! Run with: `cargo bench --bench retry_bench -p pulsearc-retry`

use std::io;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulsearc_retry::{
    MockClock, RetryConfig, Retrying, StopStrategy, WaitParameters, WaitStrategy,
};

// ============================================================================
// Engine Benchmarks
// ============================================================================

fn bench_call_first_attempt(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_first_attempt");
    group.throughput(Throughput::Elements(1));

    let retrying: Retrying<u64, io::Error> =
        Retrying::new(RetryConfig::builder().stop_after_attempt(5).build().unwrap_or_default());

    let mut counter = 0u64;
    group.bench_function("stop_after_attempt", |b| {
        b.iter(|| {
            counter = counter.wrapping_add(1);
            let _ = black_box(retrying.call(|| Ok(black_box(counter))));
        });
    });

    group.finish();
}

fn bench_call_with_retries(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_with_retries");

    for failures in [1_u32, 4, 16] {
        group.throughput(Throughput::Elements(u64::from(failures) + 1));
        group.bench_with_input(BenchmarkId::new("failures", failures), &failures, |b, &failures| {
            let clock = MockClock::new();
            let retrying: Retrying<u32, io::Error> = Retrying::new(
                RetryConfig::builder()
                    .clock(clock.clone())
                    .sleeper(clock)
                    .wait_exponential(Duration::from_millis(1), Duration::from_millis(100))
                    .retry_on_error_kinds([io::ErrorKind::TimedOut])
                    .build()
                    .unwrap_or_default(),
            );

            b.iter(|| {
                let mut calls = 0;
                let _ = black_box(retrying.call(|| {
                    calls += 1;
                    if calls <= failures {
                        Err(io::Error::from(io::ErrorKind::TimedOut))
                    } else {
                        Ok(calls)
                    }
                }));
            });
        });
    }

    group.finish();
}

// ============================================================================
// Strategy Benchmarks
// ============================================================================

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");

    let stop = StopStrategy::any(vec![
        StopStrategy::AfterAttempt(10),
        StopStrategy::AfterDelay(Duration::from_secs(30)),
    ]);
    group.bench_function("stop_any", |b| {
        let mut attempt = 0u32;
        b.iter(|| {
            attempt = attempt.wrapping_add(1) % 20;
            black_box(stop.should_stop(black_box(attempt), black_box(Duration::from_millis(250))))
        });
    });

    let exponential = WaitStrategy::Exponential {
        multiplier: Duration::from_millis(1),
        max: Duration::from_secs(60),
    };
    group.bench_function("wait_exponential", |b| {
        let mut attempt = 0u32;
        b.iter(|| {
            attempt = attempt.wrapping_add(1) % 80;
            black_box(exponential.delay(black_box(attempt), Duration::ZERO))
        });
    });

    let composed = WaitParameters {
        fixed: Some(Duration::from_millis(100)),
        random_max: Some(Duration::from_millis(500)),
        incrementing_start: Some(Duration::ZERO),
        incrementing_increment: Some(Duration::from_millis(50)),
        ..WaitParameters::default()
    }
    .compose()
    .map(|wait| wait.with_jitter(Duration::from_millis(25)))
    .unwrap_or_default();
    group.bench_function("wait_composed_jittered", |b| {
        let mut attempt = 0u32;
        b.iter(|| {
            attempt = attempt.wrapping_add(1) % 20;
            black_box(composed.delay(black_box(attempt), Duration::ZERO))
        });
    });

    group.finish();
}

criterion_group!(engine, bench_call_first_attempt, bench_call_with_retries);
criterion_group!(strategies, bench_strategies);

criterion_main!(engine, strategies);
