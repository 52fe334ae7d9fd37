//! Aggregation and frame decoding throughput.
//!
//! Run with: `cargo bench --package candela-bench`

use candela_bench::{synthetic_trades, trade_frame};
use candela_lib::frame::parse_frame;
use candela_lib::{CandleAggregator, WindowDuration, aggregate_trades};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const START_MS: i64 = 1_704_067_200_000;

fn aggregate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for count in [10_000usize, 100_000] {
        let trades = synthetic_trades("BTC/USD", count, START_MS, 50);
        group.throughput(Throughput::Elements(count as u64));

        for secs in [1u64, 60] {
            let Ok(window) = WindowDuration::from_secs(secs) else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{secs}s"), count),
                &trades,
                |b, trades| b.iter(|| aggregate_trades(black_box(trades), "BTC/USD", window)),
            );
        }

        group.bench_with_input(BenchmarkId::new("streaming-60s", count), &trades, |b, trades| {
            b.iter(|| {
                let mut aggregator = CandleAggregator::new("BTC/USD", WindowDuration::ONE_MINUTE);
                let mut emitted = 0usize;
                for trade in trades {
                    emitted += usize::from(aggregator.process(black_box(trade)).is_some());
                }
                emitted + usize::from(aggregator.finish().is_some())
            });
        });
    }

    group.finish();
}

fn frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    for count in [1usize, 100] {
        let frame = trade_frame("BTC/USD", count, START_MS);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("parse", count), &frame, |b, frame| {
            b.iter(|| parse_frame(black_box(frame)));
        });
    }

    group.finish();
}

criterion_group!(benches, aggregate_benchmark, frame_benchmark);
criterion_main!(benches);
