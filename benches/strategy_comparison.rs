//! Benchmarks comparing full simulation runs under each strategy

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loadsim::prelude::*;

fn config(strategy: BalancingStrategy, processors: usize, arrival: ArrivalPolicy) -> Config {
    Config::builder()
        .strategy(strategy)
        .processor_count(processors)
        .arrival(arrival)
        .tick_budget(1_000)
        .max_drain_ticks(1_000)
        .seed(42)
        .build()
        .unwrap()
}

fn bench_uniform_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("uniform_workload");

    for strategy in [BalancingStrategy::Centralized, BalancingStrategy::WorkStealing] {
        for processors in [2, 8, 32] {
            let arrival = ArrivalPolicy::Uniform {
                min_tasks: 0,
                max_tasks: processors as u32 / 2 + 1,
                min_length: 1,
                max_length: 5,
            };
            let config = config(strategy, processors, arrival);

            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), processors),
                &config,
                |b, config| {
                    b.iter(|| black_box(loadsim::simulate(config.clone()).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_bursty_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("bursty_workload");

    for strategy in [BalancingStrategy::Centralized, BalancingStrategy::WorkStealing] {
        let arrival = ArrivalPolicy::Bursty {
            arrival_probability: 0.6,
            burst_probability: 0.05,
            burst_size: 40,
            min_length: 1,
            max_length: 8,
        };
        let config = config(strategy, 8, arrival);

        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| black_box(loadsim::simulate(config.clone()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uniform_workload, bench_bursty_workload);
criterion_main!(benches);
