//! Generation benchmarks using criterion.
//!
//! Run with: cargo bench --bench gen_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use grist::options::{Options, StandardKind};
use grist::program::ProgramGenerator;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for standard in [StandardKind::Cxx, StandardKind::Ispc, StandardKind::Sycl] {
        let opts = Options {
            standard,
            ..Options::default()
        };
        let generator = ProgramGenerator::new(opts);
        group.bench_with_input(
            BenchmarkId::from_parameter(standard),
            &generator,
            |b, generator| {
                let mut seed = 0u64;
                b.iter(|| {
                    seed = seed.wrapping_add(1);
                    black_box(generator.generate(seed).unwrap())
                });
            },
        );
    }
    group.finish();
}

fn bench_seed_spread(c: &mut Criterion) {
    let generator = ProgramGenerator::new(Options::default());
    c.bench_function("generate_100_seeds", |b| {
        b.iter(|| {
            for seed in 0..100u64 {
                black_box(generator.generate(seed).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_generate, bench_seed_spread);
criterion_main!(benches);
