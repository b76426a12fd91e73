//! Criterion benches for the dense step: annealed Sinkhorn on Gaussian clouds.
//!
//! Every softmin costs n·m exponentials, so sizes stay small; results live
//! under `target/criterion`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use otsparse::api::{sinkhorn, CloudCfg, CloudPair, SinkhornCfg};

fn bench_sinkhorn(c: &mut Criterion) {
    let mut group = c.benchmark_group("sinkhorn");
    group.sample_size(10);
    let cfg = SinkhornCfg::default();
    for n in [100usize, 300, 1000] {
        let pair = CloudPair::generate(&CloudCfg {
            n,
            ..CloudCfg::default()
        });
        group.bench_with_input(BenchmarkId::new("anneal", n), &pair, |b, p| {
            b.iter(|| {
                let _ = sinkhorn(&p.source, &p.target, &p.a, &p.b, &cfg);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sinkhorn);
criterion_main!(benches);
