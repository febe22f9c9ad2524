//! Threshold search benchmark: reference grid vs sorted scan.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gauss_anomaly::config::{SearchStrategy, ThresholdConfig};
use gauss_anomaly::ThresholdSelector;
use ndarray::Array1;

fn bench_selectors(c: &mut Criterion) {
    let n = 5_000;
    let p = Array1::from_shape_fn(n, |i| ((i as f64) * 0.013).sin().abs() * 0.4);
    let y = Array1::from_shape_fn(n, |i| u8::from(i % 50 == 0));

    let mut g = c.benchmark_group("threshold_5k");
    for strategy in [SearchStrategy::Grid, SearchStrategy::Sorted] {
        let selector = ThresholdSelector::new(ThresholdConfig {
            strategy,
            ..Default::default()
        });
        g.bench_function(format!("{:?}", strategy).as_str(), |b| {
            b.iter(|| selector.select(black_box(&p), black_box(&y)).unwrap())
        });
    }
    g.finish();
}

criterion_group!(benches, bench_selectors);
criterion_main!(benches);
