use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rollnet_core::{LearningParams, Network};

fn bench_activate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut net = Network::new(&[3, 10, 10, 2], LearningParams::default(), &mut rng).unwrap();
    let input = [0.1, -0.4, 0.7];

    c.bench_function("activate 3-10-10-2", |b| {
        b.iter(|| {
            net.activate(black_box(&input)).unwrap();
            black_box(net.output())
        });
    });
}

fn bench_learn(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut net = Network::new(&[3, 10, 10, 2], LearningParams::default(), &mut rng).unwrap();
    let input = [0.1, -0.4, 0.7];

    c.bench_function("activate+learn 3-10-10-2", |b| {
        b.iter(|| {
            net.activate(black_box(&input)).unwrap();
            net.learn(black_box(&[0.01, 0.01]), Some(0.001)).unwrap();
        });
    });
}

criterion_group!(benches, bench_activate, bench_learn);
criterion_main!(benches);
