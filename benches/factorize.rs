use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusty_factorize::prelude::*;

fn bench_factorize_matrix(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let x = f64::random_gaussian((2048, 256), &mut rng);
    let w = f64::random_gaussian((256, 128), &mut rng);
    let y = x.dot(&w);
    let op = Operator::dense(w);
    let options = FactorizeOptions::default().with_rank(32usize);

    c.bench_function("factorize_matrix 2048x256 -> 128, rank 32", |b| {
        b.iter(|| factorize_matrix(x.view(), y.view(), &op, None, &options).unwrap())
    });
}

fn bench_factorize_conv2d(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let inputs = f32::random_activations((8, 16, 16, 16), &mut rng);
    let weights = f32::random_activations((32, 16, 3, 3), &mut rng);
    let options = FactorizeOptions::default().with_rank(RankSpec::Fraction(0.25));
    let params = Conv2dParams::default().with_padding((1, 1), PaddingMode::Zeros);

    c.bench_function("factorize_conv2d 16 -> 32 channels 3x3, rank 8", |b| {
        b.iter(|| {
            factorize_conv2d(inputs.view(), weights.view(), None, None, None, &options, &params)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_factorize_matrix, bench_factorize_conv2d);
criterion_main!(benches);
