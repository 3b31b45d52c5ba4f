use criterion::{criterion_group, criterion_main, Criterion, black_box};

use bonsai::procgen::{build, build_geometry, generate_batch, TreeConfig};

fn bench_skeleton_bonsai(c: &mut Criterion) {
    let config = TreeConfig::bonsai();

    c.bench_function("skeleton_bonsai", |b| {
        b.iter(|| build(black_box(&config), black_box(42)));
    });
}

fn bench_skeleton_deep(c: &mut Criterion) {
    let config = TreeConfig {
        max_depth: 10,
        min_radius: 0.001,
        ..TreeConfig::bonsai()
    };

    c.bench_function("skeleton_depth_10", |b| {
        b.iter(|| build(black_box(&config), black_box(42)));
    });
}

fn bench_geometry_bonsai(c: &mut Criterion) {
    let config = TreeConfig::bonsai();
    let skeleton = build(&config, 42).expect("valid preset");

    c.bench_function("geometry_bonsai", |b| {
        b.iter(|| build_geometry(black_box(&skeleton), black_box(&config)));
    });
}

fn bench_batch_64(c: &mut Criterion) {
    let configs: Vec<_> = (0..64).map(|seed| TreeConfig::windswept().with_seed(seed)).collect();

    c.bench_function("generate_batch_64", |b| {
        b.iter(|| generate_batch(black_box(&configs)));
    });
}

criterion_group!(
    benches,
    bench_skeleton_bonsai,
    bench_skeleton_deep,
    bench_geometry_bonsai,
    bench_batch_64,
);
criterion_main!(benches);
