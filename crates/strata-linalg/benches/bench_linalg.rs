use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faer::{mat, Mat};
use rand::{rngs::StdRng, SeedableRng};
use strata_linalg::{DecompChol, DecompLU, DecompQR, DecompSVD};
use strata_tensor::{expr::transpose, product::matmul, CpuAllocator, Tensor};

fn bench_svd3(c: &mut Criterion) {
    let mut group = c.benchmark_group("svd3");
    let a1 = Tensor::matrix([[1.0f64, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]]).unwrap();
    let a2 = mat![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]];

    group.bench_function(BenchmarkId::new("svd3", ""), |b| {
        b.iter(|| black_box(DecompSVD::new(&a1).unwrap()))
    });

    group.bench_function(BenchmarkId::new("svd3_faer", ""), |b| {
        b.iter(|| black_box(a2.svd()))
    });
}

fn bench_decompositions(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompositions");
    let mut rng = StdRng::seed_from_u64(0);

    for n in [4, 16, 64] {
        let a = Tensor::<f64, 2>::from_random([n, n], &mut rng, CpuAllocator).unwrap();
        let gram = matmul(&a, &transpose(&a)).unwrap();
        let spd = Tensor::from_shape_fn([n, n], CpuAllocator, |[i, j]| {
            gram[[i, j]] + if i == j { n as f64 } else { 0.0 }
        })
        .unwrap();
        let a_faer = Mat::<f64>::from_fn(n, n, |i, j| a[[i, j]]);
        let id = format!("{n}x{n}");

        group.bench_with_input(BenchmarkId::new("svd", &id), &a, |b, a| {
            b.iter(|| black_box(DecompSVD::new(a).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("svd_faer", &id), &a_faer, |b, a| {
            b.iter(|| black_box(a.svd()))
        });

        group.bench_with_input(BenchmarkId::new("lu", &id), &a, |b, a| {
            b.iter(|| black_box(DecompLU::new(a).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("qr", &id), &a, |b, a| {
            b.iter(|| black_box(DecompQR::new(a).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("chol", &id), &spd, |b, a| {
            b.iter(|| black_box(DecompChol::new(a).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_svd3, bench_decompositions);
criterion_main!(benches);
