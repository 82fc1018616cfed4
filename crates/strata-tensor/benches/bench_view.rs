use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_tensor::{CpuAllocator, Tensor, TensorLike};

fn sample_tensor() -> Tensor<u8, 3, CpuAllocator> {
    Tensor::from_shape_val([1080, 1080, 3], 0_u8, CpuAllocator).unwrap()
}

fn bench_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("View");

    group.bench_function("flipped_to_tensor", |b| {
        b.iter_batched(
            sample_tensor,
            |t| black_box(t.view().flipped(1).unwrap().to_tensor().unwrap()),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("fixed_channel_sum", |b| {
        let t = sample_tensor();
        b.iter(|| {
            let channel = black_box(&t).fix::<2>(2, 1).unwrap();
            black_box(channel.fold(|a, b| a.wrapping_add(b)))
        })
    });
}

criterion_group!(benches, bench_view);
criterion_main!(benches);
