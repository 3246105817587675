use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use ndarray::{ArrayD, IxDyn};
use voxblocks::{
    assemble,
    dimensions::Dimensions,
    geometry::{compute_boundaries, splits_for_block_size},
    AssembleOptions, BlockingStrategy, Images,
};

fn make_images(nimages: u64, size: usize) -> Images<u64, u16> {
    let shape = [size, size, size];
    let num_elements = size * size * size;
    Images::new(
        (0..nimages)
            .map(|key| {
                let data = (0..num_elements).map(|i| (i % 65536) as u16).collect();
                (key, ArrayD::from_shape_vec(IxDyn(&shape), data).unwrap())
            })
            .collect(),
    )
}

fn blocking_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_geometry");
    group.bench_function("compute_boundaries", |b| {
        b.iter(|| compute_boundaries(100_000, 999).unwrap());
    });
    let dims = Dimensions::new(vec![4096, 4096, 512]).unwrap();
    group.bench_function("splits_for_block_size", |b| {
        b.iter(|| splits_for_block_size(&dims, 200, 1024 * 1024).unwrap());
    });
}

fn blocking_assemble(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("blocking_assemble");
    group.plot_config(plot_config);

    for size in [16, 32, 64].iter() {
        let nimages = 8;
        let size3 = (size * size * size) as u64;
        group.throughput(Throughput::Bytes(size3 * 2 * nimages));
        let mut images = make_images(nimages, *size);
        group.bench_function(BenchmarkId::new("simple", size3), |b| {
            b.iter(|| {
                let mut strategy = BlockingStrategy::from_splits(vec![4, 4, 4], 0usize);
                assemble(&mut images, &mut strategy, &AssembleOptions::default()).unwrap()
            });
        });
        group.bench_function(BenchmarkId::new("padded", size3), |b| {
            b.iter(|| {
                let mut strategy = BlockingStrategy::from_splits(vec![4, 4, 4], 2usize);
                assemble(&mut images, &mut strategy, &AssembleOptions::default()).unwrap()
            });
        });
        let blocks = images.to_blocks([4, 4, 4], 0usize).unwrap();
        group.bench_function(BenchmarkId::new("to_images", size3), |b| {
            b.iter(|| blocks.to_images().unwrap());
        });
    }
}

criterion_group!(benches, blocking_geometry, blocking_assemble);
criterion_main!(benches);
