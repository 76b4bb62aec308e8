use criterion::{Criterion, black_box, criterion_group, criterion_main};
use relief_terrain::*;

fn dem_provider() -> DemHeightProvider {
    let side = 512;
    let heights: Vec<f32> = (0..side * side)
        .map(|i| ((i % side) as f32 * 0.37).sin() * 40.0 + (i / side) as f32 * 0.1)
        .collect();
    DemHeightProvider::new(heights, side, side, 30.0).unwrap()
}

fn bench_noise_single(c: &mut Criterion) {
    let noise = NoiseGenerator::new(42);
    c.bench_function("noise_single", |bencher| {
        bencher.iter(|| black_box(noise.noise(black_box(12.34), black_box(-56.78))))
    });
}

fn bench_fractal_noise(c: &mut Criterion) {
    let noise = NoiseGenerator::new(42);
    c.bench_function("fractal_noise_6_octaves", |bencher| {
        bencher.iter(|| {
            black_box(noise.fractal_noise(black_box(12.34), black_box(-56.78), 6, 0.5, 0.01))
        })
    });
}

fn bench_dem_height_at(c: &mut Criterion) {
    let dem = dem_provider();
    c.bench_function("dem_height_at", |bencher| {
        bencher.iter(|| black_box(dem.height_at(black_box(1234.5), black_box(-987.6))))
    });
}

fn bench_dem_chunk_grid(c: &mut Criterion) {
    let dem = dem_provider();
    c.bench_function("dem_chunk_grid_64", |bencher| {
        bencher.iter(|| black_box(dem.height_data(ChunkCoord::new(1, -2), 256.0, 64)))
    });
}

fn bench_procedural_chunk_grid(c: &mut Criterion) {
    let provider = ProceduralHeightProvider::new(ProceduralParams::default()).unwrap();
    c.bench_function("procedural_chunk_grid_64", |bencher| {
        bencher.iter(|| black_box(provider.height_data(ChunkCoord::new(1, -2), 256.0, 64)))
    });
}

fn bench_grid_lookup(c: &mut Criterion) {
    let grid = dem_provider().height_data(ChunkCoord::new(0, 0), 256.0, 64);
    c.bench_function("chunk_grid_height_at_local", |bencher| {
        bencher.iter(|| black_box(grid.height_at_local(black_box(100.3), black_box(200.7))))
    });
}

criterion_group!(
    benches,
    bench_noise_single,
    bench_fractal_noise,
    bench_dem_height_at,
    bench_dem_chunk_grid,
    bench_procedural_chunk_grid,
    bench_grid_lookup,
);
criterion_main!(benches);
