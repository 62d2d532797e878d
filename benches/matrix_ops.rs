use briny_matrix::{Backend, Engine, EngineConfig, Matrix};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn engines() -> Vec<(&'static str, Engine)> {
    let serial = EngineConfig::default().with_parallel_threshold(usize::MAX);
    let pool = EngineConfig::default().with_parallel_threshold(1);
    let rayon = pool.with_backend(Backend::Rayon);
    vec![
        ("serial", Engine::new(serial).unwrap()),
        ("pool", Engine::new(pool).unwrap()),
        ("rayon", Engine::new(rayon).unwrap()),
    ]
}

fn filled(rows: usize, cols: usize, step: usize) -> Matrix {
    Matrix::from_fn(rows, cols, |r, c| ((r * cols + c) * step % 100) as f64)
}

fn bench_dot_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_product");
    let engines = engines();

    for n in [32, 128, 256] {
        let a = filled(n, n, 1);
        let b = filled(n, n, 2);
        let mut out = Matrix::zeros(n, n);

        for (name, engine) in &engines {
            group.bench_with_input(BenchmarkId::new(*name, n), &(&a, &b), |bench, (a, b)| {
                bench.iter(|| engine.dot_product(black_box(a), black_box(b), &mut out).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    let engines = engines();

    // 650x650 is the first square shape at the default threshold
    for n in [64, 650, 1024] {
        let a = filled(n, n, 1);
        let b = filled(n, n, 3);
        let mut out = Matrix::zeros(n, n);

        for (name, engine) in &engines {
            group.bench_with_input(BenchmarkId::new(*name, n), &(&a, &b), |bench, (a, b)| {
                bench.iter(|| engine.add(black_box(a), black_box(b), &mut out).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose");
    let engines = engines();

    for (rows, cols) in [(128, 512), (1024, 1024)] {
        let a = filled(rows, cols, 1);
        let id = format!("{rows}x{cols}");

        for (name, engine) in &engines {
            group.bench_with_input(BenchmarkId::new(*name, &id), &a, |bench, a| {
                bench.iter(|| black_box(engine.transpose(black_box(a)).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_dot_product, bench_elementwise, bench_transpose);
criterion_main!(benches);
