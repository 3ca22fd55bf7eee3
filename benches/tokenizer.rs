use criterion::{criterion_group, criterion_main, Criterion};
use strand_html5::testing::fixtures;

fn criterion_benchmark(c: &mut Criterion) {
    // Criterion can report inconsistent results from run to run in some
    // cases; a higher sample count keeps that down.
    let mut group = c.benchmark_group("tokenization");
    group.significance_level(0.1).sample_size(500);

    // Load the files outside of the closure to keep file io out of the
    // measurement
    let fixtures = fixtures::fixtures().collect::<Vec<_>>();

    group.bench_function("fixtures", |b| {
        b.iter(|| {
            for root in &fixtures {
                for test in &root.tests {
                    test.tokenize();
                }
            }
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
