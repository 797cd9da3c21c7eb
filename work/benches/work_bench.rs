use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cairn_work::{compute, verify, WorkGenerator};

const BUFFER: usize = 64 * 1024;

fn bench_pow_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pow_generation");
    group.sample_size(10);
    let generator = WorkGenerator::new();
    let data = [0x42u8; 200];

    // Low difficulty levels that complete quickly enough for benchmarking.
    for difficulty in [0u32, 2, 4, 6] {
        group.bench_with_input(
            BenchmarkId::new("sequential", difficulty),
            &difficulty,
            |b, &diff| {
                b.iter(|| black_box(compute(black_box(&data), BUFFER, diff).unwrap()));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", difficulty),
            &difficulty,
            |b, &diff| {
                b.iter(|| {
                    black_box(
                        generator
                            .generate(black_box(&data), BUFFER, diff)
                            .unwrap(),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_pow_verification(c: &mut Criterion) {
    let data = [0x42u8; 200];
    let difficulty = 6;
    let nonce = compute(&data, BUFFER, difficulty).unwrap();

    c.bench_function("pow_verify_valid", |b| {
        b.iter(|| {
            black_box(verify(
                black_box(&data),
                BUFFER,
                black_box(difficulty),
                black_box(nonce),
            ))
        });
    });

    c.bench_function("pow_verify_buffer_8mib", |b| {
        b.iter(|| black_box(verify(black_box(&data), 8 * 1024 * 1024, 8, black_box(nonce))));
    });
}

criterion_group!(benches, bench_pow_generation, bench_pow_verification);
criterion_main!(benches);
