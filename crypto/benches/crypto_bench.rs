use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn ed25519_sign_bench(c: &mut Criterion) {
    let kp = cairn_crypto::keypair_from_seed(&[1u8; 32]);
    let msg = [42u8; 128];

    c.bench_function("ed25519_sign_128B", |b| {
        b.iter(|| cairn_crypto::sign_message(black_box(&msg), &kp.private))
    });
}

fn ed25519_verify_bench(c: &mut Criterion) {
    let kp = cairn_crypto::keypair_from_seed(&[1u8; 32]);
    let msg = [42u8; 128];
    let sig = cairn_crypto::sign_message(&msg, &kp.private);

    c.bench_function("ed25519_verify_128B", |b| {
        b.iter(|| cairn_crypto::verify_signature(black_box(&msg), &sig, &kp.public))
    });
}

fn sha256_bench(c: &mut Criterion) {
    let data = vec![0xCDu8; 1024];

    c.bench_function("sha256_1KB", |b| {
        b.iter(|| cairn_crypto::sha256(black_box(&data)))
    });
}

fn account_address_bench(c: &mut Criterion) {
    let kp = cairn_crypto::keypair_from_seed(&[2u8; 32]);

    c.bench_function("account_address", |b| {
        b.iter(|| cairn_crypto::account_address(black_box(&kp.public)))
    });
}

criterion_group!(
    benches,
    ed25519_sign_bench,
    ed25519_verify_bench,
    sha256_bench,
    account_address_bench,
);
criterion_main!(benches);
