//! Benchmarks for vaultlink-crypto

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vaultlink_crypto::{
    keys::ContentKey,
    password::{hash_password_blocking, verify_password_blocking},
    symmetric::{decrypt, encrypt},
    EnvelopeDecryptor, EnvelopeEncryptor, KeyPair,
};

fn bench_symmetric(c: &mut Criterion) {
    let mut group = c.benchmark_group("symmetric");
    let key = ContentKey::generate();

    for size in [1024, 64 * 1024, 1024 * 1024].iter() {
        let data = vec![0u8; *size];
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("aes-256-gcm-encrypt", size), &data, |b, data| {
            b.iter(|| encrypt(&key, data).unwrap())
        });

        let (nonce, ciphertext) = encrypt(&key, &data).unwrap();
        group.bench_with_input(
            BenchmarkId::new("aes-256-gcm-decrypt", size),
            &(&nonce, &ciphertext),
            |b, (nonce, ciphertext)| b.iter(|| decrypt(&key, nonce, ciphertext).unwrap()),
        );
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    let keypair = KeyPair::generate().unwrap();
    let encryptor = EnvelopeEncryptor::new(keypair.public_key());
    let decryptor = EnvelopeDecryptor::new(&keypair);

    for size in [1024, 1024 * 1024, 10 * 1024 * 1024].iter() {
        let data = vec![0u8; *size];
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &data, |b, data| {
            b.iter(|| encryptor.encrypt_blocking(data).unwrap())
        });

        let sealed = encryptor.encrypt_blocking(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, sealed| {
            b.iter(|| decryptor.decrypt_blocking(sealed).unwrap())
        });
    }

    group.finish();
}

fn bench_password(c: &mut Criterion) {
    let mut group = c.benchmark_group("password");
    group.sample_size(10);

    group.bench_function("argon2id-hash", |b| {
        b.iter(|| hash_password_blocking("correct horse battery staple").unwrap())
    });

    let hash = hash_password_blocking("correct horse battery staple").unwrap();
    group.bench_function("argon2id-verify", |b| {
        b.iter(|| verify_password_blocking("correct horse battery staple", &hash).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_symmetric, bench_envelope, bench_password);
criterion_main!(benches);
