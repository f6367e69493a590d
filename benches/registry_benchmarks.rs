//! Benchmarks for VEIL Registry Operations
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use veil::prelude::*;
use veil_fhe::{decode_cleartexts, encode_cleartexts, KmsSigner};
use veil_registry::content_hash;

// =============================================================================
// CONTENT HASHING
// =============================================================================

fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");
    let registry = Address::from_label("registry");

    for size in [1usize, 16, 256, 4096] {
        let handles: Vec<_> = (0..size as u64)
            .map(|i| CiphertextHandle::derive(&i.to_le_bytes(), FheType::Uint32))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &handles, |b, handles| {
            b.iter(|| content_hash(&registry, handles))
        });
    }

    group.finish();
}

// =============================================================================
// SUBMISSION THROUGHPUT
// =============================================================================

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");
    group.throughput(Throughput::Elements(1));

    group.bench_function("provider_submit", |b| {
        let owner = Address::from_label("owner");
        let provider = Address::from_label("provider");
        let oracle = LocalCoprocessor::with_defaults().unwrap();
        let clock = ManualClock::new(1_000);
        let config = RegistryConfig::new(Address::from_label("registry"), owner).with_cooldown(1);
        let mut registry = AttestationRegistry::new(config, oracle.clone(), clock.clone()).unwrap();
        registry.add_provider(&owner, provider).unwrap();
        let handle = oracle.encrypt(7, FheType::Uint32).unwrap();

        b.iter(|| {
            clock.advance(1);
            registry.submit(&provider, handle).unwrap();
            registry.drain_events();
        })
    });

    group.finish();
}

// =============================================================================
// DECRYPTION CALLBACK
// =============================================================================

fn bench_callback_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("callback");

    for size in [1usize, 32, 256] {
        let values: Vec<_> = (0..size as u64)
            .map(|v| ClearValue::new(FheType::Uint64, v).unwrap())
            .collect();
        let types: Vec<_> = values.iter().map(|v| v.fhe_type).collect();
        let cleartexts = encode_cleartexts(&values);

        group.bench_with_input(BenchmarkId::new("decode", size), &cleartexts, |b, bytes| {
            b.iter(|| decode_cleartexts(bytes, &types).unwrap())
        });
    }

    let signers: Vec<_> = (0..4).map(|_| KmsSigner::generate()).collect();
    let committee =
        veil_fhe::KmsCommittee::new(signers.iter().map(|s| s.public_key()), 3).unwrap();
    let cleartexts = vec![0u8; 32 * 16];
    let proof = DecryptionProof::new(
        signers[..3]
            .iter()
            .map(|s| s.sign(RequestId(1), &cleartexts))
            .collect(),
    );

    group.bench_function("verify_3_of_4", |b| {
        b.iter(|| committee.verify(RequestId(1), &cleartexts, &proof).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_content_hash,
    bench_submit,
    bench_callback_verification,
);

criterion_main!(benches);
