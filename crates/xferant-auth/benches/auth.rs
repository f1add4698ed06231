//! Benchmarks for xferant credential verification.

use std::hint::black_box;

use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use xferant_auth::{Verifier, secret_matches, sha256_hex};
use xferant_core::Scope;
use xferant_store::{Store, StoreConfig};

fn bench_sha256_hex(c: &mut Criterion) {
    let secrets = [
        "short",
        "medium_secret_here",
        "this_is_a_much_longer_secret_of_the_length_issued_for_api_keys_in_practice",
    ];

    let mut group = c.benchmark_group("sha256_hex");
    for secret in secrets {
        group.bench_with_input(
            BenchmarkId::from_parameter(secret.len()),
            secret,
            |b, s| b.iter(|| sha256_hex(black_box(s))),
        );
    }
    group.finish();
}

fn bench_secret_matches(c: &mut Criterion) {
    let secret = "test_secret_123";
    let hash = sha256_hex(secret);

    c.bench_function("secret_matches_correct", |b| {
        b.iter(|| secret_matches(black_box(secret), black_box(&hash)))
    });

    c.bench_function("secret_matches_wrong", |b| {
        b.iter(|| secret_matches(black_box("wrong_secret"), black_box(&hash)))
    });
}

fn bench_verify_api_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (verifier, issued) = rt.block_on(async {
        let config = StoreConfig::new("sqlite::memory:").max_open(1).max_idle(1);
        let store = Store::initialize(&config).await.unwrap();
        let verifier = Verifier::new(store);
        let issued = verifier
            .issue_api_key("bench", Scope::Read, TimeDelta::days(1))
            .await
            .unwrap();
        (verifier, issued)
    });

    let mut group = c.benchmark_group("verify_api_key");

    group.bench_function("hit", |b| {
        b.iter(|| rt.block_on(verifier.verify_api_key(black_box(&issued.key), &issued.secret)))
    });

    // Unknown keys still pay for a hash comparison.
    group.bench_function("miss", |b| {
        b.iter(|| rt.block_on(verifier.verify_api_key(black_box("xf_missing"), &issued.secret)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sha256_hex,
    bench_secret_matches,
    bench_verify_api_key,
);

criterion_main!(benches);
