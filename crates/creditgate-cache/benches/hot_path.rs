//! Benchmarks for the request hot path.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use creditgate_cache::{CreditCache, CreditGate, RetryExecutor, SessionAuthenticator};
use creditgate_ledger::MemoryLedger;
use criterion::{Criterion, criterion_group, criterion_main};

fn warm_cache(rt: &tokio::runtime::Runtime) -> Arc<CreditCache<MemoryLedger>> {
    let ledger = Arc::new(MemoryLedger::new(Duration::ZERO).with_balances([("user1", u64::MAX)]));
    let cache = Arc::new(CreditCache::new(ledger, RetryExecutor::default()));
    rt.block_on(async {
        cache.get_credits("user1").await.ok();
    });
    cache
}

fn bench_cache(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = warm_cache(&rt);

    let mut group = c.benchmark_group("credit_cache");

    group.bench_function("get_credits_hit", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.get_credits(black_box("user1")).await) })
    });

    group.bench_function("try_deduct_hit", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.try_deduct(black_box("user1")).await) })
    });

    group.finish();
    rt.block_on(cache.drain());
}

fn bench_sessions(c: &mut Criterion) {
    let sessions = SessionAuthenticator::new(Duration::from_secs(1800));
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("session_authenticator");

    group.bench_function("authenticate_existing", |b| {
        let _guard = rt.enter();
        sessions.authenticate("user1").ok();
        b.iter(|| sessions.authenticate(black_box("user1")))
    });

    let ids: Vec<String> = (0..1000).map(|i| format!("user{i}")).collect();
    group.bench_function("authenticate_1000_users", |b| {
        let _guard = rt.enter();
        b.iter(|| {
            for id in &ids {
                black_box(sessions.authenticate(id).is_ok());
            }
        })
    });

    group.finish();
}

fn bench_gate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = warm_cache(&rt);
    let sessions = Arc::new(SessionAuthenticator::new(Duration::from_secs(1800)));
    let gate = CreditGate::new(sessions, cache.clone());

    c.bench_function("gate_admit", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(gate.admit(black_box("user1")).await) })
    });

    rt.block_on(cache.drain());
}

criterion_group!(benches, bench_cache, bench_sessions, bench_gate);
criterion_main!(benches);
