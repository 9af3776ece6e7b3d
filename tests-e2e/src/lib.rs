//! Shared helpers for the bridge's end-to-end test suite: fixture builders
//! and in-memory test doubles for the Hive/LND/exchange/quote/LNURL traits
//! every pipeline depends on but never implements. Mirrors the reference
//! `tests-e2e` crate's role of a flat module list the `tests/` scenarios
//! import from, adapted from its bitcoind/coordinator-process harness
//! (no external process exists here to spawn) to this domain's
//! trait-object test doubles.

pub mod fixtures;
pub mod mocks;

/// Skips a `#[tokio::test]` that needs a live Mongo instance, the same
/// "needs infra, skip gracefully outside it" posture the reference suite
/// takes toward bitcoind/lnd regtest. Returns `Some(uri)` when `MONGO_URI`
/// is set.
pub fn mongo_uri() -> Option<String> {
    std::env::var("MONGO_URI").ok()
}

/// Same as [`mongo_uri`] for the Redis-backed lock/cache/bad-actor tests.
pub fn redis_uri() -> Option<String> {
    std::env::var("REDIS_URI").ok()
}
