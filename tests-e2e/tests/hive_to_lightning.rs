//! SPEC_FULL.md §8 end-to-end scenarios 1 and 2: HIVE -> Lightning success
//! and failure (expired invoice). Both need a Mongo/Redis-backed
//! `LedgerRepository`/`PendingRepository` to post entries and queue the
//! change/refund reply to, so these tests only run with `MONGO_URI` set
//! and skip gracefully otherwise, matching the reference suite's posture
//! toward needing a live bitcoind/lnd regtest.

use ledger_commons::Currency;
use ledger_commons::TrackedOpKind;
use ledger_store::CustomerLock;
use ledger_store::Db;
use ledger_store::PendingKind;
use pipelines::decode_payment_destination;
use pipelines::hive_to_keepsats::ConversionFee;
use pipelines::pay_lightning_from_hive;
use pipelines::HiveToLightningOutcome;
use rust_decimal_macros::dec;
use tests_e2e::fixtures;
use tests_e2e::mocks::succeeding_payment;
use tests_e2e::mocks::FixedLnurlResolver;
use tests_e2e::mocks::ScriptedLndClient;

async fn connect() -> Option<Db> {
    let uri = tests_e2e::mongo_uri()?;
    Some(Db::connect(&uri, "tests_e2e_hive_to_lightning").await.expect("connect to MONGO_URI"))
}

async fn customer_lock(cust_id: &str) -> CustomerLock {
    let redis_uri = tests_e2e::redis_uri().expect("REDIS_URI must be set alongside MONGO_URI for lock-holding scenarios");
    let client = redis::Client::open(redis_uri).unwrap();
    let conn = redis::aio::ConnectionManager::new(client).await.unwrap();
    CustomerLock::acquire(conn, cust_id, std::time::Duration::from_secs(30), Some(std::time::Duration::from_secs(5)))
        .await
        .unwrap()
}

/// Scenario 1: `Transfer(from=alice, to=server, amount=10.000 HIVE,
/// memo="lnbc1000n...")` with the quote `{hive_usd=0.25, btc_usd=50000,
/// hive_hbd=0.25}`. The payable amount converts to 10,000,000 msat; LND
/// settles the route for 9,900,000 msat total (including a 50,000 msat
/// routing fee), leaving 100,000 msat (100 sats) of change queued to alice.
#[tokio::test]
async fn hive_to_lightning_success_queues_change_to_sender() {
    let Some(db) = connect().await else {
        eprintln!("skipping: MONGO_URI not set");
        return;
    };
    let quote = fixtures::scenario_quote();
    let lnd = ScriptedLndClient::new(vec![succeeding_payment(9_900_000, 50_000)]);
    let resolver = FixedLnurlResolver {
        bolt11: "lnbc1000n1p...".to_string(),
    };
    let destination = decode_payment_destination("lnbc1000n1p...").unwrap();

    let ledger = db.ledger();
    let pending = db.pending();
    let lock = customer_lock("alice").await;
    let mut header = fixtures::transfer_header("100-abc-0");

    let outcome = pay_lightning_from_hive(
        &ledger,
        &pending,
        lock,
        &lnd,
        &resolver,
        &mut header,
        "100-abc-0",
        header.short_id.as_str(),
        "lnd-1",
        "server",
        "alice",
        "alice",
        10_000,
        0,
        &destination,
        "lnbc1000n1p...",
        &quote,
        ConversionFee(dec!(0)),
        10_000,
        1,
    )
    .await
    .unwrap();

    match outcome {
        HiveToLightningOutcome::Succeeded { entries, change_sats } => {
            assert_eq!(entries.len(), 3, "withdraw, external send and a non-zero routing fee entry");
            assert!(change_sats > 0, "10,000 sats payable minus a 50 msat fee leaves dust-exceeding change");
        }
        HiveToLightningOutcome::Refunded { reason } => panic!("expected success, got a refund: {reason}"),
    }

    let queued = pending.active(PendingKind::Transaction).await.unwrap();
    assert!(
        queued.iter().any(|r| r.to_account.as_deref() == Some("alice") && r.amount.map(|a| a.currency()) == Some(Currency::Hive)),
        "a Hive change transfer to alice must be queued"
    );
}

/// Scenario 2: same input, but the LND payment fails (expired invoice).
/// Expected: no ledger entries, and a full refund (minus the return-fee
/// reservation) queued to alice.
#[tokio::test]
async fn hive_to_lightning_failure_queues_a_full_refund() {
    let Some(db) = connect().await else {
        eprintln!("skipping: MONGO_URI not set");
        return;
    };
    let quote = fixtures::scenario_quote();
    let lnd = ScriptedLndClient::always_fails("invoice expired");
    let resolver = FixedLnurlResolver {
        bolt11: "lnbc1000n1p...".to_string(),
    };
    let destination = decode_payment_destination("lnbc1000n1p...").unwrap();

    let ledger = db.ledger();
    let pending = db.pending();
    let lock = customer_lock("alice").await;
    let mut header = fixtures::transfer_header("100-abc-1");
    header.op_type = TrackedOpKind::Transfer;

    let outcome = pay_lightning_from_hive(
        &ledger,
        &pending,
        lock,
        &lnd,
        &resolver,
        &mut header,
        "100-abc-1",
        header.short_id.as_str(),
        "lnd-1",
        "server",
        "alice",
        "alice",
        10_000,
        10,
        &destination,
        "lnbc1000n1p...",
        &quote,
        ConversionFee(dec!(0)),
        10_000,
        1,
    )
    .await
    .unwrap();

    match outcome {
        HiveToLightningOutcome::Refunded { .. } => {}
        HiveToLightningOutcome::Succeeded { .. } => panic!("expected a refund, got a success"),
    }

    let queued = pending.active(PendingKind::Transaction).await.unwrap();
    assert!(
        queued
            .iter()
            .any(|r| r.to_account.as_deref() == Some("alice") && r.memo.as_deref().unwrap_or("").starts_with("refund:")),
        "a refund transfer to alice must be queued"
    );
}
