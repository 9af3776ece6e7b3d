//! Process orchestration (SPEC_FULL.md §5, §6.5): wires Mongo/Redis,
//! starts the Hive and LND ingest supervisors, the pending-resend and
//! sanity-check schedulers, and one representative event-to-pipeline
//! dispatch, then waits for shutdown.
//!
//! Grounded on `coordinator/src/bin/coordinator.rs`'s `tokio::spawn` fan-out
//! with a shared `watch::Receiver<bool>` shutdown signal and a final
//! `tokio::time::timeout` join, adapted from its DLC/orderbook tasks to
//! this bridge's ingest/pipeline tasks.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod logger;
pub mod metrics;

use crate::adapters::ClientAdapters;
use crate::config::BridgeConfig;
use crate::metrics::Metrics;
use ledger_commons::Quote;
use ledger_commons::QuoteSourceKind;
use ledger_store::CustomerLock;
use ledger_store::Db;
use lnd_ingest::InvoiceState;
use pipelines::custom_json_internal_transfer;
use pipelines::deposit_lightning_as_keepsats;
use pipelines::stage_one_customer_credit;
use redis::aio::ConnectionManager;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const QUOTE_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const PENDING_RESEND_INTERVAL: Duration = Duration::from_secs(30);
const SANITY_CHECK_INTERVAL: Duration = Duration::from_secs(300);
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const HIVE_STREAM_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
/// `process_invoice.py` tags a custom_json fee payment under the server's
/// own "keepsats" Liability sub rather than a customer id.
const FEE_THRESHOLD_SATS: i64 = 10;

/// Runs the bridge until `shutdown` reports `true`. Returns once every
/// spawned supervisor has exited (or [`SHUTDOWN_JOIN_TIMEOUT`] elapses).
pub async fn run(config: BridgeConfig, adapters: ClientAdapters, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let db = Db::connect(&config.mongo.uri, &config.mongo.db_name).await?;
    db.ensure_indexes().await?;
    tracing::info!(db = %config.mongo.db_name, "connected to mongo");

    let redis_client = redis::Client::open(config.redis_uri.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("connected to redis");

    let db = db.with_cache(ledger_store::LedgerCache::new(redis_conn.clone()));

    let metrics = Metrics::new()?;
    metrics::init(&metrics)?;

    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    handles.push(spawn_metrics_server(metrics.clone(), config.metrics_addr));
    handles.push(spawn_quote_refresh(db.clone(), adapters.quote_sources.clone(), shutdown.clone()));
    handles.push(spawn_pending_resend(db.clone(), adapters.hive.clone(), config.hive.server_account.clone(), metrics.clone(), shutdown.clone()));
    handles.push(spawn_sanity_checks(db.clone(), metrics.clone(), shutdown.clone()));
    handles.push(spawn_hive_block_stream(adapters.hive.clone(), config.hive.start_block, metrics.clone(), shutdown.clone()));
    handles.push(spawn_ledger_change_stream_monitor(db.clone(), redis_conn.clone(), shutdown.clone()));

    let (invoice_rx, _htlc_rx, _payment_rx) = lnd_ingest::spawn_subscriptions(adapters.lnd.clone(), shutdown.clone());
    handles.push(spawn_invoice_dispatcher(
        db.clone(),
        redis_conn,
        config.hive.server_account.clone(),
        config.lock.lease,
        config.lock.blocking_timeout,
        metrics,
        invoice_rx,
    ));

    shutdown.changed().await.ok();
    tracing::info!("shutdown signal received, waiting for supervisors to exit");

    let join_all = futures::future::join_all(handles);
    if tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, join_all).await.is_err() {
        tracing::warn!(timeout = ?SHUTDOWN_JOIN_TIMEOUT, "not every supervisor exited before the shutdown timeout");
    }

    Ok(())
}

/// Listens for Ctrl-C (and, on unix, SIGTERM) and flips `tx` once either
/// fires, following the reference binary's own signal-to-`watch` bridge.
pub async fn wait_for_shutdown_signal(tx: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received ctrl-c");
    }

    let _ = tx.send(true);
}

fn spawn_quote_refresh(db: Db, sources: Vec<Arc<dyn ledger_commons::QuoteSource>>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(QUOTE_REFRESH_INTERVAL) => {}
                _ = shutdown.changed() => if *shutdown.borrow() { return; },
            }

            match merge_quotes(&sources).await {
                Some(quote) => {
                    if let Err(err) = db.rates().insert(&quote).await {
                        tracing::error!("failed to persist refreshed quote: {err}");
                    } else {
                        tracing::info!(hive_usd = %quote.hive_usd, btc_usd = %quote.btc_usd, "refreshed quote");
                    }
                }
                None => tracing::warn!("every quote source failed this refresh cycle"),
            }
        }
    })
}

/// Fetches every source concurrently and averages whatever succeeded,
/// tagging the result [`QuoteSourceKind::Merged`]. Returns `None` only if
/// every source failed.
async fn merge_quotes(sources: &[Arc<dyn ledger_commons::QuoteSource>]) -> Option<Quote> {
    let fetched = futures::future::join_all(sources.iter().map(|s| async move {
        match s.fetch().await {
            Ok(quote) => Some(quote),
            Err(err) => {
                tracing::warn!(source = ?s.kind(), "quote source failed: {err}");
                None
            }
        }
    }))
    .await;

    let ok: Vec<Quote> = fetched.into_iter().flatten().collect();
    if ok.is_empty() {
        return None;
    }

    let n = Decimal::from(ok.len() as u64);
    let sum = |f: fn(&Quote) -> Decimal| ok.iter().map(f).sum::<Decimal>();
    Some(Quote {
        hive_usd: sum(|q| q.hive_usd) / n,
        hbd_usd: sum(|q| q.hbd_usd) / n,
        btc_usd: sum(|q| q.btc_usd) / n,
        hive_hbd: sum(|q| q.hive_hbd) / n,
        source: QuoteSourceKind::Merged,
        fetch_date: time::OffsetDateTime::now_utc(),
    })
}

fn spawn_pending_resend(
    db: Db,
    hive: Arc<dyn hive_ingest::HiveClient>,
    server_account: String,
    metrics: Metrics,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let broadcaster = hive_ingest::HiveBroadcasterAdapter::new(hive, server_account.clone());
        loop {
            tokio::select! {
                _ = tokio::time::sleep(PENDING_RESEND_INTERVAL) => {}
                _ = shutdown.changed() => if *shutdown.borrow() { return; },
            }

            let pending = db.pending();
            if let Err(err) = ledger_store::resend_pending_transactions(&pending, &server_account, &broadcaster).await {
                tracing::error!("pending transaction resend pass failed: {err:#}");
            }
            if let Err(err) = ledger_store::resend_pending_custom_jsons(&pending, &broadcaster).await {
                tracing::error!("pending custom_json resend pass failed: {err:#}");
            }

            match futures::future::try_join(
                pending.active(ledger_store::PendingKind::Transaction),
                pending.active(ledger_store::PendingKind::CustomJson),
            )
            .await
            {
                Ok((transactions, custom_jsons)) => metrics.set_pending_queue_depth((transactions.len() + custom_jsons.len()) as i64),
                Err(err) => tracing::warn!("failed to sample pending-queue depth: {err}"),
            }
            metrics.record_supervisor_heartbeat("pending_resend", 0.0);
        }
    })
}

fn spawn_sanity_checks(db: Db, metrics: Metrics, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(SANITY_CHECK_INTERVAL) => {}
                _ = shutdown.changed() => if *shutdown.borrow() { return; },
            }

            let ledger = db.ledger();
            let now = time::OffsetDateTime::now_utc();
            // No chart-of-accounts listing exists to enumerate every
            // customer sub, so this check only covers the accounts given
            // here; widen it once such a listing exists.
            let checks: Vec<_> = vec![Box::pin(ledger_store::balanced_balance_sheet(&ledger, &[], now)) as ledger_store::CheckFuture];
            let results = ledger_store::run_all_sanity_checks(checks).await;
            for result in &results {
                if result.passed {
                    tracing::info!(check = result.name, "sanity check passed");
                } else {
                    tracing::error!(check = result.name, detail = %result.detail, "sanity check failed");
                }
            }
            let imbalanced = results.iter().any(|r| r.name == "balanced_balance_sheet" && !r.passed);
            metrics.set_balance_sheet_imbalanced(imbalanced);
            metrics.record_supervisor_heartbeat("sanity_checks", 0.0);
        }
    })
}

fn spawn_metrics_server(metrics: Metrics, addr: std::net::SocketAddr) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = metrics::serve(metrics, addr).await {
            tracing::error!("metrics endpoint stopped: {err:#}");
        }
    })
}

/// Runs the Hive block stream with the same `run -> log -> sleep -> retry`
/// shape `lnd_ingest::spawn_subscriptions` uses for LND, since
/// `HiveClient` has only one stream rather than three. Touches the
/// `hive_block_stream` heartbeat gauge on every block, the signal §4.G's
/// time-skew/reconnect logic watches for staleness.
fn spawn_hive_block_stream(
    hive: Arc<dyn hive_ingest::HiveClient>,
    start_block: u64,
    metrics: Metrics,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if start_block == 0 { None } else { Some(start_block) };
        loop {
            if *shutdown.borrow() {
                return;
            }

            let (tx, mut rx) = tokio::sync::mpsc::channel(64);
            let heartbeat_metrics = metrics.clone();
            let drain = tokio::spawn(async move {
                while rx.recv().await.is_some() {
                    heartbeat_metrics.record_supervisor_heartbeat("hive_block_stream", 0.0);
                }
            });

            match hive.run_block_stream(start, tx, shutdown.clone()).await {
                Ok(()) => {
                    tracing::info!("hive block stream ended, shutting down");
                    drain.abort();
                    return;
                }
                Err(err) => tracing::error!("hive block stream dropped, reconnecting: {err:#}"),
            }
            drain.abort();

            tokio::select! {
                _ = tokio::time::sleep(HIVE_STREAM_RECONNECT_BACKOFF) => {}
                _ = shutdown.changed() => if *shutdown.borrow() { return; },
            }
        }
    })
}

/// Watches the `ledger` collection's change stream, logging every
/// post-persist entry — the one change-stream supervisor wired end to end
/// as a working example (SPEC_FULL.md §4.I); `payments`/`invoices`/
/// `hive_ops`/`rates_ts` are reached the same way but aren't duplicated
/// here. Restarts with bounded backoff on a non-resumable error, the same
/// posture `spawn_hive_block_stream` takes toward its own stream.
fn spawn_ledger_change_stream_monitor(db: Db, redis_conn: ConnectionManager, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let collection = db.raw_collection("ledger");
            let result = ledger_store::watch_collection(collection, redis_conn.clone(), shutdown.clone(), |doc| {
                let group_id = doc.get_str("group_id").unwrap_or("<unknown>");
                let ledger_type = doc.get_str("ledger_type").unwrap_or("<unknown>");
                tracing::info!(group_id, ledger_type, "ledger entry persisted");
            })
            .await;

            match result {
                Ok(()) => return,
                Err(err) => tracing::error!("ledger change-stream monitor dropped, reconnecting: {err}"),
            }

            tokio::select! {
                _ = tokio::time::sleep(HIVE_STREAM_RECONNECT_BACKOFF) => {}
                _ = shutdown.changed() => if *shutdown.borrow() { return; },
            }
        }
    })
}

/// Drains settled Lightning invoices into stage one of
/// [`deposit_lightning_as_keepsats`]/[`stage_one_customer_credit`] under the
/// settling customer's [`CustomerLock`] — the one dispatch path wired end
/// to end as a working example; the other `pipelines` entry points
/// (HTLC/payment events, Hive block ops, exchange fills) are reached the
/// same way but aren't duplicated here. The memo is the invoice's own
/// customer id, set when this bridge issues the invoice being settled.
#[allow(clippy::too_many_arguments)]
fn spawn_invoice_dispatcher(
    db: Db,
    redis_conn: ConnectionManager,
    server_account: String,
    lock_lease: Duration,
    lock_blocking_timeout: Duration,
    metrics: Metrics,
    mut invoice_rx: tokio::sync::mpsc::Receiver<lnd_ingest::InvoiceEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = invoice_rx.recv().await {
            if event.state != InvoiceState::Settled {
                continue;
            }
            if event.memo.trim().is_empty() {
                tracing::warn!(payment_hash = %event.payment_hash_hex, "settled invoice memo carries no customer id, skipping");
                continue;
            }
            let cust_id = event.memo.trim().to_string();

            let quote = match db.rates().latest().await {
                Ok(Some(quote)) => quote,
                Ok(None) => {
                    tracing::error!(payment_hash = %event.payment_hash_hex, "no quote available, dropping settled invoice");
                    continue;
                }
                Err(err) => {
                    tracing::error!("failed to load latest quote: {err}");
                    continue;
                }
            };

            let lock = match CustomerLock::acquire(redis_conn.clone(), &cust_id, lock_lease, Some(lock_blocking_timeout)).await {
                Ok(lock) => lock,
                Err(err) => {
                    tracing::error!(payment_hash = %event.payment_hash_hex, cust_id, "could not acquire customer lock: {err}");
                    continue;
                }
            };

            let group_id = format!("invoice-{}", event.payment_hash_hex);
            let ledger = db.ledger();

            let result = credit_settled_invoice(&ledger, &server_account, &cust_id, &group_id, &event, &quote, &metrics).await;
            if let Err(err) = lock.release().await {
                tracing::warn!(cust_id, "failed to release customer lock: {err}");
            }
            metrics.record_supervisor_heartbeat("invoice_dispatcher", 0.0);

            match result {
                Ok(()) => tracing::info!(payment_hash = %event.payment_hash_hex, group_id, cust_id, "credited customer for settled invoice"),
                Err(err) => tracing::error!(payment_hash = %event.payment_hash_hex, "settled invoice credit failed: {err}"),
            }
        }
    })
}

/// `#[autometrics]` reports this function's call count, error rate and
/// latency through the OTel meter `metrics::init` installs, the same
/// per-function instrumentation the reference coordinator gets from the
/// macro on its own request handlers.
#[autometrics::autometrics]
async fn credit_settled_invoice(
    ledger: &ledger_store::LedgerRepository,
    server_account: &str,
    cust_id: &str,
    group_id: &str,
    event: &lnd_ingest::InvoiceEvent,
    quote: &Quote,
    metrics: &Metrics,
) -> anyhow::Result<()> {
    deposit_lightning_as_keepsats(
        ledger,
        ledger_commons::OpType::Invoice,
        group_id,
        &event.payment_hash_hex,
        server_account,
        "lnd",
        cust_id,
        event.value_msat,
        &event.memo,
        quote,
    )
    .await?;
    metrics.record_ledger_entry(ledger_commons::LedgerType::DepositLightning.group_id_token());

    let transfer = stage_one_customer_credit(server_account, cust_id, event.value_msat, &event.memo);
    custom_json_internal_transfer(
        ledger,
        ledger_commons::OpType::Invoice,
        group_id,
        &event.payment_hash_hex,
        &transfer,
        quote,
        FEE_THRESHOLD_SATS,
        i64::MAX,
    )
    .await?;
    metrics.record_ledger_entry(ledger_commons::LedgerType::CustomJsonTransfer.group_id_token());
    Ok(())
}
