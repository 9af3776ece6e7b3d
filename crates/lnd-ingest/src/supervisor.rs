//! Runs the three LND subscriptions independently and restarts whichever
//! one drops, following `coordinator`'s `tokio::spawn` + retry-loop shape
//! (SPEC_FULL.md §6.2 calls for the three streams to reconnect on their
//! own schedule rather than tearing each other down).

use crate::client::HtlcEvent;
use crate::client::InvoiceEvent;
use crate::client::LndClient;
use crate::client::PaymentEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::watch;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Spawns the invoice, HTLC-event and payment subscriptions as independent
/// tasks, each looping `run_* -> log error -> sleep -> retry` until
/// `shutdown` fires. Returns the three receiving ends; the caller (the
/// pipeline dispatcher) owns draining them.
pub fn spawn_subscriptions<C>(
    client: Arc<C>,
    shutdown: watch::Receiver<bool>,
) -> (
    mpsc::Receiver<InvoiceEvent>,
    mpsc::Receiver<HtlcEvent>,
    mpsc::Receiver<PaymentEvent>,
)
where
    C: LndClient + 'static,
{
    let (invoice_tx, invoice_rx) = mpsc::channel(256);
    let (htlc_tx, htlc_rx) = mpsc::channel(256);
    let (payment_tx, payment_rx) = mpsc::channel(256);

    tokio::spawn(run_with_retry("invoices", shutdown.clone(), {
        let client = client.clone();
        move |shutdown| {
            let client = client.clone();
            let tx = invoice_tx.clone();
            async move { client.subscribe_invoices(tx, shutdown).await }
        }
    }));

    tokio::spawn(run_with_retry("htlc_events", shutdown.clone(), {
        let client = client.clone();
        move |shutdown| {
            let client = client.clone();
            let tx = htlc_tx.clone();
            async move { client.subscribe_htlc_events(tx, shutdown).await }
        }
    }));

    tokio::spawn(run_with_retry("payments", shutdown.clone(), {
        let client = client.clone();
        move |shutdown| {
            let client = client.clone();
            let tx = payment_tx.clone();
            async move { client.subscribe_payments(tx, shutdown).await }
        }
    }));

    (invoice_rx, htlc_rx, payment_rx)
}

async fn run_with_retry<F, Fut>(name: &'static str, mut shutdown: watch::Receiver<bool>, mut run_once: F)
where
    F: FnMut(watch::Receiver<bool>) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    loop {
        if *shutdown.borrow() {
            return;
        }
        match run_once(shutdown.clone()).await {
            Ok(()) => {
                tracing::info!(subscription = name, "lnd subscription ended, shutting down");
                return;
            }
            Err(e) => {
                tracing::error!(subscription = name, error = %e, "lnd subscription dropped, reconnecting");
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}
