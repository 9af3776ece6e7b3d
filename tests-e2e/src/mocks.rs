//! In-memory test doubles for the Hive/LND/exchange/quote/LNURL traits,
//! playing the role the reference suite's `bitcoind`/`process` helpers
//! play for an external regtest node: a stand-in good enough to drive a
//! pipeline through its happy and unhappy paths without a live network.

use async_trait::async_trait;
use exchange::ExchangeClient;
use exchange::ExchangeOrderResult;
use exchange::OrderSide;
use hive_ingest::HiveBlockEvent;
use hive_ingest::HiveClient;
use ledger_commons::Amount;
use ledger_commons::Currency;
use lnd_ingest::HtlcEvent;
use lnd_ingest::InvoiceEvent;
use lnd_ingest::LndBalances;
use lnd_ingest::LndClient;
use lnd_ingest::PaymentEvent;
use lnd_ingest::PaymentStatus;
use pipelines::LnurlResolver;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;

/// An LND double that returns one scripted [`PaymentEvent`] per call to
/// `send_payment`, in order, and never actually implements the
/// subscription/invoice side of the trait (unused by the pipelines under
/// test, so left `unimplemented!` to flag an accidental call).
pub struct ScriptedLndClient {
    payments: Mutex<Vec<PaymentEvent>>,
}

impl ScriptedLndClient {
    pub fn new(payments: Vec<PaymentEvent>) -> Self {
        Self {
            payments: Mutex::new(payments),
        }
    }

    /// A client whose next `send_payment` call always succeeds, charging
    /// `fee_msat`.
    pub fn always_succeeds(fee_msat: i64) -> Self {
        Self::new(vec![PaymentEvent {
            payment_hash_hex: "deadbeef".to_string(),
            value_msat: 0,
            fee_msat,
            status: PaymentStatus::Succeeded,
            failure_reason: None,
        }])
    }

    /// A client whose next `send_payment` call always fails with
    /// `reason` (SPEC_FULL.md §8 scenario 2's expired-invoice failure).
    pub fn always_fails(reason: &str) -> Self {
        Self::new(vec![PaymentEvent {
            payment_hash_hex: "deadbeef".to_string(),
            value_msat: 0,
            fee_msat: 0,
            status: PaymentStatus::Failed,
            failure_reason: Some(reason.to_string()),
        }])
    }
}

#[async_trait]
impl LndClient for ScriptedLndClient {
    async fn subscribe_invoices(&self, _tx: mpsc::Sender<InvoiceEvent>, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn subscribe_htlc_events(&self, _tx: mpsc::Sender<HtlcEvent>, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn subscribe_payments(&self, _tx: mpsc::Sender<PaymentEvent>, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn send_payment(&self, _bolt11: &str, _fee_limit_msat: i64) -> anyhow::Result<PaymentEvent> {
        let mut scripted = self.payments.lock().unwrap();
        anyhow::ensure!(!scripted.is_empty(), "ScriptedLndClient: no more scripted payments");
        Ok(scripted.remove(0))
    }

    async fn create_invoice(&self, _value_msat: i64, _memo: &str, _expiry_seconds: u32) -> anyhow::Result<String> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn balances(&self) -> anyhow::Result<LndBalances> {
        unimplemented!("not exercised by the pipelines under test")
    }
}

/// Pays a payment whose cost (value + fee) is exactly `value_msat`,
/// charging `fee_msat` of it as the routing fee — the shape
/// `hive_to_lightning::attempt_payment` expects back.
pub fn succeeding_payment(value_msat: i64, fee_msat: i64) -> PaymentEvent {
    PaymentEvent {
        payment_hash_hex: "deadbeef".to_string(),
        value_msat: value_msat - fee_msat,
        fee_msat,
        status: PaymentStatus::Succeeded,
        failure_reason: None,
    }
}

/// Resolves every destination to the same fixed bolt11, regardless of
/// input — enough to exercise the LNURL branch of
/// `hive_to_lightning::decode_payment_destination` end to end without an
/// HTTP round trip.
pub struct FixedLnurlResolver {
    pub bolt11: String,
}

#[async_trait]
impl LnurlResolver for FixedLnurlResolver {
    async fn resolve(&self, _destination: &str, _msats: i64, _comment: &str) -> anyhow::Result<String> {
        Ok(self.bolt11.clone())
    }
}

/// A [`HiveClient`] double recording every broadcast it was asked to make,
/// for asserting on change/refund transfers without a Hive node.
#[derive(Default)]
pub struct RecordingHiveClient {
    pub transfers: Mutex<Vec<(String, Amount, String)>>,
}

#[async_trait]
impl HiveClient for RecordingHiveClient {
    async fn run_block_stream(&self, _start_block: Option<u64>, _tx: mpsc::Sender<HiveBlockEvent>, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn broadcast_transfer(&self, to: &str, amount: &Amount, memo: &str, _nobroadcast: bool) -> anyhow::Result<String> {
        self.transfers.lock().unwrap().push((to.to_string(), *amount, memo.to_string()));
        Ok(format!("txid-{}", self.transfers.lock().unwrap().len()))
    }

    async fn broadcast_custom_json(&self, _json_id: &str, _json_data: &serde_json::Value, _nobroadcast: bool) -> anyhow::Result<String> {
        unimplemented!("not exercised by the pipelines under test")
    }

    async fn account_balances(&self, _account: &str) -> anyhow::Result<HashMap<Currency, Decimal>> {
        unimplemented!("not exercised by the pipelines under test")
    }
}

/// An [`ExchangeClient`] double that always fills the full requested
/// quantity at a fixed price, for exercising the rebalancer's accounting
/// step without a venue.
pub struct FillingExchangeClient {
    pub avg_price: Decimal,
}

#[async_trait]
impl ExchangeClient for FillingExchangeClient {
    async fn place_market_order(&self, symbol: &str, side: OrderSide, base_qty: Decimal) -> anyhow::Result<ExchangeOrderResult> {
        Ok(ExchangeOrderResult {
            exchange: "mock".to_string(),
            symbol: symbol.to_string(),
            order_id: "1".to_string(),
            client_order_id: "1".to_string(),
            side,
            status: exchange::OrderStatus::Filled,
            requested_qty: base_qty,
            executed_qty: base_qty,
            quote_qty: base_qty * self.avg_price,
            avg_price: self.avg_price,
            fee_msats: Decimal::ZERO,
            fee_original: Decimal::ZERO,
            fee_asset: "BTC".to_string(),
        })
    }

    async fn balance(&self, _asset: &str) -> anyhow::Result<Decimal> {
        Ok(Decimal::ZERO)
    }
}
