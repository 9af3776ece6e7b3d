//! The LND gRPC surface the core depends on but never implements
//! (SPEC_FULL.md §1, §6.2). Payment/invoice status naming follows
//! `ln-dlc-node::node::invoice::HTLCStatus`, generalized from LDK's
//! in-process payment persister to values read off LND's own
//! `lnrpc.Invoice`/`lnrpc.Payment`/`routerrpc.HtlcEvent` streams.

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Open,
    Settled,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceEvent {
    pub payment_hash_hex: String,
    pub value_msat: i64,
    pub memo: String,
    pub state: InvoiceState,
    pub add_index: u64,
    pub settle_index: Option<u64>,
    pub settled_at: Option<OffsetDateTime>,
}

/// Mirrors `ln-dlc-node`'s `HTLCStatus`, extended with `Canceled` for the
/// fourth terminal state `routerrpc.HtlcEvent` can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtlcStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtlcEvent {
    pub payment_hash_hex: String,
    pub htlc_index: u64,
    pub status: HtlcStatus,
    pub incoming: bool,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_hash_hex: String,
    pub value_msat: i64,
    pub fee_msat: i64,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
}

/// The node's balance sheet as LND itself reports it (the closest Rust
/// analogue to `ln-dlc-node`'s `OffChainBalance`, read from the remote node
/// instead of an embedded LDK instance).
#[derive(Debug, Clone, Copy)]
pub struct LndBalances {
    pub onchain_confirmed_sats: i64,
    pub onchain_unconfirmed_sats: i64,
    pub channel_local_sats: i64,
    pub channel_remote_sats: i64,
    pub channel_pending_close_sats: i64,
}

/// The LND RPC surface `lnd-ingest` depends on (SPEC_FULL.md §6.2).
/// Implementations wrap `tonic_lnd` or an equivalent gRPC stub; the core
/// only ever sees the event types above.
#[async_trait::async_trait]
pub trait LndClient: Send + Sync {
    /// Subscribes to `lnrpc.SubscribeInvoices`, emitting every state
    /// transition until `shutdown` fires.
    async fn subscribe_invoices(&self, tx: mpsc::Sender<InvoiceEvent>, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;

    /// Subscribes to `routerrpc.SubscribeHtlcEvents`.
    async fn subscribe_htlc_events(&self, tx: mpsc::Sender<HtlcEvent>, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;

    /// Subscribes to `lnrpc.TrackPayments` (or an equivalent payments
    /// stream) for every in-flight and completed outbound payment.
    async fn subscribe_payments(&self, tx: mpsc::Sender<PaymentEvent>, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;

    /// Sends a payment for `bolt11`, waiting for a terminal state (the
    /// generalization of `ln-dlc-node`'s `send_payment` +
    /// `wait_for_payment_claimed` pair into a single round trip, since LND
    /// itself — unlike an embedded LDK node — already blocks a
    /// `SendPaymentV2` call until the payment resolves).
    async fn send_payment(&self, bolt11: &str, fee_limit_msat: i64) -> anyhow::Result<PaymentEvent>;

    /// Creates a new invoice for `value_msat`, returning its bolt11 string.
    async fn create_invoice(&self, value_msat: i64, memo: &str, expiry_seconds: u32) -> anyhow::Result<String>;

    async fn balances(&self) -> anyhow::Result<LndBalances>;
}
