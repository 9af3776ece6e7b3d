//! The Hive client surface the core depends on but never implements
//! (SPEC_FULL.md §1, §6.1): a trait rather than a concrete RPC client, so
//! the block stream can be swapped for a mock in tests or a different node
//! in production without touching ingest logic.

use ledger_commons::TrackedOpKind;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::sync::watch;

/// One operation observed inside a Hive block, already filtered to the
/// [`TrackedOpKind::TRACKED_HIVE_OP_TYPES`] allowlist (SPEC_FULL.md §4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHiveOp {
    pub block_num: u64,
    pub trx_id: String,
    pub op_in_trx: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub op_type: String,
    pub payload: serde_json::Value,
}

impl RawHiveOp {
    pub fn tracked_kind(&self) -> Option<TrackedOpKind> {
        match self.op_type.as_str() {
            "transfer" => Some(TrackedOpKind::Transfer),
            "recurrent_transfer" => Some(TrackedOpKind::RecurrentTransfer),
            "fill_recurrent_transfer" => Some(TrackedOpKind::FillRecurrentTransfer),
            "custom_json" => Some(TrackedOpKind::CustomJson),
            "limit_order_create" => Some(TrackedOpKind::LimitOrderCreate),
            "fill_order" => Some(TrackedOpKind::FillOrder),
            _ => None,
        }
    }
}

/// Every operation the node produced for one block, in trx order
/// (SPEC_FULL.md §3.6, `hive_group_id`'s inputs).
#[derive(Debug, Clone)]
pub struct HiveBlockEvent {
    pub block_num: u64,
    pub timestamp: OffsetDateTime,
    pub ops: Vec<RawHiveOp>,
}

/// The Hive RPC surface `hive-ingest` depends on (SPEC_FULL.md §6.1).
/// Implementations wrap whichever Hive RPC library/node the deployment
/// uses; the core only ever sees [`HiveBlockEvent`]s and broadcast results.
#[async_trait::async_trait]
pub trait HiveClient: Send + Sync {
    /// Streams blocks starting at `start_block` (or the chain head if
    /// `None`) into `tx` until `shutdown` fires or the stream errors.
    /// Mirrors the three-subscription shape `lnd-ingest` uses for LND:
    /// a single producer task per external data source, consumed via a
    /// bounded channel rather than returned as a `Stream` object, which
    /// keeps the trait object-safe.
    async fn run_block_stream(
        &self,
        start_block: Option<u64>,
        tx: mpsc::Sender<HiveBlockEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()>;

    /// Broadcasts a transfer from the server account, returning the
    /// resulting `trx_id`.
    async fn broadcast_transfer(
        &self,
        to: &str,
        amount: &ledger_commons::Amount,
        memo: &str,
        nobroadcast: bool,
    ) -> anyhow::Result<String>;

    /// Broadcasts a custom_json operation, returning the resulting
    /// `trx_id`.
    async fn broadcast_custom_json(
        &self,
        json_id: &str,
        json_data: &serde_json::Value,
        nobroadcast: bool,
    ) -> anyhow::Result<String>;

    /// Current HIVE/HBD balances of `account`.
    async fn account_balances(
        &self,
        account: &str,
    ) -> anyhow::Result<std::collections::HashMap<ledger_commons::Currency, rust_decimal::Decimal>>;
}

/// Forwards through an `Arc`, so a shared client handed to several
/// supervisors (block stream, broadcaster adapter) can itself be used
/// anywhere a `HiveClient` is expected.
#[async_trait::async_trait]
impl HiveClient for std::sync::Arc<dyn HiveClient> {
    async fn run_block_stream(
        &self,
        start_block: Option<u64>,
        tx: mpsc::Sender<HiveBlockEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        self.as_ref().run_block_stream(start_block, tx, shutdown).await
    }

    async fn broadcast_transfer(
        &self,
        to: &str,
        amount: &ledger_commons::Amount,
        memo: &str,
        nobroadcast: bool,
    ) -> anyhow::Result<String> {
        self.as_ref().broadcast_transfer(to, amount, memo, nobroadcast).await
    }

    async fn broadcast_custom_json(
        &self,
        json_id: &str,
        json_data: &serde_json::Value,
        nobroadcast: bool,
    ) -> anyhow::Result<String> {
        self.as_ref().broadcast_custom_json(json_id, json_data, nobroadcast).await
    }

    async fn account_balances(
        &self,
        account: &str,
    ) -> anyhow::Result<std::collections::HashMap<ledger_commons::Currency, rust_decimal::Decimal>> {
        self.as_ref().account_balances(account).await
    }
}
