//! Adapts any [`HiveClient`] into `ledger-store`'s
//! [`ledger_store::HiveBroadcaster`], the trait the pending-resend loop
//! depends on (SPEC_FULL.md §4.K). Keeping this as a blanket impl rather
//! than folding broadcasting into `HiveBroadcaster` itself keeps
//! `ledger-store` free of a dependency on `hive-ingest`.

use crate::HiveClient;
use ledger_store::PendingKind;
use ledger_store::PendingRecord;
use std::collections::HashMap;

pub struct HiveBroadcasterAdapter<C> {
    client: C,
    server_account: String,
}

impl<C: HiveClient> HiveBroadcasterAdapter<C> {
    pub fn new(client: C, server_account: impl Into<String>) -> Self {
        Self {
            client,
            server_account: server_account.into(),
        }
    }
}

#[async_trait::async_trait]
impl<C: HiveClient> ledger_store::HiveBroadcaster for HiveBroadcasterAdapter<C> {
    async fn account_balances(
        &self,
        account: &str,
    ) -> anyhow::Result<HashMap<ledger_commons::Currency, rust_decimal::Decimal>> {
        self.client.account_balances(account).await
    }

    async fn send_pending_transfer(&self, record: &PendingRecord) -> anyhow::Result<String> {
        anyhow::ensure!(
            record.pending_type == PendingKind::Transaction,
            "send_pending_transfer called with a non-transaction pending record"
        );
        let to = record
            .to_account
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("pending transaction {} has no to_account", record.unique_key))?;
        let amount = record
            .amount
            .ok_or_else(|| anyhow::anyhow!("pending transaction {} has no amount", record.unique_key))?;
        let memo = record.memo.as_deref().unwrap_or_default();
        self.client.broadcast_transfer(to, &amount, memo, record.nobroadcast).await
    }

    async fn send_pending_custom_json(&self, record: &PendingRecord) -> anyhow::Result<String> {
        anyhow::ensure!(
            record.pending_type == PendingKind::CustomJson,
            "send_pending_custom_json called with a non-custom_json pending record"
        );
        let json_id = record
            .json_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("pending custom_json {} has no json_id", record.unique_key))?;
        let json_data = record
            .json_data
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("pending custom_json {} has no json_data", record.unique_key))?;
        self.client.broadcast_custom_json(json_id, json_data, record.nobroadcast).await
    }
}

impl<C> HiveBroadcasterAdapter<C> {
    pub fn server_account(&self) -> &str {
        &self.server_account
    }
}
