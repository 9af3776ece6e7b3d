//! The pending-resend loop, grounded on
//! `original_source/.../process/process_pending_hive.py`'s
//! `resend_pending_transactions`/`resend_pending_custom_jsons`
//! (SPEC_FULL.md §4.K, §4.M.9).
//!
//! The loop never broadcasts directly — it depends on [`HiveBroadcaster`],
//! the same "consumed, not implemented in-core" pattern as `QuoteSource`,
//! so `hive-ingest`'s real client is the only thing that ever touches the
//! network.

use crate::mongo::PendingKind;
use crate::mongo::PendingRecord;
use crate::mongo::PendingRepository;
use ledger_commons::Currency;
use std::collections::HashMap;

#[async_trait::async_trait]
pub trait HiveBroadcaster: Send + Sync {
    async fn account_balances(&self, account: &str) -> anyhow::Result<HashMap<Currency, rust_decimal::Decimal>>;
    async fn send_pending_transfer(&self, record: &PendingRecord) -> anyhow::Result<String>;
    async fn send_pending_custom_json(&self, record: &PendingRecord) -> anyhow::Result<String>;
}

/// Resends every active pending Hive transfer whose currency the server can
/// currently afford, debiting a local running copy of the balance as it
/// goes so two transfers of the same currency in one pass don't both pass
/// the feasibility check against a stale balance
/// (`process_pending_hive.py`'s `server_balance[...] -= pending.amount`).
pub async fn resend_pending_transactions(
    pending: &PendingRepository,
    server_account: &str,
    broadcaster: &dyn HiveBroadcaster,
) -> anyhow::Result<()> {
    let all_pending = pending.active(PendingKind::Transaction).await?;
    if all_pending.is_empty() {
        tracing::info!("no pending Hive transactions to resend");
        return Ok(());
    }
    tracing::info!(count = all_pending.len(), "resending pending Hive transactions");

    let mut balances = broadcaster.account_balances(server_account).await?;

    for mut record in all_pending {
        let amount = match &record.amount {
            Some(a) => *a,
            None => continue,
        };
        let available = balances.entry(amount.currency()).or_default();
        if *available < amount.value() {
            tracing::warn!(
                unique_key = %record.unique_key,
                required = %amount,
                available = %available,
                "insufficient balance to resend pending transaction"
            );
            continue;
        }
        *available -= amount.value();

        record.resend_attempt += 1;
        match broadcaster.send_pending_transfer(&record).await {
            Ok(trx_id) => {
                tracing::info!(unique_key = %record.unique_key, trx_id, "resent pending transaction");
                pending.deactivate(&record.unique_key).await?;
            }
            Err(err) => {
                pending.mark_resent(&record.unique_key).await?;
                tracing::warn!(unique_key = %record.unique_key, "failed to resend pending transaction: {err:#}");
            }
        }
    }
    Ok(())
}

/// Resends every active pending custom_json — no balance check applies,
/// only the presence of `json_data`.
pub async fn resend_pending_custom_jsons(
    pending: &PendingRepository,
    broadcaster: &dyn HiveBroadcaster,
) -> anyhow::Result<()> {
    let all_pending = pending.active(PendingKind::CustomJson).await?;
    if all_pending.is_empty() {
        tracing::info!("no pending custom JSONs to resend");
        return Ok(());
    }
    tracing::info!(count = all_pending.len(), "resending pending custom JSONs");

    for mut record in all_pending {
        if record.json_data.is_none() {
            tracing::warn!(unique_key = %record.unique_key, "skipping pending custom_json with no json_data");
            continue;
        }
        record.resend_attempt += 1;
        match broadcaster.send_pending_custom_json(&record).await {
            Ok(trx_id) => {
                tracing::info!(unique_key = %record.unique_key, trx_id, "resent pending custom_json");
                pending.deactivate(&record.unique_key).await?;
            }
            Err(err) => {
                pending.mark_resent(&record.unique_key).await?;
                tracing::warn!(unique_key = %record.unique_key, "failed to resend pending custom_json: {err:#}");
            }
        }
    }
    Ok(())
}
