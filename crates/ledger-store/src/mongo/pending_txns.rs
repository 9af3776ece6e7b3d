//! The `pending` collection: queued Hive broadcasts and custom_json
//! payloads awaiting a feasibility check before resend (SPEC_FULL.md §4.K,
//! §4.M.9, §6.4), grounded on
//! `original_source/.../actions/process_pending_hive.py`.

use futures::TryStreamExt;
use ledger_commons::Amount;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use mongodb::Database;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Transaction,
    CustomJson,
}

/// One queued, not-yet-confirmed outbound action (SPEC_FULL.md §4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Deduplication key: SPEC_FULL.md §4.K requires this to be unique so a
    /// resend attempt never double-queues the same action.
    pub unique_key: String,
    pub pending_type: PendingKind,
    pub from_account: String,
    pub to_account: Option<String>,
    pub amount: Option<Amount>,
    pub memo: Option<String>,
    pub json_id: Option<String>,
    pub json_data: Option<serde_json::Value>,
    pub resend_attempt: u32,
    pub active: bool,
    pub nobroadcast: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct PendingRepository {
    collection: Collection<PendingRecord>,
}

impl PendingRepository {
    pub(crate) fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("pending"),
        }
    }

    pub(crate) async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.collection
            .create_indexes(
                [
                    super::unique_index("unique_key"),
                    super::plain_index([
                        ("pending_type".to_string(), 1),
                        ("amount.currency".to_string(), 1),
                    ]),
                    super::plain_index([("active".to_string(), 1)]),
                ],
                None,
            )
            .await?;
        Ok(())
    }

    /// Enqueues a record, silently doing nothing if `unique_key` already
    /// exists (SPEC_FULL.md §4.K: resend is idempotent).
    pub async fn enqueue(&self, record: &PendingRecord) -> Result<(), mongodb::error::Error> {
        self.collection
            .update_one(
                doc! { "unique_key": &record.unique_key },
                doc! { "$setOnInsert": mongodb::bson::to_bson(record)?.as_document().unwrap().clone() },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    pub async fn active(&self, kind: PendingKind) -> Result<Vec<PendingRecord>, mongodb::error::Error> {
        let filter = doc! {
            "active": true,
            "pending_type": mongodb::bson::to_bson(&kind)?,
        };
        let cursor = self.collection.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn mark_resent(&self, unique_key: &str) -> Result<(), mongodb::error::Error> {
        self.collection
            .update_one(
                doc! { "unique_key": unique_key },
                doc! { "$inc": { "resend_attempt": 1 } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn deactivate(&self, unique_key: &str) -> Result<(), mongodb::error::Error> {
        self.collection
            .update_one(
                doc! { "unique_key": unique_key },
                doc! { "$set": { "active": false } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn exists(&self, unique_key: &str) -> Result<bool, mongodb::error::Error> {
        Ok(self
            .collection
            .find_one(doc! { "unique_key": unique_key }, None)
            .await?
            .is_some())
    }
}
