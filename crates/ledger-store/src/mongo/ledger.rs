//! The `ledger` collection: immutable double-entry journal storage
//! (SPEC_FULL.md §3.5, §4.C, §6.4).

use crate::cache::LedgerCache;
use futures::TryStreamExt;
use ledger_commons::Account;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerEntryError;
use ledger_commons::LedgerType;
use mongodb::bson::doc;
use mongodb::bson::Document;
use mongodb::options::ReplaceOptions;
use mongodb::Collection;
use mongodb::Database;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum LedgerRepositoryError {
    #[error("mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("refusing to persist an unbalanced entry: {0}")]
    Imbalanced(#[from] LedgerEntryError),
}

/// Composable filter for `find_entries`, mirroring the query surface
/// SPEC_FULL.md §4.D's balance/statement engine needs: by customer, by
/// account, by ledger type, and by a timestamp window.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub cust_id: Option<String>,
    pub account: Option<Account>,
    pub ledger_type: Option<LedgerType>,
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
}

impl EntryFilter {
    pub fn cust_id(mut self, cust_id: impl Into<String>) -> Self {
        self.cust_id = Some(cust_id.into());
        self
    }

    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    pub fn ledger_type(mut self, ledger_type: LedgerType) -> Self {
        self.ledger_type = Some(ledger_type);
        self
    }

    pub fn since(mut self, since: OffsetDateTime) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: OffsetDateTime) -> Self {
        self.until = Some(until);
        self
    }

    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(cust_id) = &self.cust_id {
            doc.insert("cust_id", cust_id);
        }
        if let Some(account) = &self.account {
            doc.insert(
                "$or",
                vec![
                    doc! { "debit.name": account.name.to_string(), "debit.sub": &account.sub },
                    doc! { "credit.name": account.name.to_string(), "credit.sub": &account.sub },
                ],
            );
        }
        if let Some(ledger_type) = &self.ledger_type {
            doc.insert(
                "ledger_type",
                mongodb::bson::to_bson(ledger_type).expect("LedgerType serializes"),
            );
        }
        if self.since.is_some() || self.until.is_some() {
            let mut range = Document::new();
            if let Some(since) = self.since {
                range.insert(
                    "$gte",
                    mongodb::bson::DateTime::from_system_time(since.into()),
                );
            }
            if let Some(until) = self.until {
                range.insert(
                    "$lte",
                    mongodb::bson::DateTime::from_system_time(until.into()),
                );
            }
            doc.insert("timestamp", range);
        }
        doc
    }
}

#[derive(Clone)]
pub struct LedgerRepository {
    collection: Collection<LedgerEntry>,
    cache: Option<LedgerCache>,
}

impl LedgerRepository {
    pub(crate) fn new(db: &Database, cache: Option<LedgerCache>) -> Self {
        Self {
            collection: db.collection("ledger"),
            cache,
        }
    }

    pub(crate) async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.collection
            .create_indexes(
                [
                    super::unique_index("group_id"),
                    super::plain_index([("cust_id".to_string(), 1)]),
                    super::plain_index([
                        ("debit.name".to_string(), 1),
                        ("debit.sub".to_string(), 1),
                        ("timestamp".to_string(), 1),
                    ]),
                    super::plain_index([
                        ("credit.name".to_string(), 1),
                        ("credit.sub".to_string(), 1),
                        ("timestamp".to_string(), 1),
                    ]),
                    super::plain_index([("ledger_type".to_string(), 1)]),
                ],
                None,
            )
            .await?;
        Ok(())
    }

    /// Idempotent upsert keyed by `group_id` (SPEC_FULL.md §3.5: "group_id
    /// ... used for idempotent upsert"). Refuses to persist an entry whose
    /// two sides diverge (SPEC_FULL.md §3.5/§7: "fail fast; do not persist;
    /// alert operator") — every pipeline posts through here, so the check
    /// runs exactly once per entry regardless of call site.
    pub async fn save(&self, entry: &LedgerEntry) -> Result<(), LedgerRepositoryError> {
        entry.check_balanced()?;
        self.collection
            .replace_one(
                doc! { "group_id": &entry.group_id },
                entry,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate_for(&entry.debit, &entry.credit).await {
                tracing::warn!("ledger cache invalidation failed after saving {}: {err}", entry.group_id);
            }
        }
        Ok(())
    }

    pub async fn find_one(&self, group_id: &str) -> Result<Option<LedgerEntry>, LedgerRepositoryError> {
        Ok(self.collection.find_one(doc! { "group_id": group_id }, None).await?)
    }

    pub async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, LedgerRepositoryError> {
        let cursor = self.collection.find(filter.to_document(), None).await?;
        Ok(cursor.try_collect().await?)
    }
}
