//! The `ops` collection: polymorphic [`TrackedOp`] storage, discriminated
//! by `op_type` (SPEC_FULL.md §3.6, §4.F, §6.4).

use futures::TryStreamExt;
use ledger_commons::Amount;
use ledger_commons::Reply;
use ledger_commons::TrackedOpHeader;
use mongodb::bson::doc;
use mongodb::options::ReplaceOptions;
use mongodb::Collection;
use mongodb::Database;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOp {
    pub header: TrackedOpHeader,
    pub from_account: String,
    pub to_account: String,
    pub amount: Amount,
    pub memo: String,
    pub block_num: u64,
    pub trx_id: String,
    pub op_in_trx: u32,
    pub change_amount: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentTransferOp {
    pub header: TrackedOpHeader,
    pub from_account: String,
    pub to_account: String,
    pub amount: Amount,
    pub memo: String,
    pub recurrence_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecurrentTransferOp {
    pub header: TrackedOpHeader,
    pub recurrence_id: String,
    pub fill_group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomJsonOp {
    pub header: TrackedOpHeader,
    pub from_account: String,
    pub to_account: Option<String>,
    pub json_id: String,
    pub json_data: serde_json::Value,
    pub block_num: u64,
    pub trx_id: String,
    pub op_in_trx: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrderCreateOp {
    pub header: TrackedOpHeader,
    pub order_id: String,
    pub amount_to_sell: Amount,
    pub min_to_receive: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillOrderOp {
    pub header: TrackedOpHeader,
    pub order_id: String,
    pub current_pays: Amount,
    pub current_receives: Amount,
    pub open_pays: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Open,
    Settled,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceOp {
    pub header: TrackedOpHeader,
    pub payment_hash: String,
    pub value_msat: i64,
    pub memo: String,
    pub state: InvoiceState,
    pub add_index: u64,
    pub settle_index: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOp {
    pub header: TrackedOpHeader,
    pub payment_hash: String,
    pub value_msat: i64,
    pub fee_msat: i64,
    pub status: PaymentStatus,
    pub v4vapp_group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteOp {
    pub header: TrackedOpHeader,
    pub quote: ledger_commons::Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransactionOp {
    pub header: TrackedOpHeader,
    pub unique_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCustomJsonOp {
    pub header: TrackedOpHeader,
    pub unique_key: String,
}

/// Polymorphic wrapper, tagged by `op_type` (SPEC_FULL.md §4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op_type", rename_all = "snake_case")]
pub enum TrackedOp {
    Transfer(TransferOp),
    RecurrentTransfer(RecurrentTransferOp),
    FillRecurrentTransfer(FillRecurrentTransferOp),
    CustomJson(CustomJsonOp),
    LimitOrderCreate(LimitOrderCreateOp),
    FillOrder(FillOrderOp),
    Invoice(InvoiceOp),
    Payment(PaymentOp),
    Quote(QuoteOp),
    PendingTransaction(PendingTransactionOp),
    PendingCustomJson(PendingCustomJsonOp),
}

impl TrackedOp {
    pub fn header(&self) -> &TrackedOpHeader {
        match self {
            TrackedOp::Transfer(o) => &o.header,
            TrackedOp::RecurrentTransfer(o) => &o.header,
            TrackedOp::FillRecurrentTransfer(o) => &o.header,
            TrackedOp::CustomJson(o) => &o.header,
            TrackedOp::LimitOrderCreate(o) => &o.header,
            TrackedOp::FillOrder(o) => &o.header,
            TrackedOp::Invoice(o) => &o.header,
            TrackedOp::Payment(o) => &o.header,
            TrackedOp::Quote(o) => &o.header,
            TrackedOp::PendingTransaction(o) => &o.header,
            TrackedOp::PendingCustomJson(o) => &o.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut TrackedOpHeader {
        match self {
            TrackedOp::Transfer(o) => &mut o.header,
            TrackedOp::RecurrentTransfer(o) => &mut o.header,
            TrackedOp::FillRecurrentTransfer(o) => &mut o.header,
            TrackedOp::CustomJson(o) => &mut o.header,
            TrackedOp::LimitOrderCreate(o) => &mut o.header,
            TrackedOp::FillOrder(o) => &mut o.header,
            TrackedOp::Invoice(o) => &mut o.header,
            TrackedOp::Payment(o) => &mut o.header,
            TrackedOp::Quote(o) => &mut o.header,
            TrackedOp::PendingTransaction(o) => &mut o.header,
            TrackedOp::PendingCustomJson(o) => &mut o.header,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.header().group_id
    }

    pub fn add_reply(&mut self, reply: Reply) {
        self.header_mut().add_reply(reply);
    }
}

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("operation with group_id={0} not found")]
    NotFound(String),
}

#[derive(Clone)]
pub struct OpsRepository {
    collection: Collection<TrackedOp>,
}

impl OpsRepository {
    pub(crate) fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("ops"),
        }
    }

    pub(crate) async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.collection
            .create_indexes(
                [
                    super::unique_index("header.group_id"),
                    super::plain_index([("header.cust_id".to_string(), 1)]),
                    super::plain_index([("header.timestamp".to_string(), 1)]),
                    super::plain_index([("op_type".to_string(), 1), ("header.timestamp".to_string(), 1)]),
                ],
                None,
            )
            .await?;
        Ok(())
    }

    /// Idempotent upsert by `group_id` (SPEC_FULL.md §4.F: `save()`).
    pub async fn save(&self, op: &TrackedOp) -> Result<(), OpsError> {
        let group_id = op.group_id().to_string();
        self.collection
            .replace_one(
                doc! { "header.group_id": &group_id },
                op,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    /// Polymorphic load by `group_id` (SPEC_FULL.md §4.F: `load()`).
    pub async fn load(&self, group_id: &str) -> Result<TrackedOp, OpsError> {
        self.collection
            .find_one(doc! { "header.group_id": group_id }, None)
            .await?
            .ok_or_else(|| OpsError::NotFound(group_id.to_string()))
    }

    pub async fn try_load(&self, group_id: &str) -> Result<Option<TrackedOp>, OpsError> {
        Ok(self.collection.find_one(doc! { "header.group_id": group_id }, None).await?)
    }

    pub async fn by_cust_id(&self, cust_id: &str) -> Result<Vec<TrackedOp>, OpsError> {
        let cursor = self
            .collection
            .find(doc! { "header.cust_id": cust_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
