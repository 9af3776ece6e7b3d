//! The polymorphic tracked-operation abstraction, grounded on
//! SPEC_FULL.md §3.6 and §4.F, and on the pooled-handle/transactional
//! executor shape of `coordinator/src/dlc_protocol.rs`'s
//! `DlcProtocolExecutor` (its `ProtocolId(Uuid)` wrapper with `Display`,
//! `Default` and `From`/`TryFrom` impls is the direct model for
//! `ShortId` below).

use crate::Conversion;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use std::fmt;
use time::OffsetDateTime;

/// Discriminator stored alongside every tracked operation so it can be
/// loaded back polymorphically (SPEC_FULL.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedOpKind {
    Transfer,
    RecurrentTransfer,
    FillRecurrentTransfer,
    CustomJson,
    LimitOrderCreate,
    FillOrder,
    Invoice,
    Payment,
    Quote,
    PendingTransaction,
    PendingCustomJson,
}

impl TrackedOpKind {
    /// The closed set of Hive operation types that are tracked at ingest;
    /// anything else is discarded (SPEC_FULL.md §4.F).
    pub const TRACKED_HIVE_OP_TYPES: &'static [&'static str] = &[
        "transfer",
        "recurrent_transfer",
        "fill_recurrent_transfer",
        "custom_json",
        "limit_order_create",
        "fill_order",
        "account_witness_vote",
        "producer_reward",
        "producer_missed",
        "update_proposal_votes",
        "account_update2",
    ];
}

/// A 6-to-12 character correlation token designed for memo embedding
/// (SPEC_FULL.md §3.6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortId(String);

impl ShortId {
    /// Derives a short id from a `group_id` by hashing it and taking the
    /// first 8 hex characters — long enough to be practically unique within
    /// one server's operation volume, short enough to fit in a Hive memo.
    pub fn from_group_id(group_id: &str) -> Self {
        let digest = Sha256::digest(group_id.as_bytes());
        Self(hex::encode(&digest[..4]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the `group_id` for a Hive-sourced operation
/// (SPEC_FULL.md §3.6: `block_num-trx_id-op_in_trx`).
pub fn hive_group_id(block_num: u64, trx_id: &str, op_in_trx: u32) -> String {
    format!("{block_num}-{trx_id}-{op_in_trx}")
}

/// Builds the `group_id` for an LND-sourced operation (invoice or payment),
/// derived from the payment hash (SPEC_FULL.md §3.6).
pub fn lnd_group_id(payment_hash_hex: &str) -> String {
    payment_hash_hex.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyType {
    Transfer,
    CustomJson,
    Payment,
}

/// Records one outbound action taken in response to a tracked operation
/// (SPEC_FULL.md §3.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: String,
    pub reply_type: ReplyType,
    pub reply_msat: Option<i64>,
    pub reply_error: Option<String>,
    pub reply_message: Option<String>,
}

/// Common fields every tracked operation variant carries
/// (SPEC_FULL.md §3.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedOpHeader {
    pub group_id: String,
    pub short_id: ShortId,
    pub op_type: TrackedOpKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub cust_id: Option<String>,
    pub conv: Conversion,
    pub replies: Vec<Reply>,
}

impl TrackedOpHeader {
    pub fn new(group_id: String, op_type: TrackedOpKind, timestamp: OffsetDateTime) -> Self {
        let short_id = ShortId::from_group_id(&group_id);
        Self {
            group_id,
            short_id,
            op_type,
            timestamp,
            cust_id: None,
            conv: crate::Conversion::zero(crate::Currency::Msats, timestamp),
            replies: Vec::new(),
        }
    }

    pub fn add_reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    /// Sets `conv` from `quote`, per SPEC_FULL.md §4.F's `update_conv`
    /// contract. The caller (typically via `ledger-store`'s nearest-quote
    /// lookup) resolves which quote to use; this method only applies it.
    pub fn set_conv(&mut self, principal: crate::Amount, quote: &crate::Quote) -> Result<(), crate::QuoteError> {
        self.conv = crate::convert(principal.currency(), principal.value(), quote)?;
        Ok(())
    }
}

/// Interface every tracked operation variant implements
/// (SPEC_FULL.md §4.F: `{group_id, save, load, update_conv, add_reply}`).
///
/// `save`/`load` are intentionally not part of this trait: persistence is a
/// `ledger-store` concern (SPEC_FULL.md §9, "a runtime context object
/// passed explicitly to every pipeline", rather than a process-wide
/// singleton). This trait captures only the in-memory identity contract.
pub trait TrackedOperation {
    fn header(&self) -> &TrackedOpHeader;
    fn header_mut(&mut self) -> &mut TrackedOpHeader;

    fn group_id(&self) -> &str {
        &self.header().group_id
    }

    fn short_id(&self) -> &ShortId {
        &self.header().short_id
    }

    fn add_reply(&mut self, reply: Reply) {
        self.header_mut().add_reply(reply);
    }
}
