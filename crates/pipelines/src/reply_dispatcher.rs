//! Every pipeline concludes here: a Hive transfer (primary) or a
//! `custom_json` (fallback) queued back to the user as confirmation or
//! change (SPEC_FULL.md §4.M.8). Routing through `ledger-store`'s pending
//! queue rather than broadcasting inline means a reply survives a crash
//! between "decided to reply" and "reply actually sent on the wire" —
//! the resend loop (§4.M.9, already implemented in `ledger-store::pending`)
//! picks it up from there.

use ledger_commons::Amount;
use ledger_commons::Reply;
use ledger_commons::ReplyType;
use ledger_commons::TrackedOpHeader;
use ledger_store::PendingKind;
use ledger_store::PendingRecord;
use ledger_store::PendingRepository;
use time::OffsetDateTime;

/// What a pipeline decided to send back to the user, before routing.
#[derive(Debug, Clone)]
pub struct ReplyIntent {
    pub to_account: String,
    pub amount: Option<Amount>,
    pub memo: String,
    pub json_id: Option<String>,
    pub json_data: Option<serde_json::Value>,
    /// Forces route (b) (`custom_json`) regardless of `amount`, set when
    /// the amount is below the configured "tiny payment" threshold
    /// (SPEC_FULL.md §4.M.8).
    pub force_custom_json: bool,
}

impl ReplyIntent {
    pub fn hive_transfer(to_account: impl Into<String>, amount: Amount, memo: impl Into<String>) -> Self {
        Self {
            to_account: to_account.into(),
            amount: Some(amount),
            memo: memo.into(),
            json_id: None,
            json_data: None,
            force_custom_json: false,
        }
    }

    pub fn custom_json(
        to_account: impl Into<String>,
        json_id: impl Into<String>,
        json_data: serde_json::Value,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            to_account: to_account.into(),
            amount: None,
            memo: memo.into(),
            json_id: Some(json_id.into()),
            json_data: Some(json_data),
            force_custom_json: true,
        }
    }
}

/// Queues `intent` as a pending action and records it on the operation's
/// `replies` list. Route (b) is taken whenever `force_custom_json` is set
/// or no Hive amount was given; route (a) otherwise.
pub async fn dispatch_reply(
    pending: &PendingRepository,
    header: &mut TrackedOpHeader,
    server_account: &str,
    nobroadcast: bool,
    intent: ReplyIntent,
) -> Result<(), mongodb::error::Error> {
    let unique_key = format!("{}-reply-{}", header.group_id, header.replies.len());

    let use_custom_json = intent.force_custom_json || intent.amount.is_none();

    let record = if use_custom_json {
        PendingRecord {
            unique_key: unique_key.clone(),
            pending_type: PendingKind::CustomJson,
            from_account: server_account.to_string(),
            to_account: Some(intent.to_account.clone()),
            amount: None,
            memo: Some(intent.memo.clone()),
            json_id: intent.json_id.clone(),
            json_data: intent.json_data.clone(),
            resend_attempt: 0,
            active: true,
            nobroadcast,
            created_at: OffsetDateTime::now_utc(),
        }
    } else {
        PendingRecord {
            unique_key: unique_key.clone(),
            pending_type: PendingKind::Transaction,
            from_account: server_account.to_string(),
            to_account: Some(intent.to_account.clone()),
            amount: intent.amount,
            memo: Some(intent.memo.clone()),
            json_id: None,
            json_data: None,
            resend_attempt: 0,
            active: true,
            nobroadcast,
            created_at: OffsetDateTime::now_utc(),
        }
    };

    pending.enqueue(&record).await?;

    header.add_reply(Reply {
        reply_id: unique_key,
        reply_type: if use_custom_json {
            ReplyType::CustomJson
        } else {
            ReplyType::Transfer
        },
        reply_msat: None,
        reply_error: None,
        reply_message: Some(intent.memo),
    });

    Ok(())
}
