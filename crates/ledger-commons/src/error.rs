//! The error-kind taxonomy, grounded on SPEC_FULL.md §7.
//!
//! Every pipeline function returns `Result<PipelineOutcome, BridgeError>`;
//! the reply dispatcher (in `pipelines`) is the single place that turns
//! either a `PolicyRejected` outcome or a caught `BridgeError::Policy`/
//! `BridgeError::Data` into a user-visible reply, per §7's propagation
//! policy ("they never swallow invariant errors").

use thiserror::Error;

/// The six error kinds named in SPEC_FULL.md §7, carrying correlation
/// context (`group_id`, `cust_id`) as required by the propagation policy.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transient error for group_id={group_id:?} cust_id={cust_id:?}: {message}")]
    Transient {
        group_id: Option<String>,
        cust_id: Option<String>,
        message: String,
    },

    #[error("policy rejection for group_id={group_id:?} cust_id={cust_id:?}: {reason}")]
    Policy {
        group_id: Option<String>,
        cust_id: Option<String>,
        reason: PolicyReason,
    },

    #[error("data error for group_id={group_id:?}: {message}")]
    Data {
        group_id: Option<String>,
        message: String,
    },

    #[error("concurrency error for cust_id={cust_id}: {message}")]
    Concurrency { cust_id: String, message: String },

    #[error("invariant violated for group_id={group_id:?}: {message}")]
    Invariant {
        group_id: Option<String>,
        message: String,
    },

    #[error("fatal error: {message}")]
    Fatal { message: String },
}

/// The specific policy preconditions enumerated across SPEC_FULL.md
/// §4.M.1's precondition list and §7's Policy-kind examples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyReason {
    #[error("customer {cust_id} is on the bad-actor list: {reason}")]
    BadActor { cust_id: String, reason: String },
    #[error("customer {cust_id} is not on the dev-mode allowlist")]
    NotAllowlisted { cust_id: String },
    #[error("rate limit exceeded for customer {cust_id}: {detail}")]
    RateLimited { cust_id: String, detail: String },
    #[error("bad-actor source unreachable, failing closed: {detail}")]
    SourceUnreachable { detail: String },
    #[error("insufficient Keepsats balance: {cust_id} has {available_sats} sats, transfer requires {required_sats} sats.")]
    InsufficientBalance {
        cust_id: String,
        available_sats: i64,
        required_sats: i64,
    },
    #[error("amount {amount} is outside the permitted range [{min}, {max}]")]
    OutOfRange {
        amount: String,
        min: String,
        max: String,
    },
    #[error("Lightning payment expired")]
    InvoiceExpired,
    #[error("LNURL amount out of range: {detail}")]
    LnurlOutOfRange { detail: String },
}

impl BridgeError {
    pub fn policy(group_id: impl Into<String>, cust_id: impl Into<String>, reason: PolicyReason) -> Self {
        BridgeError::Policy {
            group_id: Some(group_id.into()),
            cust_id: Some(cust_id.into()),
            reason,
        }
    }

    pub fn invariant(group_id: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Invariant {
            group_id: Some(group_id.into()),
            message: message.into(),
        }
    }

    /// `true` for error kinds SPEC_FULL.md §7 classifies as retryable by
    /// the caller (Transient and Concurrency).
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Transient { .. } | BridgeError::Concurrency { .. })
    }
}
