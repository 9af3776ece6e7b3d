//! Typed accounts, grounded on SPEC_FULL.md §3.4 and on
//! `original_source/.../accounting/ledger_account_classes.py`, which this
//! system adopts as authoritative over the older `account_type.py` module
//! (Open Question #1, recorded in DESIGN.md): `ledger_account_classes.py`
//! carries an explicit `contra: bool` on every account instead of encoding
//! it into separate `CONTRA_ASSET`-style type variants, matching §3.4's
//! "Equality and hash are over the full 4-tuple" exactly.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// The five account types plus their normal-balance rule
/// (SPEC_FULL.md §3.4: "debits increase {Asset, Expense}; credits increase
/// {Liability, Equity, Revenue}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// `true` if a debit to an account of this type (non-contra) increases
    /// its balance.
    pub const fn debit_increases(self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// Closed whitelist of account names, one set of variants per
/// [`AccountType`] (SPEC_FULL.md §3.4's "constrained to a closed whitelist
/// per type"). `Other` exists only for names this system has not yet
/// enumerated (e.g. a newly onboarded exchange's suspense account),
/// matching `sub`'s own role as the free-form half of the tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AccountName {
    // --- Asset ---
    /// Holds the server's Lightning-side liquidity once HIVE has been
    /// converted to sats (SPEC_FULL.md §4.M.1/§4.M.3).
    TreasuryLightning,
    /// Receives inbound HIVE/HBD transfers from customers before they are
    /// converted or forwarded.
    CustomerDepositsHive,
    /// Contra-asset offsetting `TreasuryLightning` for the HIVE-denominated
    /// leg of a HIVE→Keepsats conversion (always `contra = true`).
    ConvertedKeepsatsOffset,
    /// Contra-asset tracking outbound Lightning commitments
    /// (SPEC_FULL.md GLOSSARY; always `contra = true`).
    ExternalLightningPayments,
    /// Suspense account absorbing exchange fills against untracked
    /// counterparties (Open Question #3, DESIGN.md).
    ExternalMarketSuspense,
    /// On-exchange balance awaiting settlement back to Treasury.
    ExchangeBalance,
    Other(String),

    // --- Liability ---
    /// The "VSC Liability" family: customer-owned Keepsats balances,
    /// `sub` is the customer id (or `"keepsats"` for the server-owned pool
    /// used by hold/release escrow, SPEC_FULL.md §4.M.6).
    CustomerLiability,

    // --- Equity ---
    OpeningBalance,

    // --- Revenue ---
    /// Fee income earned on the Lightning leg of a conversion; `sub` is
    /// always the LND node name (Open Question #2, DESIGN.md).
    FeeIncomeLightning,
    /// Fee income earned purely within the Keepsats ledger (custom_json
    /// transfer fees, hold/release-adjacent fees); `sub` is `"keepsats"`.
    FeeIncomeKeepsats,

    // --- Expense ---
    ExchangeFeeExpense,
}

impl AccountName {
    /// The [`AccountType`] this name is valid under. Constructing an
    /// [`Account`] with a mismatched type is rejected by
    /// [`Account::new`].
    pub fn account_type(&self) -> AccountType {
        use AccountName::*;
        match self {
            TreasuryLightning
            | CustomerDepositsHive
            | ConvertedKeepsatsOffset
            | ExternalLightningPayments
            | ExternalMarketSuspense
            | ExchangeBalance
            | Other(_) => AccountType::Asset,
            CustomerLiability => AccountType::Liability,
            OpeningBalance => AccountType::Equity,
            FeeIncomeLightning | FeeIncomeKeepsats => AccountType::Revenue,
            ExchangeFeeExpense => AccountType::Expense,
        }
    }

    /// Whether this name is, by definition, a contra account. Some names
    /// (e.g. `ExternalMarketSuspense`) may additionally be marked contra
    /// per call site; these are always contra regardless.
    pub fn always_contra(&self) -> bool {
        matches!(
            self,
            AccountName::ConvertedKeepsatsOffset | AccountName::ExternalLightningPayments
        )
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountName::TreasuryLightning => "Treasury Lightning",
            AccountName::CustomerDepositsHive => "Customer Deposits Hive",
            AccountName::ConvertedKeepsatsOffset => "Converted Keepsats Offset",
            AccountName::ExternalLightningPayments => "External Lightning Payments",
            AccountName::ExternalMarketSuspense => "External Market Suspense",
            AccountName::ExchangeBalance => "Exchange Balance",
            AccountName::CustomerLiability => "Customer Liability",
            AccountName::OpeningBalance => "Opening Balance",
            AccountName::FeeIncomeLightning => "Fee Income Lightning",
            AccountName::FeeIncomeKeepsats => "Fee Income Keepsats",
            AccountName::ExchangeFeeExpense => "Exchange Fee Expense",
            AccountName::Other(name) => name.as_str(),
        };
        f.write_str(s)
    }
}

/// A `{account_type, name, sub, contra}` tuple (SPEC_FULL.md §3.4).
/// Equality and hashing are over the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub account_type: AccountType,
    pub name: AccountName,
    pub sub: String,
    pub contra: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("account name {name} is not valid for type {account_type:?}")]
    TypeMismatch {
        name: String,
        account_type: AccountType,
    },
}

impl Account {
    /// Constructs an account, rejecting a `(type, name)` combination the
    /// whitelist does not permit. `contra` defaults to the name's
    /// `always_contra()` value but may be overridden `true` for names that
    /// are contra only in some contexts (e.g. a suspense account used as
    /// contra only for a specific pipeline).
    pub fn new(name: AccountName, sub: impl Into<String>, contra: bool) -> Self {
        let account_type = name.account_type();
        Account {
            account_type,
            contra: contra || name.always_contra(),
            name,
            sub: sub.into(),
        }
    }

    pub fn asset(name: AccountName, sub: impl Into<String>) -> Result<Self, AccountError> {
        Self::typed(name, sub, AccountType::Asset)
    }

    pub fn liability(name: AccountName, sub: impl Into<String>) -> Result<Self, AccountError> {
        Self::typed(name, sub, AccountType::Liability)
    }

    pub fn equity(name: AccountName, sub: impl Into<String>) -> Result<Self, AccountError> {
        Self::typed(name, sub, AccountType::Equity)
    }

    pub fn revenue(name: AccountName, sub: impl Into<String>) -> Result<Self, AccountError> {
        Self::typed(name, sub, AccountType::Revenue)
    }

    pub fn expense(name: AccountName, sub: impl Into<String>) -> Result<Self, AccountError> {
        Self::typed(name, sub, AccountType::Expense)
    }

    fn typed(
        name: AccountName,
        sub: impl Into<String>,
        expected: AccountType,
    ) -> Result<Self, AccountError> {
        if name.account_type() != expected {
            return Err(AccountError::TypeMismatch {
                name: name.to_string(),
                account_type: expected,
            });
        }
        Ok(Self::new(name, sub, false))
    }

    /// Sign multiplier (+1/-1) applied to a signed amount when this account
    /// is on the debit side of an entry (SPEC_FULL.md §4.D's running-balance
    /// signing rule).
    pub fn debit_sign(&self) -> i64 {
        let natural = if self.account_type.debit_increases() {
            1
        } else {
            -1
        };
        if self.contra {
            -natural
        } else {
            natural
        }
    }

    /// Sign multiplier when this account is on the credit side.
    pub fn credit_sign(&self) -> i64 {
        -self.debit_sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contra_accounts_invert_debit_sign() {
        let treasury = Account::asset(AccountName::TreasuryLightning, "server").unwrap();
        assert_eq!(treasury.debit_sign(), 1);

        let offset = Account::new(AccountName::ConvertedKeepsatsOffset, "server", false);
        assert!(offset.contra);
        assert_eq!(offset.debit_sign(), -1);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let err = Account::liability(AccountName::TreasuryLightning, "server").unwrap_err();
        assert_eq!(
            err,
            AccountError::TypeMismatch {
                name: "Treasury Lightning".to_string(),
                account_type: AccountType::Liability,
            }
        );
    }
}
