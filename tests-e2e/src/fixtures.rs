//! Builders for the value types scenario tests construct repeatedly:
//! [`Quote`]s, [`Account`]s and tracked-operation headers. Defaults mirror
//! SPEC_FULL.md §8's literal scenario inputs so a test can override just
//! the one field the scenario varies.

use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::Quote;
use ledger_commons::QuoteSourceKind;
use ledger_commons::TrackedOpHeader;
use ledger_commons::TrackedOpKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;

/// The quote carried by scenario 1/2/3 in SPEC_FULL.md §8:
/// `{hive_usd=0.25, btc_usd=50000, hive_hbd=0.25}`.
pub fn scenario_quote() -> Quote {
    Quote {
        hive_usd: dec!(0.25),
        hbd_usd: dec!(0.25),
        btc_usd: dec!(50000),
        hive_hbd: dec!(0.25),
        source: QuoteSourceKind::HiveInternalMarket,
        fetch_date: OffsetDateTime::now_utc(),
    }
}

/// A quote with the given rates, everything else defaulted from
/// [`scenario_quote`] — for tests that need a different price point.
pub fn quote_with_rates(hive_usd: Decimal, btc_usd: Decimal) -> Quote {
    Quote {
        hive_usd,
        hbd_usd: hive_usd,
        btc_usd,
        hive_hbd: Decimal::ONE,
        source: QuoteSourceKind::Merged,
        fetch_date: OffsetDateTime::now_utc(),
    }
}

/// A stale quote, aged past [`Quote::is_fresh`]'s 600s window.
pub fn stale_quote() -> Quote {
    let mut quote = scenario_quote();
    quote.fetch_date = OffsetDateTime::now_utc() - time::Duration::seconds(900);
    quote
}

/// A fresh `TrackedOpHeader` for a Hive transfer, keyed by `group_id`.
pub fn transfer_header(group_id: &str) -> TrackedOpHeader {
    TrackedOpHeader::new(group_id.to_string(), TrackedOpKind::Transfer, OffsetDateTime::now_utc())
}

pub fn customer_liability(cust_id: &str) -> Account {
    Account::new(AccountName::CustomerLiability, cust_id, false)
}
