//! Price oracle snapshots, grounded on SPEC_FULL.md §3.2 and §4.B.
//!
//! The core never fans out to price sources itself (SPEC_FULL.md §1,
//! "Deliberately out of scope"); it depends only on the [`QuoteSource`]
//! trait, the same shape as the Hive/LND client traits in `hive-ingest` and
//! `lnd-ingest`.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

/// Where a merged [`Quote`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSourceKind {
    Binance,
    CoinMarketCap,
    HiveInternalMarket,
    /// Produced by [`QuoteCache`] merging two or more raw sources.
    Merged,
}

/// Immutable exchange-rate snapshot (SPEC_FULL.md §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub hive_usd: Decimal,
    pub hbd_usd: Decimal,
    pub btc_usd: Decimal,
    pub hive_hbd: Decimal,
    pub source: QuoteSourceKind,
    #[serde(with = "time::serde::rfc3339")]
    pub fetch_date: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote source {0:?} failed: {1}")]
    SourceFailed(QuoteSourceKind, String),
    #[error("quote rate is zero for the requested conversion")]
    ZeroRate,
    #[error("no quote found within the configured window")]
    QuoteNotFound,
}

impl Quote {
    /// Satoshis per HIVE implied by this quote, derived from `hive_usd` and `btc_usd`.
    pub fn sats_hive(&self) -> Option<Decimal> {
        if self.btc_usd.is_zero() {
            return None;
        }
        Some(self.hive_usd / self.btc_usd * Decimal::from(crate::SATS_PER_BTC))
    }

    /// Satoshis per HBD implied by this quote.
    pub fn sats_hbd(&self) -> Option<Decimal> {
        if self.btc_usd.is_zero() {
            return None;
        }
        Some(self.hbd_usd / self.btc_usd * Decimal::from(crate::SATS_PER_BTC))
    }

    /// Satoshis per USD implied by this quote.
    pub fn sats_usd(&self) -> Option<Decimal> {
        if self.btc_usd.is_zero() {
            return None;
        }
        Some(Decimal::from(crate::SATS_PER_BTC) / self.btc_usd)
    }

    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.fetch_date
    }

    /// A quote is fresh while its age is at most 600s (SPEC_FULL.md §4.B).
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.age(now) <= time::Duration::seconds(600)
    }
}

/// An external rate provider the core consumes but never implements
/// (SPEC_FULL.md §1, §4.B).
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    fn kind(&self) -> QuoteSourceKind;
    async fn fetch(&self) -> Result<Quote, QuoteError>;
}
