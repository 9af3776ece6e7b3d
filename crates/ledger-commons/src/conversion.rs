//! Multi-currency conversion snapshots, grounded on SPEC_FULL.md §3.3 and on
//! `original_source/.../accounting/converted_summary_class.py`, which defines
//! a dataclass with a full element-wise arithmetic operator set. This system
//! keeps the same field set but, per SPEC_FULL.md §9 ("Strategy: a value
//! type with explicit methods; no operator overloading reliance"), exposes
//! `add`/`sub`/`mul`/`div`/`neg` methods instead of implementing
//! `std::ops::*` — so every call site names the operation it performs.

use crate::Currency;
use crate::Quote;
use crate::QuoteError;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

/// Five-currency running total, used for balance-sheet/P&L aggregation rows
/// (SPEC_FULL.md §4.D, §4.E). Unlike [`Conversion`] it carries no
/// `conv_from`/`value`/`fetch_date` provenance — it is a pure accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvertedSummary {
    pub hive: Decimal,
    pub hbd: Decimal,
    pub usd: Decimal,
    pub sats: Decimal,
    pub msats: i64,
}

impl ConvertedSummary {
    pub fn add(&self, other: &ConvertedSummary) -> ConvertedSummary {
        ConvertedSummary {
            hive: self.hive + other.hive,
            hbd: self.hbd + other.hbd,
            usd: self.usd + other.usd,
            sats: self.sats + other.sats,
            msats: self.msats + other.msats,
        }
    }

    pub fn sub(&self, other: &ConvertedSummary) -> ConvertedSummary {
        ConvertedSummary {
            hive: self.hive - other.hive,
            hbd: self.hbd - other.hbd,
            usd: self.usd - other.usd,
            sats: self.sats - other.sats,
            msats: self.msats - other.msats,
        }
    }

    pub fn mul_scalar(&self, factor: Decimal) -> ConvertedSummary {
        ConvertedSummary {
            hive: self.hive * factor,
            hbd: self.hbd * factor,
            usd: self.usd * factor,
            sats: self.sats * factor,
            msats: (Decimal::from(self.msats) * factor)
                .round()
                .try_into()
                .unwrap_or(self.msats),
        }
    }

    pub fn neg(&self) -> ConvertedSummary {
        self.mul_scalar(Decimal::NEGATIVE_ONE)
    }

    pub fn is_zero(&self) -> bool {
        self.hive.is_zero()
            && self.hbd.is_zero()
            && self.usd.is_zero()
            && self.sats.is_zero()
            && self.msats == 0
    }
}

/// A closed conversion record produced by applying a [`Quote`] to a
/// principal amount expressed in any supported currency (SPEC_FULL.md §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub conv_from: Currency,
    pub value: Decimal,
    pub hive: Decimal,
    pub hbd: Decimal,
    pub usd: Decimal,
    pub sats: Decimal,
    pub msats: i64,
    pub sats_hive: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub fetch_date: OffsetDateTime,
    /// Fee portion, in msats, carried alongside the principal conversion
    /// when the source value already nets out a protocol fee (e.g. the
    /// Lightning routing fee reserved during HIVE→Keepsats, SPEC_FULL.md
    /// §4.M.3).
    pub msats_fee: Option<i64>,
}

impl Conversion {
    /// A zero-valued, "unset" conversion anchored at `fetch_date`, used as
    /// the initial state of [`crate::TrackedOpHeader::conv`] before
    /// `update_conv` runs (SPEC_FULL.md §4.F).
    pub fn zero(from: Currency, fetch_date: OffsetDateTime) -> Self {
        Conversion {
            conv_from: from,
            value: Decimal::ZERO,
            hive: Decimal::ZERO,
            hbd: Decimal::ZERO,
            usd: Decimal::ZERO,
            sats: Decimal::ZERO,
            msats: 0,
            sats_hive: Decimal::ZERO,
            fetch_date,
            msats_fee: None,
        }
    }

    /// A conversion is "unset" if every derived field is zero
    /// (SPEC_FULL.md §3.3).
    pub fn is_unset(&self) -> bool {
        self.hive.is_zero()
            && self.hbd.is_zero()
            && self.usd.is_zero()
            && self.sats.is_zero()
            && self.msats == 0
    }

    pub fn summary(&self) -> ConvertedSummary {
        ConvertedSummary {
            hive: self.hive,
            hbd: self.hbd,
            usd: self.usd,
            sats: self.sats,
            msats: self.msats,
        }
    }

    pub fn add(&self, other: &Conversion) -> Conversion {
        Conversion {
            conv_from: self.conv_from,
            value: self.value + other.value,
            hive: self.hive + other.hive,
            hbd: self.hbd + other.hbd,
            usd: self.usd + other.usd,
            sats: self.sats + other.sats,
            msats: self.msats + other.msats,
            sats_hive: self.sats_hive,
            fetch_date: self.fetch_date,
            msats_fee: sum_optional(self.msats_fee, other.msats_fee),
        }
    }

    pub fn sub(&self, other: &Conversion) -> Conversion {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Conversion {
        Conversion {
            conv_from: self.conv_from,
            value: -self.value,
            hive: -self.hive,
            hbd: -self.hbd,
            usd: -self.usd,
            sats: -self.sats,
            msats: -self.msats,
            sats_hive: self.sats_hive,
            fetch_date: self.fetch_date,
            msats_fee: self.msats_fee.map(|f| -f),
        }
    }
}

fn sum_optional(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Applies `quote` to `value` (expressed in `from`), producing a full
/// [`Conversion`] record (SPEC_FULL.md §4.A).
///
/// Rounding uses bankers-rounding to msats (the finest unit tracked);
/// HIVE/HBD/USD/BTC/SATS fields are derived from the msats figure so the
/// whole record is internally consistent (invariant 8, SPEC_FULL.md §8).
pub fn convert(from: Currency, value: Decimal, quote: &Quote) -> Result<Conversion, QuoteError> {
    let sats_hive = quote.sats_hive().ok_or(QuoteError::ZeroRate)?;
    let sats_hbd = quote.sats_hbd().ok_or(QuoteError::ZeroRate)?;
    let sats_usd = quote.sats_usd().ok_or(QuoteError::ZeroRate)?;

    let sats: Decimal = match from {
        Currency::Hive => value * sats_hive,
        Currency::Hbd => value * sats_hbd,
        Currency::Usd => value * sats_usd,
        Currency::Btc => value * Decimal::from(crate::SATS_PER_BTC),
        Currency::Sats => value,
        Currency::Msats => value / Decimal::from(crate::MSATS_PER_SAT),
    };

    let msats = (sats * Decimal::from(crate::MSATS_PER_SAT))
        .round()
        .to_string()
        .parse::<i64>()
        .map_err(|_| QuoteError::ZeroRate)?;

    let sats = Decimal::from(msats) / Decimal::from(crate::MSATS_PER_SAT);
    let hive = if sats_hive.is_zero() {
        Decimal::ZERO
    } else {
        sats / sats_hive
    };
    let hbd = if sats_hbd.is_zero() {
        Decimal::ZERO
    } else {
        sats / sats_hbd
    };
    let usd = if sats_usd.is_zero() {
        Decimal::ZERO
    } else {
        sats / sats_usd
    };

    Ok(Conversion {
        conv_from: from,
        value,
        hive,
        hbd,
        usd,
        sats,
        msats,
        sats_hive,
        fetch_date: quote.fetch_date,
        msats_fee: None,
    })
}
