//! `MemoClassifier`, grounded on SPEC_FULL.md §6.6 and the design note in
//! §9 ("a single `MemoClassifier` with an explicit precedence list of
//! patterns → route; unit-tested against a corpus"). Memos are free text;
//! this is deliberately not one combined regex, so the precedence order is
//! visible in code.

/// Which conversion pipeline a Hive transfer's memo selects
/// (SPEC_FULL.md §6.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoRoute {
    /// Memo decodes as (or resolves to) a Lightning pay request or address.
    PayLightning,
    /// `#paywithsats` — pay using the customer's prior Keepsats balance
    /// rather than the value of this transfer.
    PayWithKeepsats,
    /// `#hbd` — route the deposit to HBD rather than the transfer's native
    /// unit.
    DepositAsHbd,
    /// `#convertkeepsats` — withdraw an existing Keepsats balance as Hive.
    ConvertKeepsatsToHive,
    /// `#sats` or a memo that otherwise looks like a deposit request —
    /// route to Keepsats.
    DepositAsKeepsats,
    /// No recognized marker; the transfer is a plain top-up with no routing
    /// instruction attached.
    PlainDeposit,
}

struct Pattern {
    route: MemoRoute,
    matches: fn(&str) -> bool,
}

/// Ordered precedence list of memo patterns. Order matters: a memo
/// containing both `#paywithsats` and a pay request is routed to
/// `PayWithKeepsats` because that marker is checked first, reflecting that
/// it changes *how* the Lightning payment is funded, not *whether* one
/// happens.
fn patterns() -> &'static [Pattern] {
    const TABLE: &[Pattern] = &[
        Pattern {
            route: MemoRoute::PayWithKeepsats,
            matches: |m| contains_ci(m, "#paywithsats"),
        },
        Pattern {
            route: MemoRoute::ConvertKeepsatsToHive,
            matches: |m| contains_ci(m, "#convertkeepsats"),
        },
        Pattern {
            route: MemoRoute::PayLightning,
            matches: looks_like_lightning,
        },
        Pattern {
            route: MemoRoute::DepositAsHbd,
            matches: |m| contains_ci(m, "#hbd"),
        },
        Pattern {
            route: MemoRoute::DepositAsKeepsats,
            matches: |m| contains_ci(m, "#sats") || starts_with_ci(m, "sats"),
        },
    ];
    TABLE
}

fn contains_ci(memo: &str, needle: &str) -> bool {
    memo.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

fn starts_with_ci(memo: &str, needle: &str) -> bool {
    memo.trim()
        .to_ascii_lowercase()
        .starts_with(&needle.to_ascii_lowercase())
}

fn looks_like_lightning(memo: &str) -> bool {
    let m = memo.trim();
    let m = m.strip_prefix("lightning:").unwrap_or(m);
    let lower = m.to_ascii_lowercase();
    lower.starts_with("lnbc")
        || lower.starts_with("lntb")
        || lower.starts_with("lnurl")
        || (m.contains('@') && !m.contains(' '))
}

pub struct MemoClassifier;

impl MemoClassifier {
    /// Classifies `memo` by walking the precedence table top to bottom and
    /// returning the first match, or [`MemoRoute::PlainDeposit`] if none
    /// apply.
    pub fn classify(memo: &str) -> MemoRoute {
        for pattern in patterns() {
            if (pattern.matches)(memo) {
                return pattern.route;
            }
        }
        MemoRoute::PlainDeposit
    }

    /// Strips a leading `lightning:` URI scheme prefix, per SPEC_FULL.md
    /// §6.3.
    pub fn strip_lightning_prefix(input: &str) -> &str {
        input.trim().strip_prefix("lightning:").unwrap_or(input.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pay_requests() {
        assert_eq!(
            MemoClassifier::classify("lnbc1000n1p..."),
            MemoRoute::PayLightning
        );
        assert_eq!(
            MemoClassifier::classify("lightning:lnbc1000n1p..."),
            MemoRoute::PayLightning
        );
        assert_eq!(
            MemoClassifier::classify("alice@getalby.com"),
            MemoRoute::PayLightning
        );
    }

    #[test]
    fn classifies_keepsats_and_hbd_markers() {
        assert_eq!(
            MemoClassifier::classify("deposit for bob #sats"),
            MemoRoute::DepositAsKeepsats
        );
        assert_eq!(MemoClassifier::classify("#HBD please"), MemoRoute::DepositAsHbd);
    }

    #[test]
    fn paywithsats_takes_precedence_over_pay_request() {
        assert_eq!(
            MemoClassifier::classify("#paywithsats lnbc1000n1p..."),
            MemoRoute::PayWithKeepsats
        );
    }

    #[test]
    fn unrecognized_memo_is_plain_deposit() {
        assert_eq!(MemoClassifier::classify("thanks!"), MemoRoute::PlainDeposit);
    }
}
