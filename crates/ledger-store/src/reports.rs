//! Balance sheet and profit-and-loss reporting, grounded on SPEC_FULL.md
//! §4.D and on
//! `original_source/.../accounting/profit_and_loss.py`'s fixed-width
//! table layout, adapted from its dict-of-dicts shape into typed structs.

use crate::mongo::EntryFilter;
use crate::mongo::LedgerRepository;
use crate::mongo::LedgerRepositoryError;
use ledger_commons::Account;
use ledger_commons::AccountType;
use ledger_commons::Conversion;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// The running balance for one account, as of some point in time
/// (SPEC_FULL.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AccountBalance {
    #[serde(with = "time::serde::rfc3339")]
    pub as_of: OffsetDateTime,
    pub balance: Conversion,
}

/// Computes an account's running balance by folding every ledger entry that
/// touches it up to `as_of`, signed per [`Account::debit_sign`]/
/// [`Account::credit_sign`] (SPEC_FULL.md §4.D).
pub async fn account_balance(
    ledger: &LedgerRepository,
    account: &Account,
    as_of: OffsetDateTime,
) -> Result<AccountBalance, LedgerRepositoryError> {
    let filter = EntryFilter::default().account(account.clone()).until(as_of);
    let entries = ledger.find_entries(&filter).await?;

    let mut balance = Conversion::zero(ledger_commons::Currency::Msats, as_of);
    for entry in &entries {
        if let Some(signed) = entry.signed_conv_for(account) {
            balance = balance.add(&signed);
        }
    }
    Ok(AccountBalance { as_of, balance })
}

/// One row of the Revenue/Expense breakdown used by both the balance sheet
/// and the P&L report.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub account: Account,
    pub balance: Conversion,
}

#[derive(Debug, Clone)]
pub struct ProfitAndLoss {
    pub revenue: Vec<ReportRow>,
    pub expenses: Vec<ReportRow>,
    pub net_income: Conversion,
}

/// Builds a P&L report over every Revenue/Expense account touched since the
/// ledger's inception through `as_of` (SPEC_FULL.md §4.D,
/// `profit_and_loss.py`'s `generate_profit_and_loss_report`).
pub async fn profit_and_loss(
    ledger: &LedgerRepository,
    accounts: &[Account],
    as_of: OffsetDateTime,
) -> Result<ProfitAndLoss, LedgerRepositoryError> {
    let mut report = ProfitAndLoss {
        revenue: Vec::new(),
        expenses: Vec::new(),
        net_income: Conversion::zero(ledger_commons::Currency::Msats, as_of),
    };

    for account in accounts {
        let balance = account_balance(ledger, account, as_of).await?;
        match account.account_type {
            AccountType::Revenue => {
                report.net_income = report.net_income.add(&balance.balance);
                report.revenue.push(ReportRow {
                    account: account.clone(),
                    balance: balance.balance,
                });
            }
            AccountType::Expense => {
                report.net_income = report.net_income.sub(&balance.balance);
                report.expenses.push(ReportRow {
                    account: account.clone(),
                    balance: balance.balance,
                });
            }
            _ => {}
        }
    }

    Ok(report)
}

const MAX_WIDTH: usize = 126;

/// Renders a [`ProfitAndLoss`] as the same fixed-width text table
/// `profit_and_loss_printout` produces, one line per account plus section
/// totals.
pub fn profit_and_loss_printout(report: &ProfitAndLoss, as_of: OffsetDateTime) -> String {
    let mut out = Vec::new();
    out.push(format!("Profit and Loss Report for {as_of} UTC"));
    out.push("-".repeat(MAX_WIDTH));
    out.push(format!(
        "{:<40} {:<17} {:>10} {:>12} {:>12} {:>12} {:>12}",
        "Account", "Sub", "SATS", "msats", "HIVE", "HBD", "USD"
    ));
    out.push("-".repeat(MAX_WIDTH));

    out.push(String::new());
    out.push("Revenue".to_string());
    out.push("-".repeat(30));
    let mut revenue_total = Conversion::zero(ledger_commons::Currency::Msats, as_of);
    for row in &report.revenue {
        out.push(row_line(&row.account.name.to_string(), &row.account.sub, &row.balance));
        revenue_total = revenue_total.add(&row.balance);
    }
    out.push(row_line("   Total Revenue", "", &revenue_total));
    out.push("-".repeat(MAX_WIDTH));

    out.push(String::new());
    out.push("Expenses".to_string());
    out.push("-".repeat(30));
    let mut expense_total = Conversion::zero(ledger_commons::Currency::Msats, as_of);
    for row in &report.expenses {
        out.push(row_line(&row.account.name.to_string(), &row.account.sub, &row.balance));
        expense_total = expense_total.add(&row.balance);
    }
    out.push(row_line("   Total Expenses", "", &expense_total));
    out.push("-".repeat(MAX_WIDTH));

    out.push(String::new());
    out.push("Net Income".to_string());
    out.push("-".repeat(30));
    let label = if report.net_income.msats >= 0 {
        "   Total Net Income"
    } else {
        "   Total Net Loss"
    };
    out.push(row_line(label, "", &report.net_income));
    out.push("=".repeat(MAX_WIDTH));

    out.join("\n")
}

fn row_line(account: &str, sub: &str, conv: &Conversion) -> String {
    format!(
        "{:<40} {:<17} {:>10} {:>12} {:>12} {:>12} {:>12}",
        account, sub, conv.sats, conv.msats, conv.hive, conv.hbd, conv.usd
    )
}

/// A simple balance-sheet snapshot: total assets, liabilities, and equity,
/// grouped by [`AccountType`] (SPEC_FULL.md §4.D).
pub async fn balance_sheet(
    ledger: &LedgerRepository,
    accounts: &[Account],
    as_of: OffsetDateTime,
) -> Result<BTreeMap<AccountType, Conversion>, LedgerRepositoryError> {
    let mut totals: BTreeMap<AccountType, Conversion> = BTreeMap::new();
    for account in accounts {
        let balance = account_balance(ledger, account, as_of).await?;
        let entry = totals
            .entry(account.account_type)
            .or_insert_with(|| Conversion::zero(ledger_commons::Currency::Msats, as_of));
        *entry = entry.add(&balance.balance);
    }
    Ok(totals)
}
