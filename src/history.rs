use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::loan::{Loan, RepaymentEntry};
use crate::savings::SavingsEntry;
use crate::types::{LoanStatus, TransactionType};

/// kind of line in a member's transaction history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Savings,
    LoanIssued,
    LoanRepayment,
}

/// history tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFilter {
    #[default]
    All,
    Savings,
    Loans,
}

impl HistoryFilter {
    pub fn matches(&self, kind: HistoryKind) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::Savings => kind == HistoryKind::Savings,
            HistoryFilter::Loans => {
                matches!(kind, HistoryKind::LoanIssued | HistoryKind::LoanRepayment)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// unique across kinds, e.g. `savings_<uuid>`
    pub id: String,
    pub kind: HistoryKind,
    pub date: DateTime<Utc>,
    pub amount: Money,
    pub title: String,
}

fn savings_title(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Deposit => "Savings Deposit",
        TransactionType::LoanDisbursement => "Loan Disbursement",
        TransactionType::InterestEarned => "Interest Earned",
    }
}

/// merge savings, loans and repayments into one list, newest first
///
/// Pending applications are left out until they are issued.
pub fn build_history(
    savings: &[SavingsEntry],
    loans: &[Loan],
    repayments: &[RepaymentEntry],
    filter: HistoryFilter,
) -> Vec<HistoryItem> {
    let savings_items = savings.iter().map(|e| HistoryItem {
        id: format!("savings_{}", e.id),
        kind: HistoryKind::Savings,
        date: e.date,
        amount: e.amount,
        title: savings_title(e.transaction_type).to_string(),
    });

    let loan_items = loans
        .iter()
        .filter(|l| l.status != LoanStatus::Pending)
        .map(|l| HistoryItem {
            id: format!("loan_{}", l.id),
            kind: HistoryKind::LoanIssued,
            date: l.start_date.unwrap_or(l.created_at),
            amount: l.principal,
            title: "Loan Received".to_string(),
        });

    let repayment_items = repayments.iter().map(|r| HistoryItem {
        id: format!("loan_repayment_{}", r.id),
        kind: HistoryKind::LoanRepayment,
        date: r.date,
        amount: r.amount,
        title: if r.is_final_payment {
            "Final Loan Repayment".to_string()
        } else {
            "Loan Repayment".to_string()
        },
    });

    let mut items: Vec<HistoryItem> = savings_items
        .chain(loan_items)
        .chain(repayment_items)
        .filter(|item| filter.matches(item.kind))
        .collect();

    // stable, so same-instant items keep savings/loan/repayment order
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items
}

/// group an already sorted history by calendar day, keeping its order
pub fn group_by_date(items: &[HistoryItem]) -> Vec<(NaiveDate, Vec<HistoryItem>)> {
    let mut groups: Vec<(NaiveDate, Vec<HistoryItem>)> = Vec::new();

    for item in items {
        let day = item.date.date_naive();
        match groups.last_mut() {
            Some((current, bucket)) if *current == day => bucket.push(item.clone()),
            _ => groups.push((day, vec![item.clone()])),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerSettings;
    use crate::ledger::{LoanLedger, LoanRequest};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
    }

    struct Fixture {
        savings: Vec<SavingsEntry>,
        loans: Vec<Loan>,
        repayments: Vec<RepaymentEntry>,
    }

    fn fixture() -> Fixture {
        let member = Uuid::new_v4();
        let ledger = LoanLedger::new(LedgerSettings::default()).unwrap();

        let savings = vec![
            SavingsEntry::deposit(member, Money::from_major(100), at(1, 5, 9), None).unwrap(),
            SavingsEntry::deposit(member, Money::from_major(150), at(1, 20, 9), None).unwrap(),
        ];

        let loan = ledger
            .apply_for_loan(
                LoanRequest::new(member, Money::from_major(500), 5),
                Money::from_major(250),
                false,
                at(2, 1, 10),
            )
            .unwrap()
            .loan;
        let outcome = ledger.process_repayment(&loan, Money::from_major(115), at(3, 1, 10)).unwrap();

        let pending = ledger
            .submit_application(
                LoanRequest::new(member, Money::from_major(100), 2),
                Money::from_major(250),
                false,
                at(3, 2, 10),
            )
            .unwrap();

        Fixture {
            savings,
            loans: vec![loan, pending],
            repayments: vec![outcome.repayment],
        }
    }

    #[test]
    fn test_history_is_newest_first() {
        let f = fixture();
        let items = build_history(&f.savings, &f.loans, &f.repayments, HistoryFilter::All);

        let kinds: Vec<HistoryKind> = items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                HistoryKind::LoanRepayment,
                HistoryKind::LoanIssued,
                HistoryKind::Savings,
                HistoryKind::Savings,
            ]
        );
        assert!(items.windows(2).all(|w| w[0].date >= w[1].date));
        assert!(items[0].id.starts_with("loan_repayment_"));
        assert_eq!(items[1].title, "Loan Received");
    }

    #[test]
    fn test_history_filters() {
        let f = fixture();

        let savings = build_history(&f.savings, &f.loans, &f.repayments, HistoryFilter::Savings);
        assert_eq!(savings.len(), 2);
        assert!(savings.iter().all(|i| i.kind == HistoryKind::Savings));

        let loans = build_history(&f.savings, &f.loans, &f.repayments, HistoryFilter::Loans);
        assert_eq!(loans.len(), 2);
        assert!(loans.iter().all(|i| i.kind != HistoryKind::Savings));
    }

    #[test]
    fn test_group_by_date() {
        let member = Uuid::new_v4();
        let savings = vec![
            SavingsEntry::deposit(member, Money::from_major(10), at(4, 1, 8), None).unwrap(),
            SavingsEntry::deposit(member, Money::from_major(20), at(4, 1, 17), None).unwrap(),
            SavingsEntry::deposit(member, Money::from_major(30), at(4, 3, 8), None).unwrap(),
        ];

        let items = build_history(&savings, &[], &[], HistoryFilter::All);
        let groups = group_by_date(&items);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].amount, Money::from_major(20));
    }
}
