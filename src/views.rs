/// serialization support for member dashboards
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LedgerSettings;
use crate::decimal::Money;
use crate::errors::Result;
use crate::ledger::{compute_eligibility, Eligibility};
use crate::loan::{Loan, RepaymentEntry, RepaymentProgress};
use crate::payments::InstallmentSchedule;
use crate::savings::{member_balance, SavingsEntry};
use crate::types::{LoanId, LoanStatus, MemberId};

/// serializable view of a single loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub status: LoanStatus,
    pub purpose: Option<String>,
    pub principal: Money,
    pub interest_rate_percent: Decimal,
    pub term_months: u32,
    pub monthly_repayment: Money,
    pub total_repayment: Money,
    pub outstanding_amount: Money,
    pub amount_repaid: Money,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub next_installment_due: Option<DateTime<Utc>>,
}

impl LoanView {
    /// `as_of` picks the next scheduled installment for active loans
    pub fn from_loan(loan: &Loan, as_of: DateTime<Utc>) -> Self {
        let next_installment_due = if loan.is_active() {
            InstallmentSchedule::generate(loan)
                .ok()
                .and_then(|s| s.next_due(as_of).map(|i| i.due_date))
        } else {
            None
        };

        LoanView {
            id: loan.id,
            status: loan.status,
            purpose: loan.purpose.clone(),
            principal: loan.principal,
            interest_rate_percent: loan.interest_rate_percent(),
            term_months: loan.term_months,
            monthly_repayment: loan.monthly_repayment,
            total_repayment: loan.total_repayment,
            outstanding_amount: loan.outstanding_amount,
            amount_repaid: loan.amount_repaid(),
            start_date: loan.start_date,
            due_date: loan.due_date,
            next_installment_due,
        }
    }
}

/// what a member sees on their dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummaryView {
    pub member_id: MemberId,
    pub savings_balance: Money,
    pub eligibility: Eligibility,
    pub loan: Option<LoanView>,
    pub progress: Option<RepaymentProgress>,
}

impl MemberSummaryView {
    pub fn build(
        member_id: MemberId,
        savings: &[SavingsEntry],
        open_loan: Option<&Loan>,
        repayments: &[RepaymentEntry],
        settings: &LedgerSettings,
        as_of: DateTime<Utc>,
    ) -> Result<Self> {
        let balance = member_balance(savings, member_id)?;

        Ok(MemberSummaryView {
            member_id,
            savings_balance: balance,
            eligibility: compute_eligibility(balance, settings)?,
            loan: open_loan.map(|l| LoanView::from_loan(l, as_of)),
            progress: open_loan
                .filter(|l| l.is_active())
                .map(|l| RepaymentProgress::from_repayments(l, repayments)),
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LoanLedger, LoanRequest};
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_summary_without_loan() {
        let member = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let savings = vec![
            SavingsEntry::deposit(member, Money::from_major(120), now, None).unwrap(),
            SavingsEntry::deposit(Uuid::new_v4(), Money::from_major(999), now, None).unwrap(),
        ];

        let view = MemberSummaryView::build(member, &savings, None, &[], &LedgerSettings::default(), now).unwrap();

        assert_eq!(view.savings_balance, Money::from_major(120));
        assert!(view.eligibility.eligible);
        assert_eq!(view.eligibility.max_loan_amount, Money::from_major(360));
        assert!(view.loan.is_none());
        assert!(view.progress.is_none());
    }

    #[test]
    fn test_summary_with_active_loan() {
        let member = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let ledger = LoanLedger::new(LedgerSettings::default()).unwrap();
        let loan = ledger
            .apply_for_loan(
                LoanRequest::new(member, Money::from_major(1_000), 10),
                Money::from_major(1_000),
                false,
                start,
            )
            .unwrap()
            .loan;
        let as_of = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let outcome = ledger.process_repayment(&loan, Money::from_major(230), as_of).unwrap();

        let savings = vec![SavingsEntry::deposit(member, Money::from_major(1_000), start, None).unwrap()];
        let view = MemberSummaryView::build(
            member,
            &savings,
            Some(&outcome.updated_loan),
            &[outcome.repayment.clone()],
            &LedgerSettings::default(),
            as_of,
        )
        .unwrap();

        let loan_view = view.loan.as_ref().unwrap();
        assert_eq!(loan_view.outstanding_amount, Money::from_major(920));
        assert_eq!(loan_view.amount_repaid, Money::from_major(230));
        assert_eq!(loan_view.interest_rate_percent, Decimal::from(15));
        // Feb 29, Mar 31, ... clamped from the 31st
        assert_eq!(
            loan_view.next_installment_due,
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap())
        );

        let progress = view.progress.as_ref().unwrap();
        assert_eq!(progress.total_paid, Money::from_major(230));
        assert_eq!(progress.payment_count, 1);

        let json = view.to_json_pretty().unwrap();
        assert!(json.contains("\"status\": \"active\""));
    }
}
