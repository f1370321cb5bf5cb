use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{EntryId, LoanId, LoanStatus, MemberId};

/// loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub member_id: MemberId,
    pub purpose: Option<String>,

    // terms fixed at issuance
    pub principal: Money,
    pub term_months: u32,
    pub interest_rate: Rate,
    pub monthly_repayment: Money,
    pub total_repayment: Money,

    // running balance
    pub outstanding_amount: Money,
    pub status: LoanStatus,

    // dates; unset while an application is pending
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// interest rate in percent, as stored on the loan row
    pub fn interest_rate_percent(&self) -> Decimal {
        self.interest_rate.as_percentage()
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn is_paid(&self) -> bool {
        self.status == LoanStatus::Paid
    }

    /// amount repaid so far according to the running balance
    pub fn amount_repaid(&self) -> Money {
        (self.total_repayment - self.outstanding_amount).max(Money::ZERO)
    }
}

/// one repayment against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentEntry {
    pub id: EntryId,
    pub loan_id: LoanId,
    pub member_id: MemberId,
    /// amount applied to the loan
    pub amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub date: DateTime<Utc>,
    pub is_final_payment: bool,
}

/// repayment progress as shown on a member's home screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentProgress {
    pub total_repayment: Money,
    pub total_paid: Money,
    pub remaining: Money,
    pub payment_count: usize,
    /// share of the total repaid, capped at 100
    pub progress_percent: Decimal,
}

impl RepaymentProgress {
    /// summarise the repayments recorded against `loan`
    ///
    /// Entries for other loans are ignored.
    pub fn from_repayments(loan: &Loan, repayments: &[RepaymentEntry]) -> Self {
        let own: Vec<&RepaymentEntry> = repayments
            .iter()
            .filter(|r| r.loan_id == loan.id)
            .collect();

        let total_paid: Money = own.iter().map(|r| r.amount).sum();
        let remaining = (loan.total_repayment - total_paid).max(Money::ZERO);

        let progress_percent = if loan.total_repayment.is_zero() {
            Decimal::ZERO
        } else {
            (total_paid.as_decimal() / loan.total_repayment.as_decimal() * Decimal::from(100))
                .min(Decimal::from(100))
                .round_dp(2)
        };

        Self {
            total_repayment: loan.total_repayment,
            total_paid,
            remaining,
            payment_count: own.len(),
            progress_percent,
        }
    }
}
