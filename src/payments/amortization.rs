use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::LoanId;

/// flat-rate terms fixed when a loan is issued
///
/// Interest is charged once on the principal for the whole term and the
/// total is spread evenly over the months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub total_repayment: Money,
    pub monthly_repayment: Money,
}

impl LoanTerms {
    pub fn flat(principal: Money, interest_rate: Rate, term_months: u32) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LedgerError::InvalidAmount {
                value: principal.to_string(),
            });
        }

        if term_months == 0 {
            return Err(LedgerError::InvalidAmount {
                value: format!("term of {} months", term_months),
            });
        }

        let total_repayment = principal
            .checked_mul(interest_rate.gross_factor())
            .ok_or_else(|| LedgerError::InvalidAmount {
                value: principal.to_string(),
            })?;
        let monthly_repayment = total_repayment / Decimal::from(term_months);

        Ok(Self {
            principal,
            interest_rate,
            term_months,
            total_repayment,
            monthly_repayment,
        })
    }

    /// interest charged over the whole term
    pub fn total_interest(&self) -> Money {
        self.total_repayment - self.principal
    }
}

/// principal/interest split of a single payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentSplit {
    pub principal_portion: Money,
    pub interest_portion: Money,
}

impl PaymentSplit {
    /// split under the flat-rate convention
    ///
    /// Every payment carries the same share of interest as the loan total,
    /// `rate / (1 + rate)`, regardless of how much principal is left.
    pub fn flat(amount: Money, interest_rate: Rate) -> Self {
        let interest_portion = Money::from_decimal(
            amount.as_decimal() * interest_rate.as_decimal() / interest_rate.gross_factor(),
        );
        let principal_portion = amount - interest_portion;

        Self {
            principal_portion,
            interest_portion,
        }
    }

    pub fn total(&self) -> Money {
        self.principal_portion + self.interest_portion
    }
}

/// add calendar months, clamping to the last day of a shorter month
pub fn add_months(date: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::InvalidDate {
            message: format!("{} plus {} months is out of range", date, months),
        })
}

/// one expected installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub installment_number: u32,
    pub due_date: DateTime<Utc>,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
}

/// expected monthly installments for an issued loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub loan_id: LoanId,
    pub start_date: DateTime<Utc>,
    pub installments: Vec<ScheduledInstallment>,
    pub total_payment: Money,
    pub total_interest: Money,
}

impl InstallmentSchedule {
    /// generate the schedule from the loan's own terms
    ///
    /// The last installment absorbs rounding so that the installments sum to
    /// the loan's total repayment exactly.
    pub fn generate(loan: &Loan) -> Result<Self> {
        let start_date = loan.start_date.ok_or_else(|| LedgerError::InvalidState {
            current: loan.status.as_str().to_string(),
            expected: "issued loan with a start date".to_string(),
        })?;

        if loan.term_months == 0 {
            return Err(LedgerError::InvalidAmount {
                value: format!("term of {} months", loan.term_months),
            });
        }

        let mut installments = Vec::with_capacity(loan.term_months as usize);
        let mut balance = loan.total_repayment;

        for i in 1..=loan.term_months {
            let due_date = add_months(start_date, i)?;
            let payment_amount = if i == loan.term_months {
                balance
            } else {
                loan.monthly_repayment.min(balance)
            };
            let split = PaymentSplit::flat(payment_amount, loan.interest_rate);
            let ending_balance = balance - payment_amount;

            installments.push(ScheduledInstallment {
                installment_number: i,
                due_date,
                beginning_balance: balance,
                payment_amount,
                principal_portion: split.principal_portion,
                interest_portion: split.interest_portion,
                ending_balance,
            });

            balance = ending_balance;
        }

        let total_payment: Money = installments.iter().map(|p| p.payment_amount).sum();
        let total_interest: Money = installments.iter().map(|p| p.interest_portion).sum();

        Ok(Self {
            loan_id: loan.id,
            start_date,
            installments,
            total_payment,
            total_interest,
        })
    }

    /// get installment by its 1-based number
    pub fn get_installment(&self, installment_number: u32) -> Option<&ScheduledInstallment> {
        installment_number
            .checked_sub(1)
            .and_then(|i| self.installments.get(i as usize))
    }

    /// first installment due on or after `date`
    pub fn next_due(&self, date: DateTime<Utc>) -> Option<&ScheduledInstallment> {
        self.installments.iter().find(|p| p.due_date >= date)
    }
}
