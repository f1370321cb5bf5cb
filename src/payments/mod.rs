pub mod amortization;

use crate::decimal::{Money, SETTLEMENT_TOLERANCE};
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::LoanId;

pub use amortization::{
    add_months, InstallmentSchedule, LoanTerms, PaymentSplit, ScheduledInstallment,
};

/// balances a repayment is checked against
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentContext {
    pub loan_id: LoanId,
    pub outstanding: Money,
    pub minimum_repayment: Money,
}

/// accepted repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentCheck {
    pub is_final_payment: bool,
    /// amount to apply; a final payment settles exactly the outstanding
    /// balance even when the tendered figure is off by rounding noise
    pub amount_applied: Money,
}

impl RepaymentContext {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            loan_id: loan.id,
            outstanding: loan.outstanding_amount,
            minimum_repayment: loan.monthly_repayment,
        }
    }

    pub fn is_final_payment(&self, amount: Money) -> bool {
        amount.approx_eq(self.outstanding, SETTLEMENT_TOLERANCE)
    }

    pub fn validate_payment(&self, amount: Money) -> Result<RepaymentCheck> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                value: amount.to_string(),
            });
        }

        let is_final_payment = self.is_final_payment(amount);

        if !is_final_payment && amount < self.minimum_repayment {
            return Err(LedgerError::BelowMinimumRepayment {
                minimum: self.minimum_repayment,
                provided: amount,
            });
        }

        // outside the tolerance band anything above the balance would drive
        // it negative
        if !is_final_payment && amount > self.outstanding {
            return Err(LedgerError::ExceedsOutstanding {
                outstanding: self.outstanding,
                provided: amount,
            });
        }

        Ok(RepaymentCheck {
            is_final_payment,
            amount_applied: if is_final_payment { self.outstanding } else { amount },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn context(outstanding: &str, minimum: &str) -> RepaymentContext {
        RepaymentContext {
            loan_id: Uuid::new_v4(),
            outstanding: Money::from_str_exact(outstanding).unwrap(),
            minimum_repayment: Money::from_str_exact(minimum).unwrap(),
        }
    }

    #[test]
    fn test_repayment_validation() {
        let context = context("1150", "115");

        // test zero and negative payment
        assert!(matches!(context.validate_payment(Money::ZERO), Err(LedgerError::InvalidAmount { .. })));
        assert!(matches!(context.validate_payment(Money::from_major(-1)), Err(LedgerError::InvalidAmount { .. })));

        // test below minimum
        assert!(matches!(
            context.validate_payment(Money::from_major(100)),
            Err(LedgerError::BelowMinimumRepayment { .. })
        ));

        // test above outstanding
        assert!(matches!(
            context.validate_payment(Money::from_major(1_200)),
            Err(LedgerError::ExceedsOutstanding { .. })
        ));

        // test regular installment
        let check = context.validate_payment(Money::from_major(115)).unwrap();
        assert!(!check.is_final_payment);
        assert_eq!(check.amount_applied, Money::from_major(115));

        // test full settlement
        let check = context.validate_payment(Money::from_major(1_150)).unwrap();
        assert!(check.is_final_payment);
    }

    #[test]
    fn test_final_payment_below_minimum_is_accepted() {
        let context = context("40", "115");
        let check = context.validate_payment(Money::from_major(40)).unwrap();
        assert!(check.is_final_payment);
        assert_eq!(check.amount_applied, Money::from_major(40));
    }

    #[test]
    fn test_rounding_noise_settles_exact_outstanding() {
        let context = context("383.33333334", "383.33333333");

        let over = context.validate_payment(Money::from_str_exact("383.3338").unwrap()).unwrap();
        assert!(over.is_final_payment);
        assert_eq!(over.amount_applied, context.outstanding);

        let under = context.validate_payment(Money::from_str_exact("383.333").unwrap()).unwrap();
        assert!(under.is_final_payment);
        assert_eq!(under.amount_applied, context.outstanding);
    }

    #[test]
    fn test_tolerance_boundary() {
        let context = context("200", "115");

        let just_inside = context.validate_payment(Money::from_str_exact("200.0009").unwrap()).unwrap();
        assert!(just_inside.is_final_payment);

        // exactly one tolerance over is no longer a settlement
        assert!(matches!(
            context.validate_payment(Money::from_str_exact("200.001").unwrap()),
            Err(LedgerError::ExceedsOutstanding { .. })
        ));
        assert!(matches!(
            context.validate_payment(Money::from_str_exact("200.0011").unwrap()),
            Err(LedgerError::ExceedsOutstanding { .. })
        ));
    }
}
