use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loan::{Loan, RepaymentEntry};
use crate::payments::{add_months, LoanTerms, PaymentSplit, RepaymentContext};
use crate::savings::SavingsEntry;
use crate::types::{LoanStatus, MemberId};

/// how much a member may borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub max_loan_amount: Money,
}

/// eligibility of a savings balance under the given policy
///
/// Fails with `InvalidAmount` if the limit does not fit in a `Money`.
pub fn compute_eligibility(savings_balance: Money, settings: &LedgerSettings) -> Result<Eligibility> {
    let eligible = savings_balance >= settings.min_required_savings;
    let max_loan_amount = if eligible {
        savings_balance
            .checked_mul(settings.max_loan_multiplier)
            .ok_or_else(|| LedgerError::InvalidAmount {
                value: savings_balance.to_string(),
            })?
    } else {
        Money::ZERO
    };

    Ok(Eligibility {
        eligible,
        max_loan_amount,
    })
}

/// loan application as submitted by a member
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRequest {
    pub member_id: MemberId,
    pub amount: Money,
    pub term_months: u32,
    pub purpose: Option<String>,
}

impl LoanRequest {
    pub fn new(member_id: MemberId, amount: Money, term_months: u32) -> Self {
        Self {
            member_id,
            amount,
            term_months,
            purpose: None,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// build a request from form text
    ///
    /// Only well-formedness is checked here; a zero or negative amount is
    /// left for the ledger to reject after the eligibility checks.
    pub fn parse(member_id: MemberId, amount: &str, term_months: &str) -> Result<Self> {
        let amount = Money::parse_amount(amount)?;
        let term_months = parse_term(term_months)?;
        Ok(Self::new(member_id, amount, term_months))
    }
}

/// parse a loan term in whole months
pub fn parse_term(input: &str) -> Result<u32> {
    let invalid = || LedgerError::InvalidAmount {
        value: format!("term of {:?} months", input),
    };

    let months: i64 = input.trim().parse().map_err(|_| invalid())?;
    if months <= 0 {
        return Err(invalid());
    }
    u32::try_from(months).map_err(|_| invalid())
}

/// loan ready to be persisted, with its optional disbursement entry
#[derive(Debug, Clone, PartialEq)]
pub struct LoanIssue {
    pub loan: Loan,
    pub disbursement: Option<SavingsEntry>,
}

/// writes produced by one repayment; they must be persisted together
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentOutcome {
    pub updated_loan: Loan,
    pub repayment: RepaymentEntry,
    /// interest redistributed to the borrower's own savings
    pub interest_credit: Option<SavingsEntry>,
}

/// loan lifecycle and repayment calculations
///
/// Holds only the policy it was built with. Every operation takes the
/// current records as values and returns new records for the caller to
/// persist; nothing here touches storage.
#[derive(Debug, Clone)]
pub struct LoanLedger {
    settings: LedgerSettings,
    record_disbursements: bool,
}

impl LoanLedger {
    pub fn new(settings: LedgerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            record_disbursements: false,
        })
    }

    /// also produce a `loan_disbursement` savings entry when a loan is issued
    pub fn with_disbursement_entries(mut self, enabled: bool) -> Self {
        self.record_disbursements = enabled;
        self
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn compute_eligibility(&self, savings_balance: Money) -> Result<Eligibility> {
        compute_eligibility(savings_balance, &self.settings)
    }

    /// validate an application and fix its terms
    fn check_application(
        &self,
        request: &LoanRequest,
        savings_balance: Money,
        has_open_loan: bool,
    ) -> Result<LoanTerms> {
        if has_open_loan {
            return Err(LedgerError::DuplicateActiveLoan {
                member_id: request.member_id,
            });
        }

        let eligibility = self.compute_eligibility(savings_balance)?;
        if !eligibility.eligible {
            return Err(LedgerError::BelowMinimumSavings {
                balance: savings_balance,
                minimum: self.settings.min_required_savings,
            });
        }

        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                value: request.amount.to_string(),
            });
        }
        request.amount.within_limit()?;

        if request.term_months == 0 {
            return Err(LedgerError::InvalidAmount {
                value: format!("term of {} months", request.term_months),
            });
        }

        if request.amount > eligibility.max_loan_amount {
            return Err(LedgerError::AmountExceedsLimit {
                limit: eligibility.max_loan_amount,
                requested: request.amount,
            });
        }

        let terms = LoanTerms::flat(
            request.amount,
            self.settings.interest_rate(),
            request.term_months,
        )?;

        debug!(
            member_id = %request.member_id,
            principal = %terms.principal,
            total_repayment = %terms.total_repayment,
            monthly_repayment = %terms.monthly_repayment,
            "loan terms computed"
        );

        Ok(terms)
    }

    fn build_loan(
        &self,
        request: LoanRequest,
        terms: LoanTerms,
        status: LoanStatus,
        created_at: DateTime<Utc>,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<Loan> {
        let due_date = match start_date {
            Some(start) => Some(add_months(start, terms.term_months)?),
            None => None,
        };

        Ok(Loan {
            id: Uuid::new_v4(),
            member_id: request.member_id,
            purpose: request.purpose,
            principal: terms.principal,
            term_months: terms.term_months,
            interest_rate: terms.interest_rate,
            monthly_repayment: terms.monthly_repayment,
            total_repayment: terms.total_repayment,
            outstanding_amount: terms.total_repayment,
            status,
            created_at,
            start_date,
            due_date,
        })
    }

    fn disbursement_for(&self, loan: &Loan, date: DateTime<Utc>) -> Option<SavingsEntry> {
        self.record_disbursements
            .then(|| SavingsEntry::loan_disbursement(loan.member_id, loan.id, loan.principal, date))
    }

    /// issue an active loan starting at `start_date`
    pub fn apply_for_loan(
        &self,
        request: LoanRequest,
        savings_balance: Money,
        has_active_loan: bool,
        start_date: DateTime<Utc>,
    ) -> Result<LoanIssue> {
        let terms = self.check_application(&request, savings_balance, has_active_loan)?;
        let loan = self.build_loan(request, terms, LoanStatus::Active, start_date, Some(start_date))?;
        let disbursement = self.disbursement_for(&loan, start_date);

        Ok(LoanIssue { loan, disbursement })
    }

    /// record an application that still needs approval
    ///
    /// Terms are fixed now; the start and due dates are set on approval.
    pub fn submit_application(
        &self,
        request: LoanRequest,
        savings_balance: Money,
        has_open_loan: bool,
        now: DateTime<Utc>,
    ) -> Result<Loan> {
        let terms = self.check_application(&request, savings_balance, has_open_loan)?;
        self.build_loan(request, terms, LoanStatus::Pending, now, None)
    }

    /// move a pending loan to active, starting its term at `now`
    pub fn approve(&self, loan: &Loan, now: DateTime<Utc>) -> Result<LoanIssue> {
        if loan.status != LoanStatus::Pending {
            return Err(LedgerError::InvalidState {
                current: loan.status.as_str().to_string(),
                expected: LoanStatus::Pending.as_str().to_string(),
            });
        }

        let mut approved = loan.clone();
        approved.status = LoanStatus::Active;
        approved.start_date = Some(now);
        approved.due_date = Some(add_months(now, loan.term_months)?);
        approved.outstanding_amount = loan.total_repayment;

        let disbursement = self.disbursement_for(&approved, now);

        Ok(LoanIssue {
            loan: approved,
            disbursement,
        })
    }

    /// apply a repayment to an active loan
    ///
    /// Uses the rate stored on the loan, not the current policy rate.
    pub fn process_repayment(
        &self,
        loan: &Loan,
        payment_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<RepaymentOutcome> {
        if loan.status != LoanStatus::Active {
            return Err(LedgerError::LoanNotActive {
                status: loan.status,
            });
        }

        let check = RepaymentContext::from_loan(loan).validate_payment(payment_amount)?;
        let split = PaymentSplit::flat(check.amount_applied, loan.interest_rate);

        let mut updated_loan = loan.clone();
        if check.is_final_payment {
            updated_loan.outstanding_amount = Money::ZERO;
            updated_loan.status = LoanStatus::Paid;
        } else {
            updated_loan.outstanding_amount = loan.outstanding_amount - check.amount_applied;
        }

        let repayment = RepaymentEntry {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            member_id: loan.member_id,
            amount: check.amount_applied,
            principal_portion: split.principal_portion,
            interest_portion: split.interest_portion,
            date: now,
            is_final_payment: check.is_final_payment,
        };

        let interest_credit = split.interest_portion.is_positive().then(|| {
            SavingsEntry::interest_earned(loan.member_id, loan.id, split.interest_portion, now)
        });

        debug!(
            loan_id = %loan.id,
            applied = %check.amount_applied,
            principal = %split.principal_portion,
            interest = %split.interest_portion,
            new_outstanding = %updated_loan.outstanding_amount,
            is_final = check.is_final_payment,
            "repayment computed"
        );

        Ok(RepaymentOutcome {
            updated_loan,
            repayment,
            interest_credit,
        })
    }
}
