use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{EntryId, LoanId, MemberId, TransactionType};

/// append-only savings ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub transaction_type: TransactionType,
    /// receipt or transfer reference supplied with a deposit
    pub proof_reference: Option<String>,
    pub related_loan_id: Option<LoanId>,
}

impl SavingsEntry {
    /// member contribution; the amount must be positive
    pub fn deposit(
        member_id: MemberId,
        amount: Money,
        date: DateTime<Utc>,
        proof_reference: Option<String>,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                value: amount.to_string(),
            });
        }
        amount.within_limit()?;

        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            amount,
            date,
            transaction_type: TransactionType::Deposit,
            proof_reference: proof_reference.filter(|p| !p.trim().is_empty()),
            related_loan_id: None,
        })
    }

    pub(crate) fn loan_disbursement(
        member_id: MemberId,
        loan_id: LoanId,
        amount: Money,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            amount,
            date,
            transaction_type: TransactionType::LoanDisbursement,
            proof_reference: None,
            related_loan_id: Some(loan_id),
        }
    }

    pub(crate) fn interest_earned(
        member_id: MemberId,
        loan_id: LoanId,
        amount: Money,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            amount,
            date,
            transaction_type: TransactionType::InterestEarned,
            proof_reference: None,
            related_loan_id: Some(loan_id),
        }
    }
}

/// savings balance: the sum of every entry given
///
/// Fails with `InvalidAmount` if the total does not fit in a `Money`.
pub fn savings_balance<'a, I>(entries: I) -> Result<Money>
where
    I: IntoIterator<Item = &'a SavingsEntry>,
{
    entries.into_iter().try_fold(Money::ZERO, |total, e| {
        total
            .checked_add(e.amount)
            .ok_or_else(|| LedgerError::InvalidAmount {
                value: e.amount.to_string(),
            })
    })
}

/// savings balance of one member out of a mixed list of entries
pub fn member_balance(entries: &[SavingsEntry], member_id: MemberId) -> Result<Money> {
    savings_balance(entries.iter().filter(|e| e.member_id == member_id))
}
