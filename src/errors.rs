use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, MemberId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount: {value}")]
    InvalidAmount {
        value: String,
    },

    #[error("member {member_id} already has an open loan")]
    DuplicateActiveLoan {
        member_id: MemberId,
    },

    #[error("savings below minimum: balance {balance}, minimum {minimum}")]
    BelowMinimumSavings {
        balance: Money,
        minimum: Money,
    },

    #[error("amount exceeds loan limit: limit {limit}, requested {requested}")]
    AmountExceedsLimit {
        limit: Money,
        requested: Money,
    },

    #[error("repayment less than minimum: minimum {minimum}, provided {provided}")]
    BelowMinimumRepayment {
        minimum: Money,
        provided: Money,
    },

    #[error("repayment exceeds outstanding: outstanding {outstanding}, provided {provided}")]
    ExceedsOutstanding {
        outstanding: Money,
        provided: Money,
    },

    #[error("loan not active: current status is {status:?}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl LedgerError {
    /// true for failures detected before anything was written
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::Persistence(_))
    }
}

/// failures reported by the persistence collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record not found: {id}")]
    NotFound {
        id: Uuid,
    },

    #[error("duplicate record: {id}")]
    Duplicate {
        id: Uuid,
    },

    #[error("member {member_id} already has an open loan {loan_id}")]
    OpenLoanExists {
        member_id: MemberId,
        loan_id: LoanId,
    },

    #[error("conflicting update on loan {loan_id}: expected outstanding {expected}, found {found}")]
    Conflict {
        loan_id: LoanId,
        expected: Money,
        found: Money,
    },

    #[error("loan {loan_id} is {found:?}, expected {expected:?}")]
    UnexpectedStatus {
        loan_id: LoanId,
        expected: LoanStatus,
        found: LoanStatus,
    },

    #[error("backend unavailable: {message}")]
    Unavailable {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;
