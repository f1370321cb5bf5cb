//! Persistence collaborator.
//!
//! The ledger computes records; a `LedgerStore` keeps them. Every write a
//! single operation produces goes through one store call so that a backend
//! can apply it inside one transaction.

use std::collections::HashMap;

use tracing::warn;

use crate::config::{LedgerSettings, SettingsHistory, SettingsVersion};
use crate::decimal::Money;
use crate::errors::{StoreError, StoreResult};
use crate::ledger::{LoanIssue, RepaymentOutcome};
use crate::loan::{Loan, RepaymentEntry};
use crate::savings::SavingsEntry;
use crate::types::{LoanId, LoanStatus, MemberId};

/// reads and writes the ledger needs from its backing tables
pub trait LedgerStore {
    /// every savings entry of a member, oldest first
    fn savings_for_member(&self, member_id: MemberId) -> StoreResult<Vec<SavingsEntry>>;

    /// the member's pending or active loan, if any
    fn open_loan_for_member(&self, member_id: MemberId) -> StoreResult<Option<Loan>>;

    fn loan(&self, loan_id: LoanId) -> StoreResult<Option<Loan>>;

    /// every loan of a member, oldest first
    fn loans_for_member(&self, member_id: MemberId) -> StoreResult<Vec<Loan>>;

    /// repayments of a loan ordered by date
    fn repayments_for_loan(&self, loan_id: LoanId) -> StoreResult<Vec<RepaymentEntry>>;

    /// most recently created settings row
    fn latest_settings(&self) -> StoreResult<Option<LedgerSettings>>;

    fn insert_settings(&mut self, version: SettingsVersion) -> StoreResult<()>;

    fn insert_savings(&mut self, entry: SavingsEntry) -> StoreResult<()>;

    /// insert a new loan with its disbursement entry
    ///
    /// Must refuse the write if the member already holds an open loan.
    fn create_loan(&mut self, issue: &LoanIssue) -> StoreResult<()>;

    /// replace a pending loan with its approved version
    fn activate_loan(&mut self, issue: &LoanIssue) -> StoreResult<()>;

    /// apply a repayment's writes all together or not at all
    ///
    /// The loan row is only updated if its outstanding amount still equals
    /// `expected_outstanding`; otherwise `Conflict` is returned and nothing
    /// is written.
    fn commit_repayment(
        &mut self,
        outcome: &RepaymentOutcome,
        expected_outstanding: Money,
    ) -> StoreResult<()>;
}

/// in-process store backed by plain collections
#[derive(Debug, Default)]
pub struct InMemoryStore {
    savings: Vec<SavingsEntry>,
    loans: HashMap<LoanId, Loan>,
    repayments: Vec<RepaymentEntry>,
    settings: SettingsHistory,
    unavailable: Option<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// make every subsequent call fail as if the backend were down
    pub fn set_unavailable(&mut self, reason: Option<String>) {
        self.unavailable = reason;
    }

    fn ensure_available(&self) -> StoreResult<()> {
        match &self.unavailable {
            Some(message) => Err(StoreError::Unavailable {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn open_loan(&self, member_id: MemberId) -> Option<&Loan> {
        self.loans
            .values()
            .find(|l| l.member_id == member_id && l.status.is_open())
    }

    pub fn savings_len(&self) -> usize {
        self.savings.len()
    }

    pub fn repayments_len(&self) -> usize {
        self.repayments.len()
    }
}

impl LedgerStore for InMemoryStore {
    fn savings_for_member(&self, member_id: MemberId) -> StoreResult<Vec<SavingsEntry>> {
        self.ensure_available()?;
        let mut entries: Vec<SavingsEntry> = self
            .savings
            .iter()
            .filter(|e| e.member_id == member_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    fn open_loan_for_member(&self, member_id: MemberId) -> StoreResult<Option<Loan>> {
        self.ensure_available()?;
        Ok(self.open_loan(member_id).cloned())
    }

    fn loan(&self, loan_id: LoanId) -> StoreResult<Option<Loan>> {
        self.ensure_available()?;
        Ok(self.loans.get(&loan_id).cloned())
    }

    fn loans_for_member(&self, member_id: MemberId) -> StoreResult<Vec<Loan>> {
        self.ensure_available()?;
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.created_at);
        Ok(loans)
    }

    fn repayments_for_loan(&self, loan_id: LoanId) -> StoreResult<Vec<RepaymentEntry>> {
        self.ensure_available()?;
        let mut entries: Vec<RepaymentEntry> = self
            .repayments
            .iter()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        entries.sort_by_key(|r| r.date);
        Ok(entries)
    }

    fn latest_settings(&self) -> StoreResult<Option<LedgerSettings>> {
        self.ensure_available()?;
        Ok(self.settings.latest().map(|v| v.settings.clone()))
    }

    fn insert_settings(&mut self, version: SettingsVersion) -> StoreResult<()> {
        self.ensure_available()?;
        self.settings.push(version);
        Ok(())
    }

    fn insert_savings(&mut self, entry: SavingsEntry) -> StoreResult<()> {
        self.ensure_available()?;
        if self.savings.iter().any(|e| e.id == entry.id) {
            return Err(StoreError::Duplicate { id: entry.id });
        }
        self.savings.push(entry);
        Ok(())
    }

    fn create_loan(&mut self, issue: &LoanIssue) -> StoreResult<()> {
        self.ensure_available()?;
        let loan = &issue.loan;

        if self.loans.contains_key(&loan.id) {
            return Err(StoreError::Duplicate { id: loan.id });
        }

        if let Some(open) = self.open_loan(loan.member_id) {
            warn!(member_id = %loan.member_id, open_loan = %open.id, "refusing second open loan");
            return Err(StoreError::OpenLoanExists {
                member_id: loan.member_id,
                loan_id: open.id,
            });
        }

        if let Some(entry) = &issue.disbursement {
            if self.savings.iter().any(|e| e.id == entry.id) {
                return Err(StoreError::Duplicate { id: entry.id });
            }
        }

        // all checks passed; apply both writes
        self.loans.insert(loan.id, loan.clone());
        if let Some(entry) = &issue.disbursement {
            self.savings.push(entry.clone());
        }
        Ok(())
    }

    fn activate_loan(&mut self, issue: &LoanIssue) -> StoreResult<()> {
        self.ensure_available()?;
        let loan = &issue.loan;

        let current = self
            .loans
            .get(&loan.id)
            .ok_or(StoreError::NotFound { id: loan.id })?;

        if current.status != LoanStatus::Pending {
            return Err(StoreError::UnexpectedStatus {
                loan_id: loan.id,
                expected: LoanStatus::Pending,
                found: current.status,
            });
        }

        if let Some(entry) = &issue.disbursement {
            if self.savings.iter().any(|e| e.id == entry.id) {
                return Err(StoreError::Duplicate { id: entry.id });
            }
        }

        // all checks passed; apply both writes
        self.loans.insert(loan.id, loan.clone());
        if let Some(entry) = &issue.disbursement {
            self.savings.push(entry.clone());
        }
        Ok(())
    }

    fn commit_repayment(
        &mut self,
        outcome: &RepaymentOutcome,
        expected_outstanding: Money,
    ) -> StoreResult<()> {
        self.ensure_available()?;
        let loan_id = outcome.updated_loan.id;

        let current = self
            .loans
            .get(&loan_id)
            .ok_or(StoreError::NotFound { id: loan_id })?;

        if current.status != LoanStatus::Active {
            return Err(StoreError::UnexpectedStatus {
                loan_id,
                expected: LoanStatus::Active,
                found: current.status,
            });
        }

        if current.outstanding_amount != expected_outstanding {
            warn!(
                loan_id = %loan_id,
                expected = %expected_outstanding,
                found = %current.outstanding_amount,
                "stale repayment rejected"
            );
            return Err(StoreError::Conflict {
                loan_id,
                expected: expected_outstanding,
                found: current.outstanding_amount,
            });
        }

        if self.repayments.iter().any(|r| r.id == outcome.repayment.id) {
            return Err(StoreError::Duplicate {
                id: outcome.repayment.id,
            });
        }

        // all checks passed; apply the three writes together
        self.repayments.push(outcome.repayment.clone());
        self.loans.insert(loan_id, outcome.updated_loan.clone());
        if let Some(credit) = &outcome.interest_credit {
            self.savings.push(credit.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LoanLedger, LoanRequest};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn issue_for(member_id: MemberId) -> LoanIssue {
        LoanLedger::new(LedgerSettings::default())
            .unwrap()
            .with_disbursement_entries(true)
            .apply_for_loan(
                LoanRequest::new(member_id, Money::from_major(1_000), 10),
                Money::from_major(1_000),
                false,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_create_loan_enforces_single_open_loan() {
        let mut store = InMemoryStore::new();
        let member = Uuid::new_v4();

        store.create_loan(&issue_for(member)).unwrap();
        assert_eq!(store.savings_len(), 1);

        let second = store.create_loan(&issue_for(member));
        assert!(matches!(second, Err(StoreError::OpenLoanExists { .. })));
        // the refused disbursement is not written either
        assert_eq!(store.savings_len(), 1);

        // other members are unaffected
        store.create_loan(&issue_for(Uuid::new_v4())).unwrap();
    }

    #[test]
    fn test_activate_refuses_duplicate_disbursement() {
        let mut store = InMemoryStore::new();
        let member = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ledger = LoanLedger::new(LedgerSettings::default())
            .unwrap()
            .with_disbursement_entries(true);

        let pending = ledger
            .submit_application(
                LoanRequest::new(member, Money::from_major(500), 5),
                Money::from_major(500),
                false,
                now,
            )
            .unwrap();
        store
            .create_loan(&LoanIssue {
                loan: pending.clone(),
                disbursement: None,
            })
            .unwrap();

        let issue = ledger.approve(&pending, now).unwrap();
        let entry = issue.disbursement.clone().unwrap();
        store.insert_savings(entry).unwrap();

        assert_eq!(
            store.activate_loan(&issue),
            Err(StoreError::Duplicate { id: issue.disbursement.as_ref().unwrap().id })
        );
        // the loan stays pending and no second entry is written
        assert_eq!(store.loan(pending.id).unwrap().unwrap().status, LoanStatus::Pending);
        assert_eq!(store.savings_len(), 1);
    }

    #[test]
    fn test_commit_repayment_is_all_or_nothing() {
        let mut store = InMemoryStore::new();
        let member = Uuid::new_v4();
        let issue = issue_for(member);
        store.create_loan(&issue).unwrap();

        let ledger = LoanLedger::new(LedgerSettings::default()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let first = ledger.process_repayment(&issue.loan, Money::from_major(115), now).unwrap();
        let racing = ledger.process_repayment(&issue.loan, Money::from_major(230), now).unwrap();

        store.commit_repayment(&first, issue.loan.outstanding_amount).unwrap();
        assert_eq!(store.repayments_len(), 1);

        // computed against the same stale balance
        let err = store.commit_repayment(&racing, issue.loan.outstanding_amount).unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                loan_id: issue.loan.id,
                expected: Money::from_major(1_150),
                found: Money::from_major(1_035),
            }
        );
        assert_eq!(store.repayments_len(), 1);
        assert_eq!(store.savings_len(), 2); // disbursement + first interest credit

        let stored = store.loan(issue.loan.id).unwrap().unwrap();
        assert_eq!(stored.outstanding_amount, Money::from_major(1_035));
    }

    #[test]
    fn test_unavailable_backend_writes_nothing() {
        let mut store = InMemoryStore::new();
        let issue = issue_for(Uuid::new_v4());
        store.create_loan(&issue).unwrap();

        let ledger = LoanLedger::new(LedgerSettings::default()).unwrap();
        let outcome = ledger
            .process_repayment(&issue.loan, Money::from_major(115), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
            .unwrap();

        store.set_unavailable(Some("connection reset".to_string()));
        assert!(matches!(
            store.commit_repayment(&outcome, issue.loan.outstanding_amount),
            Err(StoreError::Unavailable { .. })
        ));

        store.set_unavailable(None);
        assert_eq!(store.repayments_len(), 0);
        assert_eq!(store.loan(issue.loan.id).unwrap().unwrap().outstanding_amount, Money::from_major(1_150));
    }

    #[test]
    fn test_latest_settings() {
        let mut store = InMemoryStore::new();
        assert!(store.latest_settings().unwrap().is_none());

        let custom = LedgerSettings::new(dec!(12), dec!(2), Money::from_major(150), 6).unwrap();
        store
            .insert_settings(SettingsVersion {
                settings: custom.clone(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            })
            .unwrap();
        assert_eq!(store.latest_settings().unwrap(), Some(custom));
    }

    #[test]
    fn test_savings_are_returned_oldest_first() {
        let mut store = InMemoryStore::new();
        let member = Uuid::new_v4();
        let later = SavingsEntry::deposit(member, Money::from_major(20), Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(), None).unwrap();
        let earlier = SavingsEntry::deposit(member, Money::from_major(10), Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(), None).unwrap();

        store.insert_savings(later.clone()).unwrap();
        store.insert_savings(earlier.clone()).unwrap();
        assert!(matches!(store.insert_savings(earlier.clone()), Err(StoreError::Duplicate { .. })));

        let entries = store.savings_for_member(member).unwrap();
        assert_eq!(entries, vec![earlier, later]);
    }
}
