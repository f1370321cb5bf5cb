//! Read, compute and write for each member-facing operation.

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use tracing::{info, instrument, warn};

use crate::config::{LedgerSettings, SettingsVersion};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result, StoreError};
use crate::events::{Event, EventStore};
use crate::history::{build_history, HistoryFilter, HistoryItem};
use crate::ledger::{LoanIssue, LoanLedger, LoanRequest, RepaymentOutcome};
use crate::loan::{Loan, RepaymentEntry};
use crate::payments::InstallmentSchedule;
use crate::savings::{savings_balance, SavingsEntry};
use crate::store::LedgerStore;
use crate::types::{LoanId, LoanStatus, MemberId, TransactionType};
use crate::views::MemberSummaryView;

/// ledger operations against a store, stamped by a shared clock
pub struct LoanService<'a, S: LedgerStore> {
    store: S,
    time: &'a SafeTimeProvider,
    events: EventStore,
    record_disbursements: bool,
}

impl<'a, S: LedgerStore> LoanService<'a, S> {
    pub fn new(store: S, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            time,
            events: EventStore::new(),
            record_disbursements: false,
        }
    }

    /// also write a `loan_disbursement` savings entry when a loan is issued
    pub fn with_disbursement_entries(mut self, enabled: bool) -> Self {
        self.record_disbursements = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// latest stored settings, or the defaults if none were saved
    pub fn settings(&self) -> Result<LedgerSettings> {
        Ok(self.store.latest_settings()?.unwrap_or_default())
    }

    /// validate and save a new settings version effective now
    #[instrument(skip(self))]
    pub fn update_settings(&mut self, settings: LedgerSettings) -> Result<()> {
        settings.validate()?;
        self.store.insert_settings(SettingsVersion {
            settings,
            created_at: self.time.now(),
        })?;
        info!("ledger settings updated");
        Ok(())
    }

    fn ledger(&self) -> Result<LoanLedger> {
        Ok(LoanLedger::new(self.settings()?)?.with_disbursement_entries(self.record_disbursements))
    }

    pub fn savings_balance(&self, member_id: MemberId) -> Result<Money> {
        let entries = self.store.savings_for_member(member_id)?;
        savings_balance(&entries)
    }

    /// record a savings deposit
    ///
    /// `saving_date` is the day the member says they saved; it defaults to now.
    #[instrument(skip(self, proof_reference))]
    pub fn deposit(
        &mut self,
        member_id: MemberId,
        amount: Money,
        saving_date: Option<DateTime<Utc>>,
        proof_reference: Option<String>,
    ) -> Result<SavingsEntry> {
        let now = self.time.now();
        let entry = SavingsEntry::deposit(member_id, amount, saving_date.unwrap_or(now), proof_reference)
            .inspect_err(|e| warn!(error = %e, "deposit rejected"))?;
        self.store.insert_savings(entry.clone())?;

        self.events.emit(Event::SavingsRecorded {
            entry_id: entry.id,
            member_id,
            amount: entry.amount,
            transaction_type: TransactionType::Deposit,
            timestamp: now,
        });
        Ok(entry)
    }

    fn load_request(
        &self,
        member_id: MemberId,
        amount: Money,
        term_months: Option<u32>,
    ) -> Result<(LoanLedger, LoanRequest, Money, bool)> {
        let ledger = self.ledger()?;
        let term = term_months.unwrap_or(ledger.settings().cycle_tenure_months);
        let balance = self.savings_balance(member_id)?;
        let has_open_loan = self.store.open_loan_for_member(member_id)?.is_some();
        Ok((ledger, LoanRequest::new(member_id, amount, term), balance, has_open_loan))
    }

    fn insert_loan(&mut self, issue: &LoanIssue) -> Result<()> {
        match self.store.create_loan(issue) {
            Ok(()) => Ok(()),
            Err(StoreError::OpenLoanExists { member_id, .. }) => {
                Err(LedgerError::DuplicateActiveLoan { member_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// issue an active loan starting now
    ///
    /// `term_months` falls back to the cycle tenure.
    #[instrument(skip(self))]
    pub fn apply_for_loan(
        &mut self,
        member_id: MemberId,
        amount: Money,
        term_months: Option<u32>,
    ) -> Result<Loan> {
        let now = self.time.now();
        let (ledger, request, balance, has_open_loan) =
            self.load_request(member_id, amount, term_months)?;

        let issue = ledger
            .apply_for_loan(request, balance, has_open_loan, now)
            .inspect_err(|e| warn!(error = %e, "loan application rejected"))?;
        self.insert_loan(&issue)?;

        let loan = issue.loan;
        info!(loan_id = %loan.id, total_repayment = %loan.total_repayment, "loan issued");

        self.events.emit(Event::LoanApplied {
            loan_id: loan.id,
            member_id,
            principal: loan.principal,
            total_repayment: loan.total_repayment,
            status: loan.status,
            timestamp: now,
        });
        self.emit_disbursement(issue.disbursement.as_ref());
        Ok(loan)
    }

    /// record an application that waits for approval
    #[instrument(skip(self))]
    pub fn submit_application(
        &mut self,
        member_id: MemberId,
        amount: Money,
        term_months: Option<u32>,
    ) -> Result<Loan> {
        let now = self.time.now();
        let (ledger, request, balance, has_open_loan) =
            self.load_request(member_id, amount, term_months)?;

        let loan = ledger
            .submit_application(request, balance, has_open_loan, now)
            .inspect_err(|e| warn!(error = %e, "loan application rejected"))?;
        self.insert_loan(&LoanIssue {
            loan: loan.clone(),
            disbursement: None,
        })?;

        info!(loan_id = %loan.id, "loan application submitted");
        self.events.emit(Event::LoanApplied {
            loan_id: loan.id,
            member_id,
            principal: loan.principal,
            total_repayment: loan.total_repayment,
            status: loan.status,
            timestamp: now,
        });
        Ok(loan)
    }

    /// approve a pending loan; its term starts now
    #[instrument(skip(self))]
    pub fn approve_loan(&mut self, loan_id: LoanId) -> Result<Loan> {
        let now = self.time.now();
        let pending = self.require_loan(loan_id)?;
        let issue = self.ledger()?.approve(&pending, now)?;
        self.store.activate_loan(&issue)?;

        let loan = issue.loan;
        info!(loan_id = %loan.id, "loan approved");

        if let (Some(start_date), Some(due_date)) = (loan.start_date, loan.due_date) {
            self.events.emit(Event::LoanApproved {
                loan_id,
                start_date,
                due_date,
                timestamp: now,
            });
        }
        self.events.emit(Event::StatusChanged {
            loan_id,
            old_status: LoanStatus::Pending,
            new_status: LoanStatus::Active,
            reason: "approved".to_string(),
            timestamp: now,
        });
        self.emit_disbursement(issue.disbursement.as_ref());
        Ok(loan)
    }

    /// apply a repayment to an active loan
    ///
    /// The loan is re-read, the outcome computed, and all writes committed
    /// only if the balance is still the one the outcome was computed from.
    #[instrument(skip(self))]
    pub fn repay(&mut self, loan_id: LoanId, amount: Money) -> Result<RepaymentOutcome> {
        let now = self.time.now();
        let loan = self.require_loan(loan_id)?;

        let outcome = self
            .ledger()?
            .process_repayment(&loan, amount, now)
            .inspect_err(|e| warn!(error = %e, "repayment rejected"))?;
        self.store.commit_repayment(&outcome, loan.outstanding_amount)?;

        let updated = &outcome.updated_loan;
        self.events.emit(Event::RepaymentReceived {
            loan_id,
            amount: outcome.repayment.amount,
            principal_portion: outcome.repayment.principal_portion,
            interest_portion: outcome.repayment.interest_portion,
            new_outstanding: updated.outstanding_amount,
            timestamp: now,
        });

        if let Some(credit) = &outcome.interest_credit {
            self.events.emit(Event::InterestCredited {
                member_id: credit.member_id,
                loan_id,
                amount: credit.amount,
                timestamp: now,
            });
        }

        if updated.is_paid() {
            info!(loan_id = %loan_id, "loan paid off");
            self.events.emit(Event::LoanPaid {
                loan_id,
                final_payment: outcome.repayment.amount,
                timestamp: now,
            });
            self.events.emit(Event::StatusChanged {
                loan_id,
                old_status: LoanStatus::Active,
                new_status: LoanStatus::Paid,
                reason: "final repayment".to_string(),
                timestamp: now,
            });
        }

        Ok(outcome)
    }

    /// repayments of a loan ordered by date
    pub fn repayment_history(&self, loan_id: LoanId) -> Result<Vec<RepaymentEntry>> {
        self.require_loan(loan_id)?;
        Ok(self.store.repayments_for_loan(loan_id)?)
    }

    pub fn repayment_schedule(&self, loan_id: LoanId) -> Result<InstallmentSchedule> {
        InstallmentSchedule::generate(&self.require_loan(loan_id)?)
    }

    pub fn member_summary(&self, member_id: MemberId) -> Result<MemberSummaryView> {
        let settings = self.settings()?;
        let savings = self.store.savings_for_member(member_id)?;
        let open_loan = self.store.open_loan_for_member(member_id)?;
        let repayments = match &open_loan {
            Some(loan) => self.store.repayments_for_loan(loan.id)?,
            None => Vec::new(),
        };

        MemberSummaryView::build(
            member_id,
            &savings,
            open_loan.as_ref(),
            &repayments,
            &settings,
            self.time.now(),
        )
    }

    /// the member's savings, loans and repayments, newest first
    pub fn history(&self, member_id: MemberId, filter: HistoryFilter) -> Result<Vec<HistoryItem>> {
        let savings = self.store.savings_for_member(member_id)?;
        let loans = self.store.loans_for_member(member_id)?;

        let mut repayments = Vec::new();
        for loan in &loans {
            repayments.extend(self.store.repayments_for_loan(loan.id)?);
        }

        Ok(build_history(&savings, &loans, &repayments, filter))
    }

    /// events emitted since the last `take_events`
    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn require_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)?
            .ok_or(LedgerError::LoanNotFound { id: loan_id })
    }

    fn emit_disbursement(&mut self, entry: Option<&SavingsEntry>) {
        if let Some(entry) = entry {
            self.events.emit(Event::SavingsRecorded {
                entry_id: entry.id,
                member_id: entry.member_id,
                amount: entry.amount,
                transaction_type: entry.transaction_type,
                timestamp: entry.date,
            });
        }
    }
}
