pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod history;
pub mod ledger;
pub mod loan;
pub mod payments;
pub mod savings;
pub mod service;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use config::{load_settings, LedgerSettings, SettingsHistory, SettingsVersion};
pub use decimal::{Money, Rate, MAX_AMOUNT, SETTLEMENT_TOLERANCE};
pub use errors::{LedgerError, Result, StoreError, StoreResult};
pub use events::{Event, EventStore};
pub use history::{build_history, group_by_date, HistoryFilter, HistoryItem, HistoryKind};
pub use ledger::{
    compute_eligibility, parse_term, Eligibility, LoanIssue, LoanLedger, LoanRequest,
    RepaymentOutcome,
};
pub use loan::{Loan, RepaymentEntry, RepaymentProgress};
pub use payments::{InstallmentSchedule, LoanTerms, PaymentSplit, ScheduledInstallment};
pub use savings::{member_balance, savings_balance, SavingsEntry};
pub use service::LoanService;
pub use store::{InMemoryStore, LedgerStore};
pub use types::{EntryId, LoanId, LoanStatus, MemberId, TransactionType};
pub use views::{LoanView, MemberSummaryView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
