use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{EntryId, LoanId, LoanStatus, MemberId, TransactionType};

/// all events that can be emitted by the ledger service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanApplied {
        loan_id: LoanId,
        member_id: MemberId,
        principal: Money,
        total_repayment: Money,
        status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        start_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    LoanPaid {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },

    // repayment events
    RepaymentReceived {
        loan_id: LoanId,
        amount: Money,
        principal_portion: Money,
        interest_portion: Money,
        new_outstanding: Money,
        timestamp: DateTime<Utc>,
    },

    // savings events
    SavingsRecorded {
        entry_id: EntryId,
        member_id: MemberId,
        amount: Money,
        transaction_type: TransactionType,
        timestamp: DateTime<Utc>,
    },
    InterestCredited {
        member_id: MemberId,
        loan_id: LoanId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// collects events emitted during service operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_take_drains_store() {
        let mut store = EventStore::new();
        let loan_id = Uuid::new_v4();
        store.emit(Event::LoanPaid {
            loan_id,
            final_payment: Money::from_major(115),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        });

        assert_eq!(store.events().len(), 1);
        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.events().is_empty());
    }
}
