use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a club member
pub type MemberId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a savings or repayment entry
pub type EntryId = Uuid;

/// loan status
///
/// `Paid` is the only terminal state. Some records label it `cleared`;
/// both spellings deserialize to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// application submitted, awaiting approval
    Pending,
    /// disbursed and being repaid
    Active,
    /// fully repaid
    #[serde(alias = "cleared")]
    Paid,
}

impl LoanStatus {
    /// pending or active loans block a member from applying again
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
        }
    }
}

/// kind of savings ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// member contribution
    Deposit,
    /// loan principal paid out to the member
    LoanDisbursement,
    /// interest collected on a repayment and credited back to the member
    InterestEarned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_alias_maps_to_paid() {
        let paid: LoanStatus = serde_json::from_str("\"paid\"").unwrap();
        let cleared: LoanStatus = serde_json::from_str("\"cleared\"").unwrap();
        assert_eq!(paid, LoanStatus::Paid);
        assert_eq!(cleared, LoanStatus::Paid);

        // always written back under the canonical name
        assert_eq!(serde_json::to_string(&cleared).unwrap(), "\"paid\"");
    }

    #[test]
    fn test_open_statuses() {
        assert!(LoanStatus::Pending.is_open());
        assert!(LoanStatus::Active.is_open());
        assert!(!LoanStatus::Paid.is_open());
    }

    #[test]
    fn test_transaction_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionType::LoanDisbursement).unwrap(),
            "\"loan_disbursement\""
        );
        let t: TransactionType = serde_json::from_str("\"interest_earned\"").unwrap();
        assert_eq!(t, TransactionType::InterestEarned);
    }
}
