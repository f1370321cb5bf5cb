/// quick start - minimal example to get started
use village_ledger::{InMemoryStore, LoanService, Money, SafeTimeProvider, TimeSource, Uuid};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut service = LoanService::new(InMemoryStore::new(), &time);

    // a member saves, then borrows against their savings
    let member = Uuid::new_v4();
    service.deposit(member, Money::from_major(500), None, Some("receipt-001".to_string()))?;
    let loan = service.apply_for_loan(member, Money::from_major(1_000), Some(10))?;

    // pay the first installment
    service.repay(loan.id, loan.monthly_repayment)?;

    // print the member's dashboard
    println!("{}", service.member_summary(member)?.to_json_pretty()?);

    Ok(())
}
