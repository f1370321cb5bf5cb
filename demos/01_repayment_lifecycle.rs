/// repayment lifecycle - apply, approve and repay under controlled time
use chrono::{Duration, TimeZone, Utc};
use village_ledger::{
    InMemoryStore, LedgerError, LoanService, Money, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== repayment lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let mut service = LoanService::new(InMemoryStore::new(), &time);

    let member = Uuid::new_v4();
    service.deposit(member, Money::from_major(400), None, None)?;
    println!("savings: {}", service.savings_balance(member)?);

    // too much for a 400 balance at 3x
    match service.submit_application(member, Money::from_major(1_500), Some(6)) {
        Err(LedgerError::AmountExceedsLimit { limit, requested }) => {
            println!("rejected: requested {} over limit {}", requested, limit);
        }
        other => println!("unexpected: {:?}", other),
    }

    let pending = service.submit_application(member, Money::from_major(1_200), Some(6))?;
    println!("\napplication {} is {}", pending.id, pending.status.as_str());

    controller.advance(Duration::days(2));
    let loan = service.approve_loan(pending.id)?;
    println!(
        "approved on {}, due {}",
        time.now().format("%Y-%m-%d"),
        loan.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    );
    println!("total repayment: {}", loan.total_repayment);
    println!("monthly repayment: {}", loan.monthly_repayment);

    println!("\nschedule:");
    for installment in &service.repayment_schedule(loan.id)?.installments {
        println!(
            "  #{:>2} {}  pay {}  interest {}",
            installment.installment_number,
            installment.due_date.format("%Y-%m-%d"),
            installment.payment_amount,
            installment.interest_portion,
        );
    }

    // pay monthly until the balance is settled
    println!();
    loop {
        controller.advance(Duration::days(30));
        let current = service.member_summary(member)?;
        let Some(view) = current.loan else { break };

        let amount = view.monthly_repayment.min(view.outstanding_amount);
        let outcome = service.repay(loan.id, amount)?;
        println!(
            "{}  paid {}  outstanding {}",
            time.now().format("%Y-%m-%d"),
            outcome.repayment.amount,
            outcome.updated_loan.outstanding_amount,
        );

        if outcome.repayment.is_final_payment {
            println!("\nloan {}", outcome.updated_loan.status.as_str());
            break;
        }
    }

    println!("savings after interest: {}", service.savings_balance(member)?);
    println!("events emitted: {}", service.take_events().len());

    Ok(())
}
