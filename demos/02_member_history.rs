/// member history - transaction list grouped by day, plus settings from toml
use chrono::{Duration, TimeZone, Utc};
use village_ledger::{
    group_by_date, HistoryFilter, InMemoryStore, LedgerSettings, LoanService, Money,
    SafeTimeProvider, TimeSource, Uuid,
};

const SETTINGS: &str = r#"
loan_interest_rate_percent = "10"
max_loan_multiplier = "2"
min_required_savings = "50"
cycle_tenure_months = 6
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let mut service = LoanService::new(InMemoryStore::new(), &time);

    service.update_settings(LedgerSettings::from_toml_str(SETTINGS)?)?;

    let member = Uuid::new_v4();
    service.deposit(member, Money::from_major(100), None, None)?;
    controller.advance(Duration::hours(4));
    service.deposit(member, Money::from_major(150), None, None)?;

    controller.advance(Duration::days(1));
    let loan = service.apply_for_loan(member, Money::from_major(300), None)?;
    println!("loan of {} over {} months", loan.principal, loan.term_months);

    controller.advance(Duration::days(30));
    service.repay(loan.id, loan.monthly_repayment)?;

    for filter in [HistoryFilter::All, HistoryFilter::Savings, HistoryFilter::Loans] {
        println!("\n=== {:?} ===", filter);
        let items = service.history(member, filter)?;
        for (day, entries) in group_by_date(&items) {
            println!("{}", day);
            for item in entries {
                println!("  {:<22} {}", item.title, item.amount);
            }
        }
    }

    Ok(())
}
