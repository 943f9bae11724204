use comfy_table::{Cell, Table};

use crate::cli::load_store;
use crate::error::Result;
use crate::statement::default_statement_month;

pub fn list(file: &str) -> Result<()> {
    let store = load_store(file)?;
    if store.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    let mut table = Table::new();
    table.set_header(vec![
        "Account",
        "Service Address",
        "Settlement Month",
        "Records",
        "First Period",
        "Last Period",
        "Next Statement",
    ]);
    for account in store.iter() {
        let period = |date: Option<chrono::NaiveDate>| {
            date.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        table.add_row(vec![
            Cell::new(&account.account_id),
            Cell::new(&account.service_address),
            Cell::new(&account.settlement_month),
            Cell::new(account.records.len()),
            Cell::new(period(account.first_record().map(|r| r.date))),
            Cell::new(period(account.last_record().map(|r| r.date))),
            Cell::new(default_statement_month(account, today)),
        ]);
    }
    println!("{table}");
    println!("{} accounts", store.len());
    Ok(())
}
