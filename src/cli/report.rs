use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{find_account, load_store, statement_month};
use crate::error::Result;
use crate::fmt::{opt_kwh, opt_money, statement_date, MISSING};
use crate::statement::Statement;

pub fn run(file: &str, account_id: &str, month: Option<&str>) -> Result<()> {
    let store = load_store(file)?;
    let account = find_account(&store, account_id)?;
    let month = statement_month(account, month)?;
    let statement = Statement::build(account, month);
    print_statement(&statement);
    Ok(())
}

fn print_statement(statement: &Statement) {
    let account = statement.account;
    println!("{}", "Electric Net Metering Statement".bold());
    println!("Statement Date:   {}", statement_date(statement.statement_date));
    println!("Account #:        {}", account.account_id);
    println!("Service Address:  {}", account.service_address);
    let mailing = statement.mailing_lines();
    if !mailing.is_empty() {
        println!("Mailing Address:  {}", mailing.join(" / "));
    }
    println!();
    println!(
        "{}",
        format!("Election A (Settlement Month = {})", account.settlement_month).bold()
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Billing Period Ending",
        "Net Generation or Net Consumption",
        "Annual Net Surplus (To-Date)",
        "Net Surplus Cash Value",
    ]);
    for row in &statement.rows {
        let net = opt_kwh(row.net_gen_consumption);
        let net_cell = match row.net_gen_consumption {
            Some(v) if v < 0.0 => Cell::new(net.green()),
            Some(_) => Cell::new(net.blue()),
            None => Cell::new(MISSING.dimmed()),
        };
        let label = if statement.is_settlement_row(row) {
            Cell::new(row.month_label.bold())
        } else {
            Cell::new(&row.month_label)
        };
        table.add_row(vec![
            label,
            net_cell,
            Cell::new(opt_kwh(row.annual_net_surplus)),
            Cell::new(opt_money(row.net_surplus_cash_value)),
        ]);
    }
    println!("{table}");

    let projected = statement.rows.iter().filter(|r| r.is_projected).count();
    if projected > 0 {
        println!("{projected} of {} months have no billing data.", statement.rows.len());
    }
    println!("\n{}", statement.settlement_callout());
}
