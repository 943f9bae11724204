use chrono::{Datelike, NaiveDate};

use crate::fmt::{money, month_year};
use crate::models::{Account, ReportRow};
use crate::window::{build_window, find_settlement_row, BillingMonth};

/// What the settlement callout says about the account's last payout.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementNote {
    /// Zero when the settlement month is outside the window or has no data.
    pub credit_amount: f64,
    pub credit_date: Option<NaiveDate>,
    pub next_settlement_year: i32,
}

/// Everything needed to lay out one net metering statement.
///
/// A statement for month S is dated the 1st of S and covers the twelve
/// months ending the month before S.
#[derive(Debug, Clone)]
pub struct Statement<'a> {
    pub account: &'a Account,
    pub month: BillingMonth,
    pub statement_date: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub settlement: SettlementNote,
}

impl<'a> Statement<'a> {
    pub fn build(account: &'a Account, month: BillingMonth) -> Self {
        let statement_date = month.first_day();
        let rows = build_window(&account.records, month.prev());
        let settlement = settlement_note(&rows, &account.settlement_month, statement_date);
        Self {
            account,
            month,
            statement_date,
            rows,
            settlement,
        }
    }

    /// `{account}_{YYYY}-{MM}.pdf`
    pub fn file_name(&self) -> String {
        statement_file_name(&self.account.account_id, self.month)
    }

    pub fn mailing_lines(&self) -> Vec<String> {
        mailing_lines(&self.account.mailing_address)
    }

    /// "$15.39 credited to customer in October 2023. Next settlement month
    /// will be October 2024."
    pub fn settlement_callout(&self) -> String {
        let note = &self.settlement;
        let credit_date = note
            .credit_date
            .map(month_year)
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "{} credited to customer in {}. Next settlement month will be {} {}.",
            money(note.credit_amount),
            credit_date,
            self.account.settlement_month,
            note.next_settlement_year
        )
    }

    pub fn is_settlement_row(&self, row: &ReportRow) -> bool {
        find_settlement_row(std::slice::from_ref(row), &self.account.settlement_month).is_some()
    }
}

pub fn statement_file_name(account_id: &str, month: BillingMonth) -> String {
    format!(
        "{}_{}-{:02}.pdf",
        path_safe_id(account_id),
        month.year(),
        month.month()
    )
}

/// Account id as a single path component: separators and `..` become `_`.
pub fn path_safe_id(account_id: &str) -> String {
    let safe = account_id.replace("..", "_").replace(['/', '\\'], "_");
    if safe.is_empty() || safe == "." {
        "_".to_string()
    } else {
        safe
    }
}

fn settlement_note(rows: &[ReportRow], settlement_month: &str, statement_date: NaiveDate) -> SettlementNote {
    match find_settlement_row(rows, settlement_month) {
        Some(row) => SettlementNote {
            credit_amount: row.net_surplus_cash_value.unwrap_or(0.0),
            credit_date: Some(row.date),
            next_settlement_year: row.date.year() + 1,
        },
        None => SettlementNote {
            credit_amount: 0.0,
            credit_date: None,
            next_settlement_year: statement_date.year(),
        },
    }
}

/// Splits a comma-separated mailing address into display lines, keeping the
/// last two parts ("Palo Alto", "CA 94306") together on one line.
pub fn mailing_lines(address: &str) -> Vec<String> {
    if address.trim().is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = address.split(',').map(|s| s.trim().to_string()).collect();
    if lines.len() > 1 {
        let last = lines.pop().unwrap_or_default();
        let second_last = lines.pop().unwrap_or_default();
        lines.push(format!("{second_last}, {last}"));
    }
    lines
}

/// The month after the last billing record, or the current month when the
/// account has no records yet.
pub fn default_statement_month(account: &Account, today: NaiveDate) -> BillingMonth {
    account
        .last_record()
        .map(|r| BillingMonth::from_date(r.date).next())
        .unwrap_or_else(|| BillingMonth::from_date(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillingRecord;

    fn ym(year: i32, month: u32) -> BillingMonth {
        BillingMonth::new(year, month).unwrap()
    }

    fn account(settlement_month: &str, records: Vec<BillingRecord>) -> Account {
        Account {
            mailing_address: "Jane Doe, 12 Oak St, Palo Alto, CA 94306".into(),
            service_address: "12 Oak St".into(),
            settlement_month: settlement_month.into(),
            records,
            ..Account::new("10442")
        }
    }

    fn rec(y: i32, m: u32, cash: f64) -> BillingRecord {
        BillingRecord {
            date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            net_gen_consumption: -100.0,
            annual_net_surplus: 250.0,
            net_surplus_cash_value: cash,
        }
    }

    #[test]
    fn test_window_ends_month_before_statement() {
        let acct = account("October", vec![]);
        let st = Statement::build(&acct, ym(2024, 1));
        assert_eq!(st.statement_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(st.rows.len(), 12);
        assert_eq!(st.rows[0].month_label, "Jan-23");
        assert_eq!(st.rows[11].month_label, "Dec-23");
    }

    #[test]
    fn test_settlement_note_from_matching_row() {
        let acct = account("October", vec![rec(2023, 10, 15.39)]);
        let st = Statement::build(&acct, ym(2023, 11));
        assert_eq!(st.settlement.credit_amount, 15.39);
        assert_eq!(st.settlement.credit_date, NaiveDate::from_ymd_opt(2023, 10, 1));
        assert_eq!(st.settlement.next_settlement_year, 2024);
    }

    #[test]
    fn test_settlement_note_projected_row_credits_zero() {
        let acct = account("October", vec![]);
        let st = Statement::build(&acct, ym(2023, 11));
        assert_eq!(st.settlement.credit_amount, 0.0);
        assert_eq!(st.settlement.credit_date, NaiveDate::from_ymd_opt(2023, 10, 1));
        assert_eq!(st.settlement.next_settlement_year, 2024);
    }

    #[test]
    fn test_settlement_note_without_match_falls_back() {
        let acct = account("", vec![rec(2023, 10, 15.39)]);
        let st = Statement::build(&acct, ym(2023, 11));
        assert_eq!(st.settlement.credit_amount, 0.0);
        assert_eq!(st.settlement.credit_date, None);
        assert_eq!(st.settlement.next_settlement_year, 2023);
    }

    #[test]
    fn test_settlement_callout_without_match() {
        let acct = account("", vec![]);
        let st = Statement::build(&acct, ym(2023, 11));
        assert_eq!(
            st.settlement_callout(),
            "$0.00 credited to customer in N/A. Next settlement month will be  2023."
        );
    }

    #[test]
    fn test_is_settlement_row() {
        let acct = account("March", vec![]);
        let st = Statement::build(&acct, ym(2024, 1));
        let flagged: Vec<&str> = st
            .rows
            .iter()
            .filter(|r| st.is_settlement_row(r))
            .map(|r| r.month_label.as_str())
            .collect();
        assert_eq!(flagged, vec!["Mar-23"]);
    }

    #[test]
    fn test_file_name_uses_statement_month() {
        let acct = account("October", vec![]);
        let st = Statement::build(&acct, ym(2024, 3));
        assert_eq!(st.file_name(), "10442_2024-03.pdf");
    }

    #[test]
    fn test_file_name_keeps_id_inside_export_dir() {
        let acct = Account {
            account_id: "../../evil".into(),
            ..account("October", vec![])
        };
        let st = Statement::build(&acct, ym(2024, 1));
        let name = st.file_name();
        assert!(!name.contains('/') && !name.contains('\\') && !name.contains(".."));
        assert_eq!(path_safe_id("a\\b/c"), "a_b_c");
        assert_eq!(path_safe_id("."), "_");
        assert_eq!(path_safe_id("10442"), "10442");
    }

    #[test]
    fn test_mailing_lines_join_city_and_zip() {
        assert_eq!(
            mailing_lines("Jane Doe, 12 Oak St, Palo Alto, CA 94306"),
            vec!["Jane Doe", "12 Oak St", "Palo Alto, CA 94306"]
        );
        assert_eq!(mailing_lines("Palo Alto,CA 94306"), vec!["Palo Alto, CA 94306"]);
        assert_eq!(mailing_lines("PO Box 9"), vec!["PO Box 9"]);
        assert!(mailing_lines("   ").is_empty());
    }

    #[test]
    fn test_default_statement_month() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
        let acct = account("October", vec![rec(2023, 11, 0.0), rec(2023, 12, 0.0)]);
        assert_eq!(default_statement_month(&acct, today), ym(2024, 1));
        let empty = account("October", vec![]);
        assert_eq!(default_statement_month(&empty, today), ym(2025, 6));
    }
}
