use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{NetMeterError, Result};
use crate::models::{Account, AccountStore, BillingRecord, RawDate, RawRow};
use crate::window::BillingMonth;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Account,
    ServiceAddress,
    MailingAddress,
    SettlementMonth,
    BillingPeriod,
    NetGenConsumption,
    AnnualNetSurplus,
    NetSurplusCashValue,
}

const ALL_COLUMNS: &[Column] = &[
    Column::Account,
    Column::ServiceAddress,
    Column::MailingAddress,
    Column::SettlementMonth,
    Column::BillingPeriod,
    Column::NetGenConsumption,
    Column::AnnualNetSurplus,
    Column::NetSurplusCashValue,
];

impl Column {
    fn header(&self) -> &'static str {
        match self {
            Self::Account => "Account",
            Self::ServiceAddress => "Service Address",
            Self::MailingAddress => "Mailing Address",
            Self::SettlementMonth => "Settlement Month",
            Self::BillingPeriod => "Billing Period",
            Self::NetGenConsumption => "Net_Gen_Consumption",
            Self::AnnualNetSurplus => "Annual_Net_Surplus",
            Self::NetSurplusCashValue => "Net_Surplus_Cash_Value",
        }
    }
}

/// Maps each known column to its position in the header row. Unknown
/// headers are ignored; for repeated headers the first occurrence wins.
fn column_positions<'a>(headers: impl Iterator<Item = &'a str>) -> HashMap<Column, usize> {
    let mut positions = HashMap::new();
    for (i, name) in headers.enumerate() {
        let name = name.trim();
        if let Some(col) = ALL_COLUMNS.iter().find(|c| c.header() == name) {
            positions.entry(*col).or_insert(i);
        }
    }
    positions
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

// Two-digit years are tried before four-digit ones so that "1/5/23" is not
// read as the year 23.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

const MONTH_FORMATS: &[&str] = &["%Y-%m", "%b-%y", "%b-%Y", "%b %Y", "%B %Y", "%m/%Y"];

pub fn parse_billing_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // ISO date-times: keep the calendar date, drop the clock.
    if let (Some(head), Some(sep)) = (s.get(..10), s.get(10..11)) {
        if sep == "T" || sep == " " {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }
    for fmt in MONTH_FORMATS {
        let padded = format!("{s} 01");
        if let Ok(d) = NaiveDate::parse_from_str(&padded, &format!("{fmt} %d")) {
            return Some(d);
        }
    }
    None
}

fn resolve_date(raw: &RawDate) -> Option<NaiveDate> {
    match raw {
        RawDate::Date(d) => Some(*d),
        RawDate::Serial(serial) => excel_serial_to_date(*serial),
        RawDate::Text(s) => parse_billing_date(s),
    }
}

/// Whole numbers print without a fraction so spreadsheet ids like `10442.0`
/// become `10442`.
fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Blank and zero account ids count as missing.
fn is_blank_id(id: &str) -> bool {
    id.is_empty() || id.parse::<f64>().is_ok_and(|v| v == 0.0)
}

fn number_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Source kinds: enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    Csv,
    #[cfg(feature = "xlsx")]
    Workbook,
}

impl SourceKind {
    pub fn for_path(file_path: &Path) -> Result<Self> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Workbook),
            _ => Err(NetMeterError::UnsupportedFile(
                file_path.display().to_string(),
            )),
        }
    }

    pub fn read_rows(&self, file_path: &Path) -> Result<Vec<RawRow>> {
        match self {
            Self::Csv => read_csv_rows(file_path),
            #[cfg(feature = "xlsx")]
            Self::Workbook => read_workbook_rows(file_path),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv_rows(file_path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut records = rdr.records();

    let header = records.next().ok_or(NetMeterError::MissingHeader)??;
    let positions = column_positions(header.iter());

    let mut rows = Vec::new();
    for (i, result) in records.enumerate() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let cell = |col: Column| positions.get(&col).and_then(|&idx| record.get(idx));
        let text = |col: Column| cell(col).and_then(non_empty);
        let number = |col: Column| cell(col).and_then(parse_amount);
        rows.push(RawRow {
            line: i + 2,
            account: text(Column::Account),
            service_address: text(Column::ServiceAddress),
            mailing_address: text(Column::MailingAddress),
            settlement_month: text(Column::SettlementMonth),
            billing_period: text(Column::BillingPeriod).map(RawDate::Text),
            net_gen_consumption: number(Column::NetGenConsumption),
            annual_net_surplus: number(Column::AnnualNetSurplus),
            net_surplus_cash_value: number(Column::NetSurplusCashValue),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Spreadsheet reader (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn cell_text(cell: &calamine::Data) -> Option<String> {
    use calamine::Data;
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_empty(s),
        Data::Float(f) => Some(number_text(*f)),
        Data::Int(i) => Some(i.to_string()),
        other => non_empty(&other.to_string()),
    }
}

#[cfg(feature = "xlsx")]
fn cell_number(cell: &calamine::Data) -> Option<f64> {
    use calamine::Data;
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

#[cfg(feature = "xlsx")]
fn cell_date(cell: &calamine::Data) -> Option<RawDate> {
    use calamine::Data;
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(RawDate::Date),
        Data::Float(f) => Some(RawDate::Serial(*f)),
        Data::Int(i) => Some(RawDate::Serial(*i as f64)),
        Data::String(s) | Data::DateTimeIso(s) => non_empty(s).map(RawDate::Text),
        _ => None,
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook_rows(file_path: &Path) -> Result<Vec<RawRow>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(NetMeterError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&first)?;
    let mut sheet_rows = range.rows();

    let header = sheet_rows.next().ok_or(NetMeterError::MissingHeader)?;
    let header_text: Vec<String> = header
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();
    let positions = column_positions(header_text.iter().map(String::as_str));

    let mut rows = Vec::new();
    for (i, row) in sheet_rows.enumerate() {
        if row.iter().all(|c| matches!(c, calamine::Data::Empty)) {
            continue;
        }
        let cell = |col: Column| positions.get(&col).and_then(|&idx| row.get(idx));
        rows.push(RawRow {
            line: i + 2,
            account: cell(Column::Account).and_then(cell_text),
            service_address: cell(Column::ServiceAddress).and_then(cell_text),
            mailing_address: cell(Column::MailingAddress).and_then(cell_text),
            settlement_month: cell(Column::SettlementMonth).and_then(cell_text),
            billing_period: cell(Column::BillingPeriod).and_then(cell_date),
            net_gen_consumption: cell(Column::NetGenConsumption).and_then(cell_number),
            annual_net_surplus: cell(Column::AnnualNetSurplus).and_then(cell_number),
            net_surplus_cash_value: cell(Column::NetSurplusCashValue).and_then(cell_number),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub records: usize,
    pub accounts: usize,
    pub skipped_no_account: usize,
    pub skipped_bad_date: usize,
    pub duplicate_months: usize,
}

/// Folds raw rows into accounts. The first row seen for an account sets its
/// addresses and settlement month; every row with a usable date adds one
/// billing record. Records end up sorted by date, equal dates keeping their
/// row order.
pub fn ingest_rows(rows: Vec<RawRow>) -> (AccountStore, ImportSummary) {
    let mut store = AccountStore::new();
    let mut summary = ImportSummary {
        rows_read: rows.len(),
        ..Default::default()
    };

    for row in rows {
        let Some(account_id) = row.account.as_deref().map(str::trim).filter(|id| !is_blank_id(id))
        else {
            summary.skipped_no_account += 1;
            continue;
        };

        let account = store.entry_or_insert_with(account_id, || Account {
            service_address: row.service_address.clone().unwrap_or_default(),
            mailing_address: row.mailing_address.clone().unwrap_or_default(),
            settlement_month: row.settlement_month.clone().unwrap_or_default(),
            ..Account::new(account_id)
        });

        let Some(date) = row.billing_period.as_ref().and_then(resolve_date) else {
            log::warn!(
                "row {}: account {account_id} has no usable billing period ({:?}), skipped",
                row.line,
                row.billing_period
            );
            summary.skipped_bad_date += 1;
            continue;
        };

        account.records.push(BillingRecord {
            date,
            net_gen_consumption: number_or_zero(row.net_gen_consumption),
            annual_net_surplus: number_or_zero(row.annual_net_surplus),
            net_surplus_cash_value: number_or_zero(row.net_surplus_cash_value),
        });
        summary.records += 1;
    }

    for account in store.accounts_mut() {
        account.records.sort_by_key(|r| r.date);
        for pair in account.records.windows(2) {
            let month = BillingMonth::from_date(pair[1].date);
            if BillingMonth::from_date(pair[0].date) == month {
                log::warn!(
                    "account {} has more than one record for {month}; the earliest is used",
                    account.account_id
                );
                summary.duplicate_months += 1;
            }
        }
    }

    summary.accounts = store.len();
    (store, summary)
}

/// Reads a CSV or spreadsheet file into an [`AccountStore`]. Unreadable
/// files fail as a whole; bad rows are skipped and counted.
pub fn load_file(file_path: &Path) -> Result<(AccountStore, ImportSummary)> {
    let kind = SourceKind::for_path(file_path)?;
    let rows = kind.read_rows(file_path)?;
    let (store, summary) = ingest_rows(rows);
    log::info!(
        "loaded {}: {} rows, {} accounts, {} records ({} without account, {} bad dates, {} duplicate months)",
        file_path.display(),
        summary.rows_read,
        summary.accounts,
        summary.records,
        summary.skipped_no_account,
        summary.skipped_bad_date,
        summary.duplicate_months
    );
    Ok((store, summary))
}
