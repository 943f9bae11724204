use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::{NetMeterError, Result};
use crate::models::{BillingRecord, ReportRow};

/// Number of calendar months in a report window.
pub const WINDOW_MONTHS: usize = 12;

// ---------------------------------------------------------------------------
// BillingMonth
// ---------------------------------------------------------------------------

/// A calendar month. Field order gives chronological `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// `month` is 1-based (1 = January).
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && NaiveDate::from_ymd_opt(year, month, 1).is_some() {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// `month0` is 0-based (0 = January), as in the report selector.
    pub fn from_zero_based(month0: u32, year: i32) -> Result<Self> {
        month0
            .checked_add(1)
            .and_then(|m| Self::new(year, m))
            .ok_or_else(|| NetMeterError::InvalidMonth(format!("month index {month0} of {year}")))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructors only admit months whose 1st is representable.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Calendar arithmetic: moves `n` months forward (or back when negative).
    pub fn shift(&self, n: i32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) + n;
        Self {
            year: total.div_euclid(12),
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn prev(&self) -> Self {
        self.shift(-1)
    }

    /// Short label such as `Mar-23`.
    pub fn label(&self) -> String {
        self.first_day().format("%b-%y").to_string()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = NetMeterError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NetMeterError::InvalidMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        let month0 = month.checked_sub(1).ok_or_else(invalid)?;
        Self::from_zero_based(month0, year).map_err(|_| invalid())
    }
}

// ---------------------------------------------------------------------------
// Window builder
// ---------------------------------------------------------------------------

/// Builds the twelve calendar months ending at `target`, oldest first.
///
/// Each slot takes the first record (in the account's sorted order) dated
/// anywhere inside that month. Months without a record come back projected,
/// with every numeric field `None`.
pub fn build_window(records: &[BillingRecord], target: BillingMonth) -> Vec<ReportRow> {
    let start = target.shift(-(WINDOW_MONTHS as i32 - 1));
    let rows: Vec<ReportRow> = (0..WINDOW_MONTHS as i32)
        .map(|offset| {
            let month = start.shift(offset);
            let record = records.iter().find(|r| month.contains(r.date));
            ReportRow {
                month_label: month.label(),
                date: month.first_day(),
                net_gen_consumption: record.map(|r| r.net_gen_consumption),
                annual_net_surplus: record.map(|r| r.annual_net_surplus),
                net_surplus_cash_value: record.map(|r| r.net_surplus_cash_value),
                is_projected: record.is_none(),
            }
        })
        .collect();

    log::debug!(
        "window {}..{}: {} of {} months projected",
        start,
        target,
        rows.iter().filter(|r| r.is_projected).count(),
        WINDOW_MONTHS
    );
    rows
}

/// Row whose label starts with the first three letters of the settlement
/// month name, e.g. "October" picks "Oct-23".
pub fn find_settlement_row<'a>(rows: &'a [ReportRow], settlement_month: &str) -> Option<&'a ReportRow> {
    let name = settlement_month.trim();
    let prefix: String = name.chars().take(3).collect();
    if prefix.is_empty() {
        return None;
    }
    rows.iter().find(|row| {
        row.month_label
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
    })
}
