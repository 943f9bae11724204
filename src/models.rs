use std::collections::BTreeMap;

use chrono::NaiveDate;

/// One billing period for one account, as read from a spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingRecord {
    pub date: NaiveDate,
    pub net_gen_consumption: f64,
    pub annual_net_surplus: f64,
    pub net_surplus_cash_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: String,
    pub service_address: String,
    pub mailing_address: String,
    pub settlement_month: String,
    /// Sorted ascending by date once ingestion finishes.
    pub records: Vec<BillingRecord>,
}

impl Account {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            service_address: String::new(),
            mailing_address: String::new(),
            settlement_month: String::new(),
            records: Vec::new(),
        }
    }

    pub fn first_record(&self) -> Option<&BillingRecord> {
        self.records.first()
    }

    pub fn last_record(&self) -> Option<&BillingRecord> {
        self.records.last()
    }
}

/// One slot of a twelve-month report window. The numeric fields are `None`
/// when the account has no record for that calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub month_label: String,
    pub date: NaiveDate,
    pub net_gen_consumption: Option<f64>,
    pub annual_net_surplus: Option<f64>,
    pub net_surplus_cash_value: Option<f64>,
    pub is_projected: bool,
}

/// All accounts parsed from one input file, keyed by account id.
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: BTreeMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account_id: &str) -> Option<&Account> {
        self.accounts.get(account_id)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.accounts.contains_key(account_id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub(crate) fn entry_or_insert_with(
        &mut self,
        account_id: &str,
        init: impl FnOnce() -> Account,
    ) -> &mut Account {
        self.accounts
            .entry(account_id.to_string())
            .or_insert_with(init)
    }

    pub(crate) fn accounts_mut(&mut self) -> impl Iterator<Item = &mut Account> {
        self.accounts.values_mut()
    }
}

/// Intermediate representation of a spreadsheet row before it is folded
/// into an [`AccountStore`].
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based row number in the source sheet, header included.
    pub line: usize,
    pub account: Option<String>,
    pub service_address: Option<String>,
    pub mailing_address: Option<String>,
    pub settlement_month: Option<String>,
    pub billing_period: Option<RawDate>,
    pub net_gen_consumption: Option<f64>,
    pub annual_net_surplus: Option<f64>,
    pub net_surplus_cash_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    Date(NaiveDate),
    Serial(f64),
    Text(String),
}
