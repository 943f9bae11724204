pub mod accounts;
pub mod config;
#[cfg(feature = "pdf")]
pub mod export;
pub mod report;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::error::{NetMeterError, Result};
use crate::importer::load_file;
use crate::models::{Account, AccountStore};
use crate::statement::default_statement_month;
use crate::window::BillingMonth;

pub(crate) fn load_store(file: &str) -> Result<AccountStore> {
    let (store, summary) = load_file(Path::new(file))?;
    if summary.skipped_no_account + summary.skipped_bad_date > 0 {
        eprintln!(
            "Note: {} rows without an account and {} rows without a usable billing period were skipped.",
            summary.skipped_no_account, summary.skipped_bad_date
        );
    }
    Ok(store)
}

pub(crate) fn find_account<'a>(store: &'a AccountStore, account_id: &str) -> Result<&'a Account> {
    store
        .get(account_id.trim())
        .ok_or_else(|| NetMeterError::UnknownAccount(account_id.to_string()))
}

/// `--month` if given, otherwise the month after the account's last record.
pub(crate) fn statement_month(account: &Account, month: Option<&str>) -> Result<BillingMonth> {
    match month {
        Some(m) => m.parse(),
        None => Ok(default_statement_month(
            account,
            chrono::Local::now().date_naive(),
        )),
    }
}

#[derive(Parser)]
#[command(
    name = "netmeter",
    version,
    about = "Twelve-month net metering statements from utility billing spreadsheets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the accounts found in a billing file.
    Accounts {
        /// Path to CSV or XLSX billing file
        file: String,
    },
    /// Print an account's statement to the terminal.
    Report {
        /// Path to CSV or XLSX billing file
        file: String,
        /// Account number
        #[arg(long)]
        account: String,
        /// Statement month: YYYY-MM (default: month after the last billing period)
        #[arg(long)]
        month: Option<String>,
    },
    /// Export one statement to PDF.
    #[cfg(feature = "pdf")]
    Export {
        /// Path to CSV or XLSX billing file
        file: String,
        /// Account number
        #[arg(long)]
        account: String,
        /// Statement month: YYYY-MM (default: month after the last billing period)
        #[arg(long)]
        month: Option<String>,
        /// Output file path (default: <export_dir>/<account>_<YYYY>-<MM>.pdf)
        #[arg(long)]
        output: Option<String>,
    },
    /// Export statements for many accounts and months into one ZIP archive.
    #[cfg(feature = "pdf")]
    Bulk {
        /// Path to CSV or XLSX billing file
        file: String,
        /// Account number; repeat for several (default: every account)
        #[arg(long = "account")]
        accounts: Vec<String>,
        /// First statement month: YYYY-MM
        #[arg(long = "from")]
        from: String,
        /// Last statement month: YYYY-MM
        #[arg(long = "to")]
        to: String,
        /// Output archive path (default: <export_dir>/utility_reports.zip)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current settings.
    Show,
    /// Update statement and export settings.
    Set {
        /// Directory for exported PDFs and archives
        #[arg(long = "export-dir")]
        export_dir: Option<String>,
        /// Utility name printed in the statement header
        #[arg(long = "utility-name")]
        utility_name: Option<String>,
        /// Net metering information URL
        #[arg(long = "info-url")]
        info_url: Option<String>,
        /// Customer service phone number
        #[arg(long)]
        phone: Option<String>,
        /// Customer service email
        #[arg(long)]
        email: Option<String>,
    },
    /// Set the net surplus compensation rate for a fiscal year.
    Rate {
        /// Fiscal year, e.g. 2024
        year: i32,
        /// Rate in $/kWh, e.g. 0.1535
        rate: f64,
    },
}
