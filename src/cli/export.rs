use std::path::{Path, PathBuf};

use crate::bulk::{plan_batch, write_archive, DEFAULT_ARCHIVE_NAME};
use crate::cli::{find_account, load_store, statement_month};
use crate::error::Result;
use crate::pdf::render_statement;
use crate::settings::load_settings;
use crate::statement::Statement;
use crate::window::BillingMonth;

fn write_file(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn single(file: &str, account_id: &str, month: Option<&str>, output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let store = load_store(file)?;
    let account = find_account(&store, account_id)?;
    let month = statement_month(account, month)?;

    let statement = Statement::build(account, month);
    let bytes = render_statement(&statement, &settings)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.export_path().join(statement.file_name()));
    write_file(&bytes, &path)
}

pub fn bulk(
    file: &str,
    accounts: Vec<String>,
    from: &str,
    to: &str,
    output: Option<String>,
) -> Result<()> {
    let from: BillingMonth = from.parse()?;
    let to: BillingMonth = to.parse()?;
    let settings = load_settings();
    let store = load_store(file)?;

    let selected = if accounts.is_empty() { store.ids() } else { accounts };
    let jobs = plan_batch(&store, &selected, from, to)?;

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.export_path().join(DEFAULT_ARCHIVE_NAME));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    println!("Generating {} statements...", jobs.len());
    let archive = std::fs::File::create(&path)?;
    let summary = write_archive(archive, &store, &jobs, |st| render_statement(st, &settings))?;

    println!("Wrote {} ({} statements)", path.display(), summary.written);
    if !summary.failed.is_empty() {
        println!("{} statements failed and were left out:", summary.failed.len());
        for (job, reason) in &summary.failed {
            println!("  {}: {reason}", job.file_name());
        }
    }
    Ok(())
}
