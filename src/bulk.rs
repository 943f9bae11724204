use std::io::{Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{NetMeterError, Result};
use crate::models::AccountStore;
use crate::statement::{path_safe_id, statement_file_name, Statement};
use crate::window::BillingMonth;

pub const DEFAULT_ARCHIVE_NAME: &str = "utility_reports.zip";

/// One statement to render: an account and its statement month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub account_id: String,
    pub month: BillingMonth,
}

impl ExportJob {
    pub fn file_name(&self) -> String {
        statement_file_name(&self.account_id, self.month)
    }

    /// Path inside the archive: one folder per account.
    pub fn entry_name(&self) -> String {
        format!("{}/{}", path_safe_id(&self.account_id), self.file_name())
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: usize,
    pub failed: Vec<(ExportJob, String)>,
}

/// Every month from `from` through `to`, inclusive.
pub fn months_in_range(from: BillingMonth, to: BillingMonth) -> Result<Vec<BillingMonth>> {
    if from > to {
        return Err(NetMeterError::InvertedRange { from, to });
    }
    let mut months = Vec::new();
    let mut current = from;
    while current <= to {
        months.push(current);
        current = current.next();
    }
    Ok(months)
}

/// Validates the selection and expands it into jobs, account by account.
/// Nothing is rendered until every check has passed.
pub fn plan_batch(
    store: &AccountStore,
    selected: &[String],
    from: BillingMonth,
    to: BillingMonth,
) -> Result<Vec<ExportJob>> {
    if selected.is_empty() {
        return Err(NetMeterError::NoAccountsSelected);
    }
    let months = months_in_range(from, to)?;
    if let Some(unknown) = selected.iter().find(|id| !store.contains(id)) {
        return Err(NetMeterError::UnknownAccount(unknown.clone()));
    }

    let mut seen = std::collections::HashSet::new();
    let jobs = selected
        .iter()
        .filter(|id| seen.insert(*id))
        .flat_map(|id| {
            months.iter().map(move |&month| ExportJob {
                account_id: id.clone(),
                month,
            })
        })
        .collect();
    Ok(jobs)
}

/// Renders each job in turn and writes the documents into a ZIP archive.
///
/// `render` must return the finished document; the next job starts only
/// after it returns. A failed render is logged and left out of the archive
/// while the batch carries on. Archive and IO errors abort the batch.
pub fn write_archive<W, F>(
    writer: W,
    store: &AccountStore,
    jobs: &[ExportJob],
    mut render: F,
) -> Result<BatchSummary>
where
    W: Write + Seek,
    F: FnMut(&Statement) -> Result<Vec<u8>>,
{
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = BatchSummary::default();
    let mut folders = std::collections::HashSet::new();

    for job in jobs {
        let account = store
            .get(&job.account_id)
            .ok_or_else(|| NetMeterError::UnknownAccount(job.account_id.clone()))?;
        let statement = Statement::build(account, job.month);

        let bytes = match render(&statement) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("failed to render {}: {e}", job.file_name());
                summary.failed.push((job.clone(), e.to_string()));
                continue;
            }
        };

        let folder = path_safe_id(&job.account_id);
        if folders.insert(folder.clone()) {
            zip.add_directory(format!("{folder}/"), options)?;
        }
        zip.start_file(job.entry_name(), options)?;
        zip.write_all(&bytes)?;
        summary.written += 1;
        log::debug!("added {} ({} bytes)", job.entry_name(), bytes.len());
    }

    zip.finish()?;
    log::info!(
        "archive complete: {} written, {} failed",
        summary.written,
        summary.failed.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use chrono::NaiveDate;

    use super::*;
    use crate::importer::ingest_rows;
    use crate::models::{RawDate, RawRow};

    fn ym(year: i32, month: u32) -> BillingMonth {
        BillingMonth::new(year, month).unwrap()
    }

    fn store() -> AccountStore {
        let row = |id: &str, date: &str| RawRow {
            line: 2,
            account: Some(id.to_string()),
            settlement_month: Some("October".to_string()),
            billing_period: Some(RawDate::Text(date.to_string())),
            net_gen_consumption: Some(-10.0),
            ..Default::default()
        };
        let (store, _) = ingest_rows(vec![
            row("A1", "2023-10-01"),
            row("B2", "2023-11-01"),
            row("C3", "2023-12-01"),
        ]);
        store
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_months_in_range_crosses_year() {
        let months = months_in_range(ym(2023, 11), ym(2024, 2)).unwrap();
        let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(months_in_range(ym(2024, 2), ym(2024, 2)).unwrap().len(), 1);
    }

    #[test]
    fn test_months_in_range_rejects_inverted() {
        assert!(matches!(
            months_in_range(ym(2024, 3), ym(2024, 2)),
            Err(NetMeterError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_plan_batch_rejects_empty_selection() {
        let s = store();
        assert!(matches!(
            plan_batch(&s, &[], ym(2024, 1), ym(2024, 2)),
            Err(NetMeterError::NoAccountsSelected)
        ));
    }

    #[test]
    fn test_plan_batch_rejects_unknown_account() {
        let s = store();
        assert!(matches!(
            plan_batch(&s, &ids(&["A1", "ZZ"]), ym(2024, 1), ym(2024, 2)),
            Err(NetMeterError::UnknownAccount(id)) if id == "ZZ"
        ));
    }

    #[test]
    fn test_entry_name_stays_in_account_folder() {
        let job = ExportJob {
            account_id: "../../evil".to_string(),
            month: ym(2024, 1),
        };
        let name = job.entry_name();
        assert_eq!(name.matches('/').count(), 1);
        assert!(!name.contains(".."));

        let mut s = AccountStore::new();
        s.entry_or_insert_with("../../evil", || crate::models::Account::new("../../evil"));
        let mut buf = Cursor::new(Vec::new());
        write_archive(&mut buf, &s, &[job], |_| Ok(b"%PDF-stub".to_vec())).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        for i in 0..archive.len() {
            let entry = archive.by_index(i).unwrap();
            assert!(entry.enclosed_name().is_some(), "{} escapes", entry.name());
        }
    }

    #[test]
    fn test_plan_batch_orders_account_then_month() {
        let s = store();
        let jobs = plan_batch(&s, &ids(&["B2", "A1", "B2"]), ym(2023, 12), ym(2024, 1)).unwrap();
        let names: Vec<String> = jobs.iter().map(|j| j.entry_name()).collect();
        assert_eq!(
            names,
            vec![
                "B2/B2_2023-12.pdf",
                "B2/B2_2024-01.pdf",
                "A1/A1_2023-12.pdf",
                "A1/A1_2024-01.pdf",
            ]
        );
    }

    #[test]
    fn test_write_archive_packs_every_job() {
        let s = store();
        let jobs = plan_batch(&s, &s.ids(), ym(2024, 1), ym(2024, 2)).unwrap();
        let mut buf = Cursor::new(Vec::new());
        let summary = write_archive(&mut buf, &s, &jobs, |st| {
            Ok(format!("{}:{}", st.account.account_id, st.rows.len()).into_bytes())
        })
        .unwrap();
        assert_eq!(summary.written, 6);
        assert!(summary.failed.is_empty());

        let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        let mut entry = archive.by_name("B2/B2_2024-02.pdf").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "B2:12");
    }

    #[test]
    fn test_write_archive_skips_failed_renders() {
        let s = store();
        let jobs = plan_batch(&s, &s.ids(), ym(2024, 1), ym(2024, 1)).unwrap();
        let mut buf = Cursor::new(Vec::new());
        let summary = write_archive(&mut buf, &s, &jobs, |st| {
            if st.account.account_id == "B2" {
                Err(NetMeterError::Pdf("surface lost".into()))
            } else {
                Ok(b"%PDF-stub".to_vec())
            }
        })
        .unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0.account_id, "B2");

        let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        assert!(archive.by_name("A1/A1_2024-01.pdf").is_ok());
        assert!(archive.by_name("C3/C3_2024-01.pdf").is_ok());
        assert!(archive.by_name("B2/B2_2024-01.pdf").is_err());
    }

    #[test]
    fn test_write_archive_renders_sequentially_with_fresh_windows() {
        let s = store();
        let jobs = plan_batch(&s, &ids(&["A1"]), ym(2023, 11), ym(2024, 1)).unwrap();
        let mut seen = Vec::new();
        let mut buf = Cursor::new(Vec::new());
        write_archive(&mut buf, &s, &jobs, |st| {
            seen.push((st.statement_date, st.rows[11].month_label.clone()));
            Ok(Vec::new())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(), "Oct-23".to_string()),
                (NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(), "Nov-23".to_string()),
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "Dec-23".to_string()),
            ]
        );
    }
}
