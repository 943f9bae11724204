use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BILLING_CSV: &str = "\
Account,Service Address,Mailing Address,Settlement Month,Billing Period,Net_Gen_Consumption,Annual_Net_Surplus,Net_Surplus_Cash_Value
1001,12 Oak St,\"Jane Doe, 12 Oak St, Palo Alto, CA 94306\",May,2023-05-15,-150,320,12.50
1001,,,,2023-06-15,40,280,0
2002,9 Elm Ave,,March,06/20/2023,75,0,0
,orphan row,,,2023-06-15,1,1,1
";

fn setup() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("billing.csv");
    std::fs::write(&csv, BILLING_CSV).unwrap();
    (dir, csv.to_string_lossy().to_string())
}

fn netmeter(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("netmeter").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_accounts_lists_every_account() {
    let (dir, csv) = setup();
    netmeter(dir.path())
        .args(["accounts", &csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("1001"))
        .stdout(predicate::str::contains("2002"))
        .stdout(predicate::str::contains("2 accounts"))
        .stderr(predicate::str::contains("1 rows without an account"));
}

#[test]
fn test_report_prints_window_and_callout() {
    let (dir, csv) = setup();
    netmeter(dir.path())
        .args(["report", &csv, "--account", "1001", "--month", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jan-23"))
        .stdout(predicate::str::contains("Dec-23"))
        .stdout(predicate::str::contains("-150 kWh"))
        .stdout(predicate::str::contains(
            "$12.50 credited to customer in May 2023. Next settlement month will be May 2024.",
        ));
}

#[test]
fn test_report_unknown_account_fails() {
    let (dir, csv) = setup();
    netmeter(dir.path())
        .args(["report", &csv, "--account", "9999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("9999"));
}

#[test]
fn test_report_rejects_bad_month() {
    let (dir, csv) = setup();
    netmeter(dir.path())
        .args(["report", &csv, "--account", "1001", "--month", "January"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    netmeter(dir.path())
        .args(["accounts", "/nonexistent/billing.csv"])
        .assert()
        .failure();
}

#[cfg(feature = "pdf")]
#[test]
fn test_export_writes_pdf() {
    let (dir, csv) = setup();
    let out = dir.path().join("out").join("statement.pdf");
    netmeter(dir.path())
        .args(["export", &csv, "--account", "1001", "--month", "2024-01", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[cfg(feature = "pdf")]
#[test]
fn test_bulk_writes_archive() {
    let (dir, csv) = setup();
    let out = dir.path().join("reports.zip");
    netmeter(dir.path())
        .args(["bulk", &csv, "--account", "1001", "--account", "2002"])
        .args(["--from", "2024-01", "--to", "2024-02", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 statements"));

    let file = std::fs::File::open(&out).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(names.contains(&"1001/1001_2024-01.pdf".to_string()));
    assert!(names.contains(&"2002/2002_2024-02.pdf".to_string()));
}

#[cfg(feature = "pdf")]
#[test]
fn test_bulk_inverted_range_fails_without_archive() {
    let (dir, csv) = setup();
    let out = dir.path().join("reports.zip");
    netmeter(dir.path())
        .args(["bulk", &csv, "--from", "2024-03", "--to", "2024-01", "--output"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    assert!(!out.exists());
}

#[cfg(feature = "pdf")]
#[test]
fn test_bulk_unknown_account_fails() {
    let (dir, csv) = setup();
    let out = dir.path().join("reports.zip");
    netmeter(dir.path())
        .args(["bulk", &csv, "--account", "4242", "--from", "2024-01", "--to", "2024-01", "--output"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("4242"));
    assert!(!out.exists());
}

#[test]
fn test_config_rate_persists() {
    let dir = TempDir::new().unwrap();
    netmeter(dir.path())
        .args(["config", "rate", "2025", "0.16"])
        .assert()
        .success();
    netmeter(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025"))
        .stdout(predicate::str::contains("0.1600 $/kWh"));
}

#[test]
fn test_completions_prints_script() {
    let dir = TempDir::new().unwrap();
    netmeter(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("netmeter"));
}
