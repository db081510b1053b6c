//! CLI integration tests: JSON fixtures in, per-line report out.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture writes");
    path
}

fn statement_json() -> &'static str {
    r#"[
        {
            "date": "2026-02-03",
            "description": "CREDIT CARD SALES DEPOSIT 0099",
            "debit": null,
            "credit": "215370.52",
            "account": "038900320016",
            "sheet": "CARD"
        },
        {
            "date": "2026-02-03",
            "description": "WIRE TRANSFER FEE",
            "debit": "6.00",
            "credit": null,
            "account": "055003730017",
            "sheet": "CASH"
        },
        {
            "date": "2026-02-03",
            "description": "SOMETHING NOBODY CLASSIFIES",
            "debit": null,
            "credit": "10.00",
            "account": "055003730017",
            "sheet": "CASH"
        }
    ]"#
}

fn treasury_json() -> &'static str {
    r#"[
        {
            "close_date": "2026-02-01",
            "sheet": "01",
            "invoices": [],
            "global_invoice_number": "20204",
            "global_invoice_amount": "725897.52",
            "total_sales": "725897.52",
            "total_cash": "391815.04",
            "total_card": "334082.48",
            "total_other": null,
            "treasury_folio": null
        }
    ]"#
}

#[test]
fn run_dry_reports_each_line() {
    let dir = tempfile::tempdir().unwrap();
    let statement = write_fixture(dir.path(), "statement.json", statement_json());
    let treasury = write_fixture(dir.path(), "treasury.json", treasury_json());

    Command::cargo_bin("bankrecon")
        .unwrap()
        .arg("run")
        .arg("--statement")
        .arg(&statement)
        .arg("--treasury")
        .arg(&treasury)
        .env_remove("BANKRECON_DB")
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY-RUN SUMMARY"))
        .stdout(predicate::str::contains("INSERT"))
        .stdout(predicate::str::contains("UNKNOWN"))
        .stdout(predicate::str::contains("215370.52"));
}

#[test]
fn run_commit_requires_database_path() {
    let dir = tempfile::tempdir().unwrap();
    let statement = write_fixture(dir.path(), "statement.json", statement_json());

    Command::cargo_bin("bankrecon")
        .unwrap()
        .arg("run")
        .arg("--statement")
        .arg(&statement)
        .arg("--commit")
        .env_remove("BANKRECON_DB")
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no database path"));
}

#[test]
fn run_commit_writes_and_rerun_skips() {
    let dir = tempfile::tempdir().unwrap();
    let statement = write_fixture(dir.path(), "statement.json", statement_json());
    let treasury = write_fixture(dir.path(), "treasury.json", treasury_json());
    let db = dir.path().join("recon.db");

    Command::cargo_bin("bankrecon")
        .unwrap()
        .args(["init-db", "--db"])
        .arg(&db)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema applied"));

    Command::cargo_bin("bankrecon")
        .unwrap()
        .arg("run")
        .arg("--statement")
        .arg(&statement)
        .arg("--treasury")
        .arg(&treasury)
        .arg("--commit")
        .arg("--db")
        .arg(&db)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUMMARY"));

    // Idempotency across processes: a second committed run inserts
    // nothing new.
    Command::cargo_bin("bankrecon")
        .unwrap()
        .arg("run")
        .arg("--statement")
        .arg(&statement)
        .arg("--treasury")
        .arg(&treasury)
        .arg("--commit")
        .arg("--db")
        .arg(&db)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already registered and reconciled"));
}

#[test]
fn classify_prints_kind_counts() {
    let dir = tempfile::tempdir().unwrap();
    let statement = write_fixture(dir.path(), "statement.json", statement_json());

    Command::cargo_bin("bankrecon")
        .unwrap()
        .args(["classify", "--statement"])
        .arg(&statement)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("CardCreditSale"))
        .stdout(predicate::str::contains("FeeWire"))
        .stdout(predicate::str::contains("1 unclassified"));
}

#[test]
fn check_db_probes_connection() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("recon.db");

    Command::cargo_bin("bankrecon")
        .unwrap()
        .args(["init-db", "--db"])
        .arg(&db)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success();

    Command::cargo_bin("bankrecon")
        .unwrap()
        .args(["check-db", "--db"])
        .arg(&db)
        .env_remove("BANKRECON_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("Connection OK"));
}

#[test]
fn missing_statement_file_fails() {
    Command::cargo_bin("bankrecon")
        .unwrap()
        .args(["classify", "--statement", "/nonexistent/statement.json"])
        .assert()
        .failure();
}
