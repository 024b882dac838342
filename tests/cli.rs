//! E2E tests for the smbtax binary

use std::process::{Command, Output};

fn smbtax(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Formatted estimate shows every section
#[test]
fn estimate_text_report() {
    let output = smbtax(&["estimate", "-i", "tests/data/sole_prop_2024.json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("TAX ESTIMATE (2024-01-01 to 2024-12-31)"));
    assert!(stdout.contains("sole proprietorship"));
    assert!(stdout.contains("Taxable profit: $59820"));
    assert!(stdout.contains("TOTAL ESTIMATED TAX: $15921.19"));
    assert!(stdout.contains("FEDERAL BRACKETS"));
    assert!(stdout.contains("QUARTERLY PAYMENTS"));
    assert!(stdout.contains("2025-01-15"));
    assert!(stdout.contains("ACCURACY: 81/100"));
}

/// JSON estimate carries exact figures
#[test]
fn estimate_json_report() {
    let output = smbtax(&["estimate", "-i", "tests/data/sole_prop_2024.json", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let report = json(&output);

    assert_eq!(report["income"]["gross_income"], "100000");
    assert_eq!(report["income"]["deductible_expenses"], "40180");
    assert_eq!(report["income"]["capitalized_expenses"], "1200");
    assert_eq!(report["income"]["excluded_non_operating"], "-5000");
    assert_eq!(report["income"]["transactions_in_period"], 9);
    assert_eq!(report["taxes"]["self_employment"]["total"], "8452.30");
    assert_eq!(report["metadata"]["half_se_deduction"], "4226.15");
    assert_eq!(report["taxes"]["federal_income_tax"], "4687.26");
    assert_eq!(report["taxes"]["state_income_tax"], "2781.63");
    assert_eq!(report["taxes"]["sales_tax"]["liability"], "240");
    assert_eq!(report["taxes"]["total_estimated_tax"], "15921.19");
    assert_eq!(report["metadata"]["state_code"], "UT");
    assert_eq!(report["quarterly_plan"][0]["amount"], "3980.2975");
    assert_eq!(report["quarterly_plan"][0]["due_date"], "2024-04-15");
    assert_eq!(report["accuracy"]["score"], 81);
    assert_eq!(report["applicability"]["sales_tax"]["enabled"], true);
}

/// --from/--to override the input period
#[test]
fn estimate_period_override() {
    let output = smbtax(&[
        "estimate",
        "-i",
        "tests/data/sole_prop_2024.json",
        "--from",
        "2024-01-01",
        "--to",
        "2024-03-31",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let report = json(&output);
    assert_eq!(report["period"]["to"], "2024-03-31");
    assert_eq!(report["income"]["gross_income"], "42000");
    assert_eq!(report["income"]["transactions_in_period"], 2);
}

#[test]
fn estimate_rejects_reversed_period() {
    let output = smbtax(&[
        "estimate",
        "-i",
        "tests/data/sole_prop_2024.json",
        "--from",
        "2024-12-31",
        "--to",
        "2024-01-01",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("before period start"));
}

/// Payroll runs from CSV with a legacy entity type
#[test]
fn estimate_with_payroll_csv() {
    let output = smbtax(&[
        "estimate",
        "-i",
        "tests/data/s_corp_payroll.json",
        "--payroll",
        "tests/data/payroll.csv",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let report = json(&output);
    assert_eq!(report["metadata"]["entity_type"], "s_corp");
    assert_eq!(report["taxes"]["payroll"]["runs_in_period"], 2);
    assert_eq!(report["taxes"]["payroll"]["employer_payroll_tax"], "612");
    assert_eq!(report["taxes"]["self_employment"]["total"], "0");
    assert_eq!(report["taxes"]["federal_income_tax"], "0");
    assert_eq!(report["taxes"]["total_estimated_tax"], "612");
}

#[test]
fn estimate_with_custom_tables() {
    let output = smbtax(&[
        "estimate",
        "-i",
        "tests/data/sole_prop_2024.json",
        "--tables",
        "tests/data/tables_2023.json",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let report = json(&output);
    assert_eq!(report["metadata"]["tax_year"], 2024);
    assert_eq!(report["metadata"]["table_year"], 2023);
    assert_eq!(report["metadata"]["standard_deduction"], "13850");
}

/// Same input, same fingerprint
#[test]
fn estimate_fingerprint_is_stable() {
    let args = ["estimate", "-i", "tests/data/sole_prop_2024.json", "--fingerprint"];
    let first = smbtax(&args);
    let second = smbtax(&args);
    assert!(first.status.success(), "Command failed: {:?}", first);
    let fingerprint = String::from_utf8_lossy(&first.stdout).trim().to_string();
    assert_eq!(fingerprint.len(), 64);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn breakdown_table() {
    let output = smbtax(&["breakdown", "-t", "tests/data/transactions.csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("gross_receipts"));
    assert!(stdout.contains("uncategorized"));
    assert!(stdout.contains("$7500.00"));
    assert!(stdout.contains("Net: $6000.00 across 6 transactions (2 uncategorized)"));
}

#[test]
fn breakdown_csv() {
    let output = smbtax(&["breakdown", "-t", "tests/data/transactions.csv", "--csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "bucket,transactions,total",
            "gross_receipts,2,7500",
            "deductible_expense,1,-120.5",
            "transfer,1,-1000",
            "uncategorized,2,-380",
        ]
    );
}

#[test]
fn breakdown_filters_by_period() {
    let output = smbtax(&[
        "breakdown",
        "-t",
        "tests/data/transactions.csv",
        "--from",
        "2024-02-01",
        "--to",
        "2024-02-28",
        "--csv",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("uncategorized,2,-380"));
    assert!(!stdout.contains("gross_receipts"));
}

/// Review exits non-zero when issues are found
#[test]
fn review_reports_issues() {
    let output = smbtax(&["review", "-t", "tests/data/transactions.csv", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let review = json(&output);

    let flagged = review["transactions"].as_array().unwrap();
    let ids: Vec<_> = flagged.iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"t3"));
    assert!(ids.contains(&"t4"));
    assert!(ids.contains(&"t5"));
    assert!(!ids.contains(&"t1"));
    assert!(review["issue_count"].as_u64().unwrap() > 0);
    assert!(review["accuracy"]["score"].as_u64().unwrap() <= 100);
}

#[test]
fn review_clean_file_succeeds() {
    let output = smbtax(&["review", "-t", "tests/data/clean_transactions.csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("ACCURACY: 96/100"));
    assert!(stdout.contains("No issues found"));
}

#[test]
fn schema_input_and_report() {
    let output = smbtax(&["schema", "input"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let schema = json(&output);
    assert!(schema["properties"]["transactions"].is_object());
    assert!(schema["properties"]["period"].is_object());

    let output = smbtax(&["schema", "report"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let schema = json(&output);
    assert!(schema["properties"]["quarterly_plan"].is_object());
}

#[test]
fn schema_csv_header() {
    let output = smbtax(&["schema", "csv-header"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_eq!(
        stdout.trim(),
        "id,date,amount,tax_category,tax_treatment,confidence,description"
    );

    let output = smbtax(&["schema", "csv-header", "--payroll"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        "run_date,gross_wages,employer_payroll_tax,employee_withholding"
    );
}
