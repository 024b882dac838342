pub mod breakdown;
pub mod estimate;
pub mod review;
pub mod schema;

use chrono::NaiveDate;
use clap::Args;
use schemars::JsonSchema;
use serde::Deserialize;
use smbtax::core::{
    read_payroll_csv, read_transactions_csv, read_transactions_json, BusinessTaxProfile,
    PayrollRunRecord, Period, TransactionRecord,
};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Document read by `smbtax estimate`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EstimateInput {
    /// Inclusive reporting period
    pub period: Period,
    #[serde(default)]
    pub profile: BusinessTaxProfile,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub payroll_runs: Vec<PayrollRunRecord>,
}

/// Optional period bounds given on the command line
#[derive(Args, Debug, Default)]
pub struct PeriodArgs {
    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl PeriodArgs {
    /// Replace the bounds of `base` with any given on the command line
    pub fn resolve(&self, base: Period) -> anyhow::Result<Period> {
        let from = self.from.unwrap_or(base.from);
        let to = self.to.unwrap_or(base.to);
        Ok(Period::new(from, to)?)
    }

    /// Keep transactions within the given bounds; a missing bound is open
    pub fn filter(&self, transactions: Vec<TransactionRecord>) -> anyhow::Result<Vec<TransactionRecord>> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            Period::new(from, to)?;
        }
        Ok(transactions
            .into_iter()
            .filter(|tx| self.from.map_or(true, |from| tx.date >= from))
            .filter(|tx| self.to.map_or(true, |to| tx.date <= to))
            .collect())
    }
}

/// Read the whole of a file, or stdin with "-"
fn read_source(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if path.as_os_str() == "-" {
        let stdin = io::stdin();
        BufReader::new(stdin.lock()).read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
    } else {
        BufReader::new(File::open(path)?).read_to_end(&mut buffer)?;
    }
    Ok(buffer)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

pub fn read_estimate_input(path: &Path) -> anyhow::Result<EstimateInput> {
    let buffer = read_source(path)?;
    let input = serde_json::from_slice(&buffer)?;
    Ok(input)
}

/// Read transactions from CSV (by extension) or JSON
pub fn read_transactions(path: &Path) -> anyhow::Result<Vec<TransactionRecord>> {
    let buffer = read_source(path)?;
    let transactions = if is_csv(path) {
        read_transactions_csv(buffer.as_slice())?
    } else {
        read_transactions_json(buffer.as_slice())?
    };
    log::info!("Read {} transactions from {}", transactions.len(), path.display());
    Ok(transactions)
}

pub fn read_payroll(path: &Path) -> anyhow::Result<Vec<PayrollRunRecord>> {
    let buffer = read_source(path)?;
    Ok(read_payroll_csv(buffer.as_slice())?)
}
