//! Breakdown command - signed totals per tax bucket

use super::{read_transactions, PeriodArgs};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use smbtax::core::{aggregate, classify, TaxBucket, TransactionRecord};
use smbtax::tax::format_usd;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct BreakdownCommand {
    /// Transactions file (CSV or JSON). Reads JSON from stdin with "-".
    #[arg(short, long, default_value = "-")]
    transactions: PathBuf,

    #[command(flatten)]
    period: PeriodArgs,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

/// Row for the breakdown output
#[derive(Debug, Clone, Tabled, Serialize)]
struct BucketRow {
    #[tabled(rename = "Bucket")]
    bucket: String,

    #[tabled(rename = "Transactions")]
    transactions: usize,

    #[tabled(rename = "Total")]
    #[serde(skip)]
    total_display: String,

    #[tabled(skip)]
    total: Decimal,
}

impl BreakdownCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let transactions = self.period.filter(read_transactions(&self.transactions)?)?;
        let rows = build_rows(&transactions);

        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows, &transactions);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[BucketRow], transactions: &[TransactionRecord]) {
        if rows.is_empty() {
            println!("No transactions found in period");
            return;
        }

        let totals = aggregate(transactions);
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!(
            "Net: {} across {} transactions ({} uncategorized)",
            format_usd(totals.net()),
            totals.total_count,
            totals.uncategorized_count
        );
    }

    fn write_csv(&self, rows: &[BucketRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn build_rows(transactions: &[TransactionRecord]) -> Vec<BucketRow> {
    let totals = aggregate(transactions);
    let mut counts: BTreeMap<TaxBucket, usize> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| !tx.amount.is_zero()) {
        *counts.entry(classify(tx)).or_default() += 1;
    }

    totals
        .totals
        .iter()
        .map(|(bucket, total)| BucketRow {
            bucket: bucket.to_string(),
            transactions: counts.get(bucket).copied().unwrap_or_default(),
            total_display: format_usd(*total),
            total: *total,
        })
        .collect()
}
