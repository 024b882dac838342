//! Review command - transactions that lower the accuracy score, without a full estimate

use super::{read_transactions, PeriodArgs};
use clap::Args;
use serde::Serialize;
use smbtax::core::TransactionRecord;
use smbtax::tax::{format_usd, review_issues, score, AccuracyScore, ReviewIssue};
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReviewCommand {
    /// Transactions file (CSV or JSON). Reads JSON from stdin with "-".
    #[arg(short, long, default_value = "-")]
    transactions: PathBuf,

    #[command(flatten)]
    period: PeriodArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Transaction with at least one issue
#[derive(Debug, Serialize)]
struct FlaggedTransaction {
    id: Option<String>,
    date: String,
    amount: String,
    tax_category: Option<String>,
    tax_treatment: Option<String>,
    issues: Vec<ReviewIssue>,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ReviewOutput<'a> {
    accuracy: &'a AccuracyScore,
    issue_count: usize,
    transactions: &'a [FlaggedTransaction],
}

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Treatment")]
    treatment: String,
    #[tabled(rename = "Issues")]
    issues: String,
}

impl ReviewCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let transactions = self.period.filter(read_transactions(&self.transactions)?)?;
        let accuracy = score(&transactions);
        let flagged = flag_transactions(&transactions);
        let issue_count = flagged.iter().map(|f| f.issues.len()).sum();

        if self.json {
            let output = ReviewOutput {
                accuracy: &accuracy,
                issue_count,
                transactions: &flagged,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&flagged, &accuracy, issue_count);
        }

        // Exit with code 1 if issues found
        if issue_count > 0 {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn flag_transactions(transactions: &[TransactionRecord]) -> Vec<FlaggedTransaction> {
    transactions
        .iter()
        .filter_map(|tx| {
            let issues = review_issues(tx);
            if issues.is_empty() {
                return None;
            }
            Some(FlaggedTransaction {
                id: tx.id.clone(),
                date: tx.date.format("%Y-%m-%d").to_string(),
                amount: format_usd(tx.amount),
                tax_category: tx.tax_category.as_ref().map(|c| c.to_string()),
                tax_treatment: tx.tax_treatment.as_ref().map(|t| t.to_string()),
                issues,
            })
        })
        .collect()
}

fn print_text(flagged: &[FlaggedTransaction], accuracy: &AccuracyScore, issue_count: usize) {
    println!();
    println!("ACCURACY: {}/100", accuracy.score);
    for tip in &accuracy.tips {
        println!("  - {}", tip);
    }
    println!();

    if flagged.is_empty() {
        println!("No issues found");
        return;
    }

    let rows: Vec<IssueRow> = flagged
        .iter()
        .map(|f| IssueRow {
            date: f.date.clone(),
            id: f.id.clone().unwrap_or_default(),
            amount: f.amount.clone(),
            category: f.tax_category.clone().unwrap_or_else(|| "-".to_string()),
            treatment: f.tax_treatment.clone().unwrap_or_else(|| "-".to_string()),
            issues: f
                .issues
                .iter()
                .map(ReviewIssue::message)
                .collect::<Vec<_>>()
                .join("; "),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!(
        "{} issue(s) across {} transaction(s)",
        issue_count,
        flagged.len()
    );
}
