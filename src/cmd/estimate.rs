//! Estimate command - full tax estimate and quarterly plan for a period

use super::{read_estimate_input, read_payroll, PeriodArgs};
use clap::Args;
use rust_decimal::Decimal;
use smbtax::tax::{format_usd, Applicability, Estimator, TaxReport, TaxTables};
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EstimateCommand {
    /// JSON input with period, profile, transactions and payroll_runs. Reads stdin with "-".
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// JSON tax tables to use instead of the built-in ones
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Payroll runs CSV, replacing any payroll_runs in the input
    #[arg(long)]
    payroll: Option<PathBuf>,

    #[command(flatten)]
    period: PeriodArgs,

    /// Output the report as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Print only the report fingerprint
    #[arg(long)]
    fingerprint: bool,
}

impl EstimateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut input = read_estimate_input(&self.input)?;
        let period = self.period.resolve(input.period)?;
        if let Some(ref path) = self.payroll {
            input.payroll_runs = read_payroll(path)?;
        }

        let estimator = match self.tables {
            Some(ref path) => {
                let estimator = Estimator::new(TaxTables::from_json_reader(BufReader::new(
                    File::open(path)?,
                ))?);
                log::info!(
                    "Loaded tax tables for {:?} from {}",
                    estimator.tables().years().collect::<Vec<_>>(),
                    path.display()
                );
                estimator
            }
            None => Estimator::default(),
        };

        let report = estimator.estimate(
            &input.profile,
            &input.transactions,
            &input.payroll_runs,
            period,
        );

        if self.fingerprint {
            println!("{}", report.fingerprint()?);
        } else if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct TaxRow {
    #[tabled(rename = "Tax")]
    tax: &'static str,
    #[tabled(rename = "Applies")]
    applies: &'static str,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl TaxRow {
    fn new(tax: &'static str, applicability: &Applicability, amount: String) -> Self {
        TaxRow {
            tax,
            applies: if applicability.enabled { "yes" } else { "no" },
            amount,
            reason: applicability.reason.clone(),
        }
    }
}

#[derive(Tabled)]
struct BracketRow {
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "From")]
    lower: String,
    #[tabled(rename = "To")]
    upper: String,
    #[tabled(rename = "Taxable")]
    taxable: String,
    #[tabled(rename = "Tax")]
    tax: String,
}

#[derive(Tabled)]
struct InstallmentRow {
    #[tabled(rename = "Quarter")]
    quarter: String,
    #[tabled(rename = "Due")]
    due_date: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

fn print_report(report: &TaxReport) {
    let meta = &report.metadata;
    let income = &report.income;
    let taxes = &report.taxes;
    let flags = &report.applicability;

    println!();
    println!("TAX ESTIMATE ({})", report.period);
    println!(
        "  Entity: {} | Filing status: {} | Tax tables: {}",
        meta.entity_type, meta.filing_status, meta.table_year
    );
    println!();

    println!("INCOME");
    println!(
        "  Gross income: {} | Deductible: {} | Non-deductible: {}",
        format_usd(income.gross_income),
        format_usd(income.deductible_expenses),
        format_usd(income.non_deductible_expenses)
    );
    println!(
        "  Capitalized: {} | Non-operating (excluded): {}",
        format_usd(income.capitalized_expenses),
        format_usd(income.excluded_non_operating)
    );
    println!(
        "  Taxable profit: {} ({} transactions)",
        format_usd(income.taxable_profit),
        income.transactions_in_period
    );
    println!(
        "  Federal taxable income: {} (standard deduction {}, half SE tax {})",
        format_usd(meta.federal_taxable_income),
        format_usd(meta.standard_deduction),
        format_usd(meta.half_se_deduction)
    );
    println!();

    let rows = vec![
        TaxRow::new(
            "Federal income",
            &flags.federal_income,
            format_usd(taxes.federal_income_tax),
        ),
        TaxRow::new(
            "State income",
            &flags.state_income,
            format_usd(taxes.state_income_tax),
        ),
        TaxRow::new(
            "Self-employment",
            &flags.self_employment,
            format_usd(taxes.self_employment.total),
        ),
        TaxRow::new(
            "Employer payroll",
            &flags.payroll,
            format_usd(taxes.payroll.employer_payroll_tax),
        ),
        TaxRow::new(
            "Sales tax (separate)",
            &flags.sales_tax,
            format_usd(taxes.sales_tax.liability),
        ),
    ];
    println!("TAXES");
    print_table(Table::new(rows), 2..3);
    println!("TOTAL ESTIMATED TAX: {}", format_usd(taxes.total_estimated_tax));
    println!();

    if !taxes.federal_brackets.is_empty() {
        let rows: Vec<BracketRow> = taxes
            .federal_brackets
            .iter()
            .map(|s| BracketRow {
                rate: format!("{}%", (s.rate * Decimal::ONE_HUNDRED).normalize()),
                lower: format_usd(s.lower),
                upper: s.upper.map_or_else(|| "-".to_string(), format_usd),
                taxable: format_usd(s.taxable),
                tax: format_usd(s.tax),
            })
            .collect();
        println!("FEDERAL BRACKETS");
        print_table(Table::new(rows), 1..5);
    }

    let rows: Vec<InstallmentRow> = report
        .quarterly_plan
        .iter()
        .map(|q| InstallmentRow {
            quarter: format!("Q{}", q.quarter),
            due_date: q.due_date.format("%Y-%m-%d").to_string(),
            amount: format_usd(q.amount.round_dp(2)),
        })
        .collect();
    println!("QUARTERLY PAYMENTS");
    print_table(Table::new(rows), 2..3);

    println!("ACCURACY: {}/100", report.accuracy.score);
    for tip in &report.accuracy.tips {
        println!("  - {}", tip);
    }
    println!();
    println!("{}", report.summary);
    println!();
}

/// Rounded table with the money columns right-aligned
fn print_table(mut table: Table, money_columns: Range<usize>) {
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(money_columns)).with(Alignment::right()));
    println!("{}", table);
}
