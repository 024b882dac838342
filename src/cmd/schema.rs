//! Schema command - print expected input and report formats

use super::EstimateInput;
use clap::{Args, ValueEnum};
use schemars::schema_for;
use smbtax::core::{CsvColumn, PayrollRunRecord, TransactionRecord};
use smbtax::tax::TaxReport;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to print
    #[arg(value_enum, default_value = "input")]
    format: SchemaFormat,

    /// Describe the payroll runs CSV instead of the transactions CSV
    #[arg(long)]
    payroll: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the estimate input document
    Input,
    /// JSON Schema for the estimate report
    Report,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::Input => {
                let schema = schema_for!(EstimateInput);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::Report => {
                let schema = schema_for!(TaxReport);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let names: Vec<_> = self.columns().iter().map(|c| c.name).collect();
                println!("{}", names.join(","));
            }
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
        Ok(())
    }

    fn columns(&self) -> &'static [CsvColumn] {
        if self.payroll {
            PayrollRunRecord::csv_schema()
        } else {
            TransactionRecord::csv_schema()
        }
    }

    fn print_csv_fields(&self) {
        let title = if self.payroll {
            "Payroll CSV Format"
        } else {
            "Transactions CSV Format"
        };
        println!("{}", title);
        println!("{}", "=".repeat(title.len()));
        println!();
        for column in self.columns() {
            let req = if column.required { "required" } else { "optional" };
            println!(
                "{:22} ({:8}, {:7})  {}",
                column.name, req, column.kind, column.description
            );
        }
        println!();
        println!("Amounts are signed: positive = inflow, negative = outflow");
    }
}
