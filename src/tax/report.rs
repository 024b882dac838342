use super::accuracy::AccuracyScore;
use super::federal::BracketSlice;
use crate::core::{BucketTotals, EntityType, FilingStatus, Period};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Whether a tax applies, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Applicability {
    pub enabled: bool,
    pub reason: String,
}

impl Applicability {
    pub fn enabled(reason: impl Into<String>) -> Self {
        Applicability {
            enabled: true,
            reason: reason.into(),
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Applicability {
            enabled: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ApplicabilityFlags {
    pub federal_income: Applicability,
    pub state_income: Applicability,
    pub self_employment: Applicability,
    pub payroll: Applicability,
    pub sales_tax: Applicability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportMetadata {
    /// Calendar year of the period end
    pub tax_year: i32,
    /// Year of the tax table actually applied
    pub table_year: i32,
    pub entity_type: EntityType,
    pub filing_status: FilingStatus,
    pub state_code: Option<String>,
    #[schemars(with = "f64")]
    pub state_rate: Decimal,
    #[schemars(with = "f64")]
    pub standard_deduction: Decimal,
    #[schemars(with = "f64")]
    pub half_se_deduction: Decimal,
    #[schemars(with = "f64")]
    pub federal_taxable_income: Decimal,
}

/// Operating income and expenses for the period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct IncomeSummary {
    #[schemars(with = "f64")]
    pub gross_income: Decimal,
    #[schemars(with = "f64")]
    pub deductible_expenses: Decimal,
    #[schemars(with = "f64")]
    pub non_deductible_expenses: Decimal,
    /// Expenses with capitalized treatment, left out of the period
    #[schemars(with = "f64")]
    pub capitalized_expenses: Decimal,
    /// Signed sum of transfers, loan principal, owner draws, capex and owner tax payments
    #[schemars(with = "f64")]
    pub excluded_non_operating: Decimal,
    /// max(0, gross income - deductible expenses)
    #[schemars(with = "f64")]
    pub taxable_profit: Decimal,
    pub transactions_in_period: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SelfEmploymentTax {
    /// Net earnings subject to SE tax
    #[schemars(with = "f64")]
    pub base: Decimal,
    #[schemars(with = "f64")]
    pub social_security: Decimal,
    #[schemars(with = "f64")]
    pub medicare: Decimal,
    #[schemars(with = "f64")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PayrollSummary {
    pub runs_in_period: usize,
    #[schemars(with = "f64")]
    pub gross_wages: Decimal,
    #[schemars(with = "f64")]
    pub employer_payroll_tax: Decimal,
    /// Employees' own liability; informational only
    #[schemars(with = "f64")]
    pub employee_withholding: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SalesTaxSummary {
    #[schemars(with = "f64")]
    pub collected: Decimal,
    #[schemars(with = "f64")]
    pub paid: Decimal,
    #[schemars(with = "f64")]
    pub liability: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TaxEstimates {
    #[schemars(with = "f64")]
    pub federal_income_tax: Decimal,
    pub federal_brackets: Vec<BracketSlice>,
    #[schemars(with = "f64")]
    pub state_income_tax: Decimal,
    pub self_employment: SelfEmploymentTax,
    pub payroll: PayrollSummary,
    pub sales_tax: SalesTaxSummary,
    /// Federal + state + self-employment + employer payroll tax
    #[schemars(with = "f64")]
    pub total_estimated_tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct QuarterlyPayment {
    pub quarter: u8,
    #[schemars(with = "String")]
    pub due_date: NaiveDate,
    #[schemars(with = "f64")]
    pub amount: Decimal,
}

/// Four equal installments due Apr 15, Jun 15, Sep 15 and Jan 15 of the following year
pub fn quarterly_plan(year: i32, total: Decimal) -> Vec<QuarterlyPayment> {
    let installment = total / Decimal::from(4);
    [(1, year, 4), (2, year, 6), (3, year, 9), (4, year + 1, 1)]
        .into_iter()
        .filter_map(|(quarter, y, month)| {
            NaiveDate::from_ymd_opt(y, month, 15).map(|due_date| QuarterlyPayment {
                quarter,
                due_date,
                amount: installment,
            })
        })
        .collect()
}

/// Complete estimate for one business and period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TaxReport {
    pub period: Period,
    pub metadata: ReportMetadata,
    pub applicability: ApplicabilityFlags,
    pub buckets: BucketTotals,
    pub income: IncomeSummary,
    pub taxes: TaxEstimates,
    pub quarterly_plan: Vec<QuarterlyPayment>,
    pub accuracy: AccuracyScore,
    pub summary: String,
}

impl TaxReport {
    /// Hex SHA-256 of the JSON serialization; equal inputs give equal fingerprints
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn quarterly_total(&self) -> Decimal {
        self.quarterly_plan.iter().map(|q| q.amount).sum()
    }
}

pub fn format_usd(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn quarterly_due_dates() {
        let plan = quarterly_plan(2024, dec!(1000));
        let dates: Vec<_> = plan.iter().map(|q| q.due_date).collect();
        assert_eq!(
            dates,
            [d("2024-04-15"), d("2024-06-15"), d("2024-09-15"), d("2025-01-15")]
        );
        assert_eq!(plan.iter().map(|q| q.quarter).collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn quarterly_amounts_reconcile() {
        let plan = quarterly_plan(2024, dec!(13185.07));
        assert!(plan.iter().all(|q| q.amount == dec!(3296.2675)));
        let total: Decimal = plan.iter().map(|q| q.amount).sum();
        assert_eq!(total, dec!(13185.07));
    }

    #[test]
    fn quarterly_plan_for_zero_tax() {
        let plan = quarterly_plan(2025, Decimal::ZERO);
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|q| q.amount.is_zero()));
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(dec!(1234.5)), "$1234.50");
        assert_eq!(format_usd(dec!(-12)), "-$12.00");
        assert_eq!(format_usd(Decimal::ZERO), "$0.00");
    }
}
