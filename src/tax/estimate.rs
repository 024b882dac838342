//! Tax liability estimator and report assembly

use super::accuracy::{self, AccuracyScore};
use super::federal::bracket_slices;
use super::report::{
    format_usd, quarterly_plan, Applicability, ApplicabilityFlags, IncomeSummary, PayrollSummary,
    ReportMetadata, SalesTaxSummary, SelfEmploymentTax, TaxEstimates, TaxReport,
};
use super::tables::{SelfEmploymentRates, TaxTable, TaxTables};
use crate::core::{
    aggregate, classify, BusinessTaxProfile, CategoryTag, EntityType, LegacyTag,
    NormalizedProfile, PayrollRunRecord, Period, TaxBucket, TaxTreatment, TransactionRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Estimates taxes against a fixed set of tax tables
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    tables: TaxTables,
}

impl Estimator {
    pub fn new(tables: TaxTables) -> Self {
        Estimator { tables }
    }

    pub fn tables(&self) -> &TaxTables {
        &self.tables
    }

    /// Produce a full report for `period`. Infallible; the period is assumed valid.
    pub fn estimate(
        &self,
        profile: &BusinessTaxProfile,
        transactions: &[TransactionRecord],
        payroll_runs: &[PayrollRunRecord],
        period: Period,
    ) -> TaxReport {
        let profile = profile.normalize();
        let tax_year = period.report_year();
        let table = self.tables.for_year(tax_year);

        let in_period: Vec<TransactionRecord> = transactions
            .iter()
            .filter(|tx| period.contains(tx.date))
            .cloned()
            .collect();
        log::debug!(
            "Estimating {} for {} ({} of {} transactions in period)",
            profile.entity_type,
            period,
            in_period.len(),
            transactions.len()
        );

        let ledger = Ledger::post_all(&in_period);
        let taxable_profit = (ledger.gross_income - ledger.deductible).max(Decimal::ZERO);

        let self_employment = if profile.self_employment_applies() {
            self_employment_tax(taxable_profit, &table.self_employment)
        } else {
            SelfEmploymentTax::default()
        };
        let half_se_deduction = (self_employment.total * dec!(0.5)).round_dp(2);

        let standard_deduction = table.standard_deduction(profile.filing_status);
        let federal_taxable_income =
            (taxable_profit - standard_deduction - half_se_deduction).max(Decimal::ZERO);
        let federal_brackets =
            bracket_slices(federal_taxable_income, table.brackets(profile.filing_status));
        let federal_income_tax = federal_brackets
            .iter()
            .map(|s| s.tax)
            .sum::<Decimal>()
            .round_dp(2);

        let state_income_tax = (taxable_profit * profile.state_rate).round_dp(2);
        let payroll = payroll_summary(&profile, payroll_runs, period);
        let sales_tax = sales_tax_summary(&profile, &ledger);

        let total_estimated_tax = federal_income_tax
            .saturating_add(state_income_tax)
            .saturating_add(self_employment.total)
            .saturating_add(payroll.employer_payroll_tax);

        log::debug!(
            "profit={} se={} federal_taxable={} federal={} state={} payroll={} total={}",
            taxable_profit,
            self_employment.total,
            federal_taxable_income,
            federal_income_tax,
            state_income_tax,
            payroll.employer_payroll_tax,
            total_estimated_tax
        );

        let applicability = applicability(
            &profile,
            table,
            &payroll,
            federal_taxable_income,
            standard_deduction,
        );
        let accuracy = accuracy::score(&in_period);
        let income = IncomeSummary {
            gross_income: ledger.gross_income,
            deductible_expenses: ledger.deductible,
            non_deductible_expenses: ledger.non_deductible,
            capitalized_expenses: ledger.capitalized,
            excluded_non_operating: ledger.non_operating,
            taxable_profit,
            transactions_in_period: in_period.len(),
        };
        let taxes = TaxEstimates {
            federal_income_tax,
            federal_brackets,
            state_income_tax,
            self_employment,
            payroll,
            sales_tax,
            total_estimated_tax,
        };
        let quarterly_plan = quarterly_plan(tax_year, total_estimated_tax);
        let summary = summarize(&period, &income, &taxes, &applicability, &accuracy);

        TaxReport {
            period,
            metadata: ReportMetadata {
                tax_year,
                table_year: table.year,
                entity_type: profile.entity_type,
                filing_status: profile.filing_status,
                state_code: profile.state_code.clone(),
                state_rate: profile.state_rate,
                standard_deduction,
                half_se_deduction,
                federal_taxable_income,
            },
            applicability,
            buckets: aggregate(&in_period),
            income,
            taxes,
            quarterly_plan,
            accuracy,
            summary,
        }
    }
}

/// Estimate with the built-in tax tables
pub fn estimate(
    profile: &BusinessTaxProfile,
    transactions: &[TransactionRecord],
    payroll_runs: &[PayrollRunRecord],
    period: Period,
) -> TaxReport {
    Estimator::default().estimate(profile, transactions, payroll_runs, period)
}

/// Share of an outflow that may be deducted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deductibility {
    Full,
    Half,
    None,
    Capitalized,
}

fn deductibility(tx: &TransactionRecord, bucket: TaxBucket) -> Deductibility {
    match &tx.tax_treatment {
        Some(TaxTreatment::Deductible) => Deductibility::Full,
        Some(TaxTreatment::Partial50) => Deductibility::Half,
        Some(TaxTreatment::NonDeductible) => Deductibility::None,
        Some(TaxTreatment::Capitalized) => Deductibility::Capitalized,
        Some(TaxTreatment::Review) | Some(TaxTreatment::Unrecognized(_)) | None => {
            match (&tx.tax_category, bucket) {
                (_, TaxBucket::NonDeductibleExpense) => Deductibility::None,
                (Some(CategoryTag::Legacy(LegacyTag::PartialDeductible)), _) => Deductibility::Half,
                _ => Deductibility::Full,
            }
        }
    }
}

/// Running totals for the treatment-aware fold. Expense fields hold magnitudes.
#[derive(Debug, Default, Clone, Copy)]
struct Ledger {
    gross_income: Decimal,
    deductible: Decimal,
    non_deductible: Decimal,
    capitalized: Decimal,
    non_operating: Decimal,
    sales_tax_collected: Decimal,
    sales_tax_paid: Decimal,
}

impl Ledger {
    fn post_all(transactions: &[TransactionRecord]) -> Self {
        let mut ledger = Ledger::default();
        for tx in transactions.iter().filter(|tx| !tx.amount.is_zero()) {
            let mut next = ledger;
            match next.post(tx) {
                Some(()) => ledger = next,
                None => log::warn!(
                    "Skipping transaction {} of {}: ledger total would overflow",
                    tx.id.as_deref().unwrap_or("-"),
                    tx.amount
                ),
            }
        }
        ledger
    }

    /// Post one transaction, or `None` if any running total would overflow
    fn post(&mut self, tx: &TransactionRecord) -> Option<()> {
        let bucket = classify(tx);
        let amount = tx.amount;

        if bucket.is_non_operating() {
            return add(&mut self.non_operating, amount);
        }
        match bucket {
            TaxBucket::SalesTaxCollected => return add(&mut self.sales_tax_collected, amount),
            TaxBucket::SalesTaxPaid => return add(&mut self.sales_tax_paid, amount),
            _ => {}
        }

        if amount > Decimal::ZERO {
            return add(&mut self.gross_income, amount);
        }

        let expense = amount.abs();
        match deductibility(tx, bucket) {
            Deductibility::Full => add(&mut self.deductible, expense),
            Deductibility::Half => {
                let half = expense / Decimal::TWO;
                add(&mut self.deductible, half)?;
                add(&mut self.non_deductible, expense - half)
            }
            Deductibility::None => add(&mut self.non_deductible, expense),
            Deductibility::Capitalized => add(&mut self.capitalized, expense),
        }
    }
}

fn add(total: &mut Decimal, amount: Decimal) -> Option<()> {
    *total = total.checked_add(amount)?;
    Some(())
}

fn self_employment_tax(taxable_profit: Decimal, rates: &SelfEmploymentRates) -> SelfEmploymentTax {
    let base = taxable_profit * rates.net_earnings_factor;
    let social_security =
        (base.min(rates.social_security_wage_base) * rates.social_security_rate).round_dp(2);
    let medicare = (base * rates.medicare_rate).round_dp(2);
    SelfEmploymentTax {
        base,
        social_security,
        medicare,
        total: social_security + medicare,
    }
}

fn payroll_summary(
    profile: &NormalizedProfile,
    runs: &[PayrollRunRecord],
    period: Period,
) -> PayrollSummary {
    if !profile.payroll_enabled {
        return PayrollSummary::default();
    }
    runs.iter()
        .filter(|run| period.contains(run.run_date))
        .fold(PayrollSummary::default(), |mut acc, run| {
            acc.runs_in_period += 1;
            acc.gross_wages = acc.gross_wages.saturating_add(run.gross_wages);
            acc.employer_payroll_tax = acc
                .employer_payroll_tax
                .saturating_add(run.employer_payroll_tax);
            acc.employee_withholding = acc
                .employee_withholding
                .saturating_add(run.employee_withholding);
            acc
        })
}

/// The profile flag gates the liability; tagged amounts alone never create one
fn sales_tax_summary(profile: &NormalizedProfile, ledger: &Ledger) -> SalesTaxSummary {
    let collected = ledger.sales_tax_collected.abs();
    let paid = ledger.sales_tax_paid.abs();
    let liability = if profile.sells_taxable_goods_services {
        (collected - paid).max(Decimal::ZERO).round_dp(2)
    } else {
        Decimal::ZERO
    };
    SalesTaxSummary {
        collected,
        paid,
        liability,
    }
}

fn applicability(
    profile: &NormalizedProfile,
    table: &TaxTable,
    payroll: &PayrollSummary,
    federal_taxable_income: Decimal,
    standard_deduction: Decimal,
) -> ApplicabilityFlags {
    let federal_income = if federal_taxable_income > Decimal::ZERO {
        Applicability::enabled(format!(
            "Profit is taxed at {} federal brackets for {} filers after a {} standard deduction.",
            table.year,
            profile.filing_status,
            format_usd(standard_deduction)
        ))
    } else {
        Applicability::enabled(format!(
            "Federal income tax applies, but profit does not exceed the {} standard deduction, so none is due.",
            format_usd(standard_deduction)
        ))
    };

    let state_name = profile.state_code.as_deref().unwrap_or("the state");
    let state_income = if profile.state_rate > Decimal::ZERO {
        Applicability::enabled(format!(
            "Flat {}% {} rate applied to taxable profit.",
            (profile.state_rate * dec!(100)).normalize(),
            state_name
        ))
    } else {
        Applicability::disabled(format!(
            "No income tax rate is configured for {}.",
            state_name
        ))
    };

    let self_employment = if profile.self_employment_applies() {
        Applicability::enabled(format!(
            "Owners of a {} pay self-employment tax on {}% of net profit.",
            profile.entity_type,
            (table.self_employment.net_earnings_factor * dec!(100)).normalize()
        ))
    } else if profile.entity_type.is_self_employed() {
        Applicability::disabled("Self-employment tax is switched off in the business profile.")
    } else if profile.entity_type == EntityType::Unknown {
        Applicability::disabled("Entity type is unknown, so self-employment tax is not estimated.")
    } else {
        Applicability::disabled(format!(
            "Owners of a {} do not pay self-employment tax on business profit.",
            profile.entity_type
        ))
    };

    let payroll = if profile.payroll_enabled {
        Applicability::enabled(format!(
            "{} payroll run(s) in the period; employer payroll taxes are included in the total.",
            payroll.runs_in_period
        ))
    } else {
        Applicability::disabled("Payroll is not enabled for this business.")
    };

    let sales_tax = if profile.sells_taxable_goods_services {
        Applicability::enabled(
            "Business sells taxable goods or services; liability is sales tax collected minus sales tax paid.",
        )
    } else {
        Applicability::disabled(
            "Business does not sell taxable goods or services, so no sales tax liability is estimated.",
        )
    };

    ApplicabilityFlags {
        federal_income,
        state_income,
        self_employment,
        payroll,
        sales_tax,
    }
}

fn summarize(
    period: &Period,
    income: &IncomeSummary,
    taxes: &TaxEstimates,
    applicability: &ApplicabilityFlags,
    accuracy: &AccuracyScore,
) -> String {
    let installment = taxes.total_estimated_tax / Decimal::from(4);
    let mut summary = format!(
        "Estimated tax for {} is {}: federal income {}, state income {}, self-employment {}, employer payroll {}. \
         Taxable profit is {} on gross income of {}. Set aside {} for each of the four quarterly payments.",
        period,
        format_usd(taxes.total_estimated_tax),
        format_usd(taxes.federal_income_tax),
        format_usd(taxes.state_income_tax),
        format_usd(taxes.self_employment.total),
        format_usd(taxes.payroll.employer_payroll_tax),
        format_usd(income.taxable_profit),
        format_usd(income.gross_income),
        format_usd(installment),
    );
    if applicability.sales_tax.enabled {
        summary.push_str(&format!(
            " Sales tax of {} is owed separately.",
            format_usd(taxes.sales_tax.liability)
        ));
    }
    summary.push_str(&format!(" Accuracy score {}/100.", accuracy.score));
    summary
}
