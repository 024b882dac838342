//! Tax buckets, the heuristic-free classifier and the bucket aggregator

use super::transaction::{CategoryTag, LegacyTag, TransactionRecord};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tax category a transaction is classified into. Every transaction lands in exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxBucket {
    GrossReceipts,
    DeductibleExpense,
    NonDeductibleExpense,
    SalesTaxCollected,
    SalesTaxPaid,
    PayrollWages,
    PayrollTaxes,
    LoanPrincipal,
    LoanInterest,
    Capex,
    OwnerDraw,
    OwnerEstimatedTax,
    Transfer,
    Uncategorized,
}

impl TaxBucket {
    pub const ALL: [TaxBucket; 14] = [
        TaxBucket::GrossReceipts,
        TaxBucket::DeductibleExpense,
        TaxBucket::NonDeductibleExpense,
        TaxBucket::SalesTaxCollected,
        TaxBucket::SalesTaxPaid,
        TaxBucket::PayrollWages,
        TaxBucket::PayrollTaxes,
        TaxBucket::LoanPrincipal,
        TaxBucket::LoanInterest,
        TaxBucket::Capex,
        TaxBucket::OwnerDraw,
        TaxBucket::OwnerEstimatedTax,
        TaxBucket::Transfer,
        TaxBucket::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxBucket::GrossReceipts => "gross_receipts",
            TaxBucket::DeductibleExpense => "deductible_expense",
            TaxBucket::NonDeductibleExpense => "non_deductible_expense",
            TaxBucket::SalesTaxCollected => "sales_tax_collected",
            TaxBucket::SalesTaxPaid => "sales_tax_paid",
            TaxBucket::PayrollWages => "payroll_wages",
            TaxBucket::PayrollTaxes => "payroll_taxes",
            TaxBucket::LoanPrincipal => "loan_principal",
            TaxBucket::LoanInterest => "loan_interest",
            TaxBucket::Capex => "capex",
            TaxBucket::OwnerDraw => "owner_draw",
            TaxBucket::OwnerEstimatedTax => "owner_estimated_tax",
            TaxBucket::Transfer => "transfer",
            TaxBucket::Uncategorized => "uncategorized",
        }
    }

    /// Balance-sheet movements that never affect profit
    pub fn is_non_operating(&self) -> bool {
        matches!(
            self,
            TaxBucket::Transfer
                | TaxBucket::LoanPrincipal
                | TaxBucket::OwnerDraw
                | TaxBucket::Capex
                | TaxBucket::OwnerEstimatedTax
        )
    }
}

impl FromStr for TaxBucket {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaxBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for TaxBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a transaction into its tax bucket.
///
/// Resolution order:
/// 1. Explicit canonical bucket tag
/// 2. Legacy tag mapping
/// 3. Sign of the amount (inflow = gross receipts, outflow = uncategorized)
///
/// Descriptions are never consulted.
pub fn classify(tx: &TransactionRecord) -> TaxBucket {
    match &tx.tax_category {
        Some(CategoryTag::Bucket(bucket)) => *bucket,
        Some(CategoryTag::Legacy(legacy)) => match legacy {
            LegacyTag::Taxable if tx.amount >= Decimal::ZERO => TaxBucket::GrossReceipts,
            LegacyTag::Taxable => TaxBucket::DeductibleExpense,
            LegacyTag::NonTaxable => TaxBucket::Transfer,
            LegacyTag::Deductible | LegacyTag::PartialDeductible => TaxBucket::DeductibleExpense,
            LegacyTag::NonDeductible => TaxBucket::NonDeductibleExpense,
            LegacyTag::Capitalized => TaxBucket::Capex,
            LegacyTag::Review => TaxBucket::Uncategorized,
        },
        Some(CategoryTag::Unrecognized(_)) | None => classify_by_sign(tx.amount),
    }
}

fn classify_by_sign(amount: Decimal) -> TaxBucket {
    if amount > Decimal::ZERO {
        TaxBucket::GrossReceipts
    } else {
        TaxBucket::Uncategorized
    }
}

/// Signed totals per bucket plus coverage counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BucketTotals {
    #[schemars(with = "BTreeMap<TaxBucket, f64>")]
    pub totals: BTreeMap<TaxBucket, Decimal>,
    /// Transactions that ended up in the uncategorized bucket
    pub uncategorized_count: usize,
    /// Transactions with a non-zero amount
    pub total_count: usize,
}

impl BucketTotals {
    pub fn get(&self, bucket: TaxBucket) -> Decimal {
        self.totals.get(&bucket).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum across all buckets
    pub fn net(&self) -> Decimal {
        self.totals
            .values()
            .fold(Decimal::ZERO, |acc, total| acc.saturating_add(*total))
    }
}

/// Sum classified amounts per bucket. Zero amounts contribute to neither totals nor counts.
pub fn aggregate(transactions: &[TransactionRecord]) -> BucketTotals {
    let mut out = BucketTotals::default();

    for tx in transactions.iter().filter(|tx| !tx.amount.is_zero()) {
        let bucket = classify(tx);
        let total = out.totals.entry(bucket).or_insert(Decimal::ZERO);
        let Some(sum) = total.checked_add(tx.amount) else {
            log::warn!(
                "Skipping transaction {} of {}: {} total would overflow",
                tx.id.as_deref().unwrap_or("-"),
                tx.amount,
                bucket
            );
            continue;
        };
        *total = sum;
        out.total_count += 1;
        if bucket == TaxBucket::Uncategorized {
            out.uncategorized_count += 1;
        }
    }

    log::debug!(
        "Aggregated {} transactions into {} buckets ({} uncategorized)",
        out.total_count,
        out.totals.len(),
        out.uncategorized_count
    );
    out
}
