//! Accuracy score: how well classified and how confident the period's transactions are

use crate::core::{CategoryTag, LegacyTag, TaxBucket, TransactionRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::Serialize;

/// Score reported when there is nothing to score
pub const EMPTY_SCORE: u8 = 20;
/// Confidence assumed when no transaction supplies one
const DEFAULT_CONFIDENCE: Decimal = dec!(0.5);
const COVERAGE_TARGET: Decimal = dec!(0.9);
const CONFIDENCE_TARGET: Decimal = dec!(0.75);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct AccuracyScore {
    /// 0-100, higher is better
    pub score: u8,
    pub tips: Vec<String>,
    pub metrics: CoverageMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CoverageMetrics {
    pub transactions: usize,
    #[schemars(with = "f64")]
    pub category_coverage: Decimal,
    #[schemars(with = "f64")]
    pub treatment_coverage: Decimal,
    #[schemars(with = "f64")]
    pub average_confidence: Decimal,
    pub uncategorized: usize,
    pub needs_review: usize,
}

/// Data-quality problem on a single transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ReviewIssue {
    /// No category tag, or one that resolves to nothing specific
    Uncategorized,
    /// Expense without a treatment; assumed fully deductible
    MissingTreatment,
    /// Treatment flagged for review or not recognised
    TreatmentReview { treatment: String },
    LowConfidence {
        #[schemars(with = "f64")]
        confidence: Decimal,
    },
}

impl ReviewIssue {
    pub fn message(&self) -> String {
        match self {
            ReviewIssue::Uncategorized => {
                "No usable tax category - classified by sign only".to_string()
            }
            ReviewIssue::MissingTreatment => {
                "No tax treatment - assumed fully deductible".to_string()
            }
            ReviewIssue::TreatmentReview { treatment } => {
                format!("Treatment '{treatment}' needs review - assumed fully deductible")
            }
            ReviewIssue::LowConfidence { confidence } => {
                format!("Low classification confidence ({}%)", percent(*confidence))
            }
        }
    }
}

fn is_uncategorized(tx: &TransactionRecord) -> bool {
    matches!(
        tx.tax_category,
        None | Some(CategoryTag::Bucket(TaxBucket::Uncategorized))
            | Some(CategoryTag::Legacy(LegacyTag::Review))
            | Some(CategoryTag::Unrecognized(_))
    )
}

fn needs_treatment_review(tx: &TransactionRecord) -> bool {
    tx.tax_treatment.as_ref().map_or(true, |t| t.needs_review())
}

fn confidence(tx: &TransactionRecord) -> Option<Decimal> {
    tx.confidence.map(|c| c.clamp(Decimal::ZERO, Decimal::ONE))
}

/// Everything about `tx` that lowers the accuracy score
pub fn review_issues(tx: &TransactionRecord) -> Vec<ReviewIssue> {
    let mut issues = Vec::new();
    if is_uncategorized(tx) {
        issues.push(ReviewIssue::Uncategorized);
    }
    match &tx.tax_treatment {
        None => issues.push(ReviewIssue::MissingTreatment),
        Some(t) if t.needs_review() => issues.push(ReviewIssue::TreatmentReview {
            treatment: t.to_string(),
        }),
        Some(_) => {}
    }
    if let Some(c) = confidence(tx).filter(|c| *c < CONFIDENCE_TARGET) {
        issues.push(ReviewIssue::LowConfidence { confidence: c });
    }
    issues
}

/// Score the classification coverage and confidence of a transaction set
pub fn score(transactions: &[TransactionRecord]) -> AccuracyScore {
    if transactions.is_empty() {
        return AccuracyScore {
            score: EMPTY_SCORE,
            tips: vec!["Add transactions for this period to get a meaningful estimate.".to_string()],
            metrics: CoverageMetrics::default(),
        };
    }

    let n = Decimal::from(transactions.len());
    let fraction = |count: usize| Decimal::from(count) / n;

    let tagged = transactions.iter().filter(|t| t.tax_category.is_some()).count();
    let treated = transactions.iter().filter(|t| t.tax_treatment.is_some()).count();
    let uncategorized = transactions.iter().filter(|t| is_uncategorized(t)).count();
    let needs_review = transactions.iter().filter(|t| needs_treatment_review(t)).count();

    let confidences: Vec<Decimal> = transactions.iter().filter_map(confidence).collect();
    let average_confidence = if confidences.is_empty() {
        DEFAULT_CONFIDENCE
    } else {
        confidences.iter().sum::<Decimal>() / Decimal::from(confidences.len())
    };

    let category_coverage = fraction(tagged);
    let treatment_coverage = fraction(treated);
    let uncategorized_penalty = (fraction(uncategorized) * dec!(50)).min(dec!(30));
    let review_penalty = (fraction(needs_review) * dec!(30)).min(dec!(20));

    let raw = dec!(35) * category_coverage + dec!(25) * treatment_coverage
        + dec!(40) * average_confidence
        - uncategorized_penalty
        - review_penalty;
    let score = raw
        .clamp(Decimal::ZERO, dec!(100))
        .round()
        .to_u8()
        .unwrap_or(0);

    log::debug!(
        "Accuracy: coverage={} treatment={} confidence={} penalties={}/{} score={}",
        category_coverage.round_dp(3),
        treatment_coverage.round_dp(3),
        average_confidence.round_dp(3),
        uncategorized_penalty.round_dp(2),
        review_penalty.round_dp(2),
        score
    );

    let mut tips = Tips::default();
    if category_coverage < COVERAGE_TARGET {
        tips.push(format!(
            "Tag at least 90% of transactions with a tax category (currently {}%).",
            percent(category_coverage)
        ));
    }
    if treatment_coverage < COVERAGE_TARGET {
        tips.push(format!(
            "Set a tax treatment (deductible, partial_50, non_deductible, capitalized) on expenses; only {}% have one.",
            percent(treatment_coverage)
        ));
    }
    if average_confidence < CONFIDENCE_TARGET {
        tips.push(format!(
            "Review low-confidence classifications; average confidence is {}%.",
            percent(average_confidence)
        ));
    }
    if uncategorized > 0 {
        tips.push(format!(
            "{} transaction(s) are uncategorized; assign a tax category so they are not counted by sign alone.",
            uncategorized
        ));
    }
    if needs_review > 0 {
        tips.push(format!(
            "{} transaction(s) need a treatment review; untagged expenses are assumed fully deductible.",
            needs_review
        ));
    }

    AccuracyScore {
        score,
        tips: tips.0,
        metrics: CoverageMetrics {
            transactions: transactions.len(),
            category_coverage,
            treatment_coverage,
            average_confidence,
            uncategorized,
            needs_review,
        },
    }
}

/// Ordered tips without repeats
#[derive(Default)]
struct Tips(Vec<String>);

impl Tips {
    fn push(&mut self, tip: String) {
        if !self.0.contains(&tip) {
            self.0.push(tip);
        }
    }
}

fn percent(fraction: Decimal) -> Decimal {
    (fraction * dec!(100)).round()
}
