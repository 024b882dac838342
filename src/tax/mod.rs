pub mod accuracy;
pub mod estimate;
pub mod federal;
pub mod report;
pub mod tables;

pub use accuracy::{review_issues, score, AccuracyScore, CoverageMetrics, ReviewIssue};
pub use estimate::{estimate, Estimator};
pub use federal::{bracket_slices, BracketSlice};
pub use report::{
    format_usd, quarterly_plan, Applicability, ApplicabilityFlags, IncomeSummary, PayrollSummary,
    QuarterlyPayment, ReportMetadata, SalesTaxSummary, SelfEmploymentTax, TaxEstimates, TaxReport,
};
pub use tables::{Bracket, ByFilingStatus, SelfEmploymentRates, TableError, TaxTable, TaxTables};
