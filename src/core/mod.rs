pub mod bucket;
pub mod period;
pub mod profile;
pub mod schema;
pub mod transaction;

// Flat public surface for domain types and functions.
pub use bucket::{aggregate, classify, BucketTotals, TaxBucket};
pub use period::{Period, PeriodError};
pub use profile::{BusinessTaxProfile, EntityType, FilingStatus, NormalizedProfile};
pub use schema::CsvColumn;
pub use transaction::{
    read_payroll_csv, read_transactions_csv, read_transactions_json, CategoryTag, InputError,
    LegacyTag, PayrollRunRecord, TaxTreatment, TransactionRecord,
};
