use super::bucket::TaxBucket;
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use rust_decimal_macros::dec;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smbtax_derive::CsvSchema;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Largest amount magnitude accepted at input
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
}

/// One signed ledger entry. Positive amounts are inflows, negative amounts outflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct TransactionRecord {
    /// Identifier used to refer back to the source ledger
    #[serde(default)]
    pub id: Option<String>,
    /// Calendar date of the transaction (YYYY-MM-DD; datetimes are truncated to their date)
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Signed amount, positive = inflow, negative = outflow
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Tax bucket or legacy tax tag (e.g. gross_receipts, deductible, review)
    #[serde(default, deserialize_with = "deserialize_tag")]
    #[schemars(with = "Option<String>")]
    pub tax_category: Option<CategoryTag>,
    /// Deductibility of an expense: deductible, partial_50, non_deductible, capitalized or review
    #[serde(default, deserialize_with = "deserialize_tag")]
    #[schemars(with = "Option<String>")]
    pub tax_treatment: Option<TaxTreatment>,
    /// Classification confidence between 0 and 1
    #[serde(default, deserialize_with = "deserialize_confidence")]
    #[schemars(with = "Option<f64>")]
    pub confidence: Option<Decimal>,
    /// Free-text description, for display only
    #[serde(default)]
    pub description: Option<String>,
}

/// One payroll run as exported by the payroll provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct PayrollRunRecord {
    /// Date the run was paid (YYYY-MM-DD)
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(with = "String")]
    pub run_date: NaiveDate,
    /// Gross wages paid in the run
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub gross_wages: Decimal,
    /// Employer share of payroll taxes
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub employer_payroll_tax: Decimal,
    /// Taxes withheld from employees
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub employee_withholding: Decimal,
}

/// Legacy tax tags that predate the bucket model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyTag {
    Taxable,
    NonTaxable,
    Deductible,
    NonDeductible,
    PartialDeductible,
    Capitalized,
    Review,
}

impl LegacyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyTag::Taxable => "taxable",
            LegacyTag::NonTaxable => "non_taxable",
            LegacyTag::Deductible => "deductible",
            LegacyTag::NonDeductible => "non_deductible",
            LegacyTag::PartialDeductible => "partial_deductible",
            LegacyTag::Capitalized => "capitalized",
            LegacyTag::Review => "review",
        }
    }

    fn parse(s: &str) -> Option<LegacyTag> {
        match s {
            "taxable" => Some(LegacyTag::Taxable),
            "non_taxable" => Some(LegacyTag::NonTaxable),
            "deductible" => Some(LegacyTag::Deductible),
            "non_deductible" => Some(LegacyTag::NonDeductible),
            "partial_deductible" => Some(LegacyTag::PartialDeductible),
            "capitalized" => Some(LegacyTag::Capitalized),
            "review" => Some(LegacyTag::Review),
            _ => None,
        }
    }
}

/// Explicit tax-category tag carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryTag {
    /// Canonical bucket name
    Bucket(TaxBucket),
    Legacy(LegacyTag),
    /// Non-empty tag that is neither a bucket nor a legacy value
    Unrecognized(String),
}

impl CategoryTag {
    pub fn as_str(&self) -> &str {
        match self {
            CategoryTag::Bucket(bucket) => bucket.as_str(),
            CategoryTag::Legacy(legacy) => legacy.as_str(),
            CategoryTag::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for CategoryTag {
    fn from(raw: String) -> Self {
        let tag = raw.trim();
        if let Ok(bucket) = TaxBucket::from_str(tag) {
            CategoryTag::Bucket(bucket)
        } else if let Some(legacy) = LegacyTag::parse(tag) {
            CategoryTag::Legacy(legacy)
        } else {
            CategoryTag::Unrecognized(tag.to_string())
        }
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CategoryTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How much of an outflow may be deducted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaxTreatment {
    Deductible,
    /// Half deductible, half not (e.g. business meals)
    Partial50,
    NonDeductible,
    /// Capital purchase, excluded from the period
    Capitalized,
    /// Flagged for manual review
    Review,
    Unrecognized(String),
}

impl TaxTreatment {
    pub fn as_str(&self) -> &str {
        match self {
            TaxTreatment::Deductible => "deductible",
            TaxTreatment::Partial50 => "partial_50",
            TaxTreatment::NonDeductible => "non_deductible",
            TaxTreatment::Capitalized => "capitalized",
            TaxTreatment::Review => "review",
            TaxTreatment::Unrecognized(raw) => raw,
        }
    }

    /// Treatments that leave the expense unresolved
    pub fn needs_review(&self) -> bool {
        matches!(self, TaxTreatment::Review | TaxTreatment::Unrecognized(_))
    }
}

impl From<String> for TaxTreatment {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "deductible" => TaxTreatment::Deductible,
            "partial_50" | "partial50" | "partial_deductible" => TaxTreatment::Partial50,
            "non_deductible" | "nondeductible" => TaxTreatment::NonDeductible,
            "capitalized" => TaxTreatment::Capitalized,
            "review" => TaxTreatment::Review,
            other => TaxTreatment::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for TaxTreatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaxTreatment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Read transactions from JSON (`{"transactions": [...]}` or `[...]`)
pub fn read_transactions_json<R: Read>(reader: R) -> Result<Vec<TransactionRecord>, InputError> {
    let input: serde_json::Value = serde_json::from_reader(reader)?;
    let list = match input {
        serde_json::Value::Object(mut wrapper) => wrapper.remove("transactions").ok_or_else(|| {
            <serde_json::Error as serde::de::Error>::missing_field("transactions")
        })?,
        bare => bare,
    };
    let mut transactions: Vec<TransactionRecord> = serde_json::from_value(list)?;
    transactions.sort_by_key(|t| t.date);
    Ok(transactions)
}

/// Read transactions from CSV with a header row
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<TransactionRecord>, InputError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut transactions = rdr
        .deserialize::<TransactionRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    transactions.sort_by_key(|t| t.date);
    Ok(transactions)
}

/// Read payroll runs from CSV with a header row
pub fn read_payroll_csv<R: Read>(reader: R) -> Result<Vec<PayrollRunRecord>, InputError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let runs = rdr
        .deserialize::<PayrollRunRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(runs)
}

/// Parse a calendar date, truncating datetimes to their ISO date part
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    match s.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}")))
}

/// Raw numeric field as it arrives from JSON or CSV
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl RawNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawNumber::Number(n) if n.is_finite() => {
                Decimal::from_str(&n.to_string()).ok().or_else(|| Decimal::from_f64(*n))
            }
            RawNumber::Number(_) => None,
            RawNumber::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .ok()
                    .or_else(|| Decimal::from_scientific(s).ok())
            }
            RawNumber::Other(_) => None,
        }
    }
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Number(n) => write!(f, "{n}"),
            RawNumber::Text(s) => write!(f, "{s:?}"),
            RawNumber::Other(_) => f.write_str("non-numeric value"),
        }
    }
}

/// Amounts that are missing, not finite numbers or beyond `MAX_AMOUNT` are coerced to zero
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(match raw {
        None => Decimal::ZERO,
        Some(raw) => raw
            .to_decimal()
            .filter(|amount| amount.abs() <= MAX_AMOUNT)
            .unwrap_or_else(|| {
                log::warn!("Non-numeric or out-of-range amount {} treated as zero", raw);
                Decimal::ZERO
            }),
    })
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| raw.to_decimal()))
}

/// Empty or whitespace-only tags are the same as no tag
fn deserialize_tag<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(T::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn canonical_bucket_tag_parsed() {
        assert_eq!(
            CategoryTag::from("gross_receipts".to_string()),
            CategoryTag::Bucket(TaxBucket::GrossReceipts)
        );
        assert_eq!(
            CategoryTag::from(" owner_draw ".to_string()),
            CategoryTag::Bucket(TaxBucket::OwnerDraw)
        );
    }

    #[test]
    fn legacy_and_unknown_tags_parsed() {
        assert_eq!(
            CategoryTag::from("partial_deductible".to_string()),
            CategoryTag::Legacy(LegacyTag::PartialDeductible)
        );
        assert_eq!(
            CategoryTag::from("Gross_Receipts".to_string()),
            CategoryTag::Unrecognized("Gross_Receipts".to_string())
        );
    }

    #[test]
    fn treatment_aliases() {
        assert_eq!(TaxTreatment::from("partial_50".to_string()), TaxTreatment::Partial50);
        assert_eq!(TaxTreatment::from("partial50".to_string()), TaxTreatment::Partial50);
        assert_eq!(
            TaxTreatment::from("nondeductible".to_string()),
            TaxTreatment::NonDeductible
        );
        assert!(TaxTreatment::from("maybe".to_string()).needs_review());
        assert!(!TaxTreatment::Capitalized.needs_review());
    }

    #[test]
    fn json_amounts_are_lenient() {
        let json = r#"[
            {"date": "2024-03-01", "amount": 125.50, "tax_category": "gross_receipts"},
            {"date": "2024-03-02", "amount": "-40.25", "tax_category": ""},
            {"date": "2024-03-03T10:15:00Z", "amount": "not a number"},
            {"date": "2024-03-04", "amount": null, "confidence": "0.8"},
            {"date": "2024-03-05", "amount": true, "confidence": {}},
            {"date": "2024-03-06", "amount": {"value": 10}},
            {"date": "2024-03-07", "amount": [1, 2]}
        ]"#;
        let txs = read_transactions_json(json.as_bytes()).unwrap();
        assert_eq!(txs.len(), 7);
        assert_eq!(txs[0].amount, dec!(125.5));
        assert_eq!(txs[1].amount, dec!(-40.25));
        assert_eq!(txs[1].tax_category, None);
        assert_eq!(txs[2].date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(txs[2].amount, Decimal::ZERO);
        assert_eq!(txs[3].amount, Decimal::ZERO);
        assert_eq!(txs[3].confidence, Some(dec!(0.8)));
        assert!(txs[4..].iter().all(|t| t.amount.is_zero()));
        assert_eq!(txs[4].confidence, None);
    }

    #[test]
    fn oversized_amounts_coerced_to_zero() {
        let json = r#"[
            {"date": "2024-03-01", "amount": "50000000000000000000000000000"},
            {"date": "2024-03-02", "amount": 1e20},
            {"date": "2024-03-03", "amount": "-1000000000000000"}
        ]"#;
        let txs = read_transactions_json(json.as_bytes()).unwrap();
        assert_eq!(txs[0].amount, Decimal::ZERO);
        assert_eq!(txs[1].amount, Decimal::ZERO);
        assert_eq!(txs[2].amount, -MAX_AMOUNT);
    }

    #[test]
    fn wrapped_json_sorted_by_date() {
        let json = r#"{"transactions": [
            {"date": "2024-05-01", "amount": 1},
            {"date": "2024-01-01", "amount": 2}
        ]}"#;
        let txs = read_transactions_json(json.as_bytes()).unwrap();
        assert_eq!(txs[0].amount, dec!(2));
        assert_eq!(txs[1].amount, dec!(1));
    }

    #[test]
    fn invalid_date_is_an_error() {
        let json = r#"[{"date": "03/01/2024", "amount": 1}]"#;
        assert!(read_transactions_json(json.as_bytes()).is_err());
    }

    #[test]
    fn wrapped_json_reports_field_errors() {
        let json = r#"{"transactions": [{"date": "03/01/2024", "amount": 1}]}"#;
        let err = read_transactions_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid date: 03/01/2024"), "{err}");

        let json = r#"{"rows": []}"#;
        let err = read_transactions_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("transactions"), "{err}");
    }

    #[test]
    fn csv_transactions() {
        let csv = "\
id,date,amount,tax_category,tax_treatment,confidence,description
t1,2024-02-01,1500.00,gross_receipts,,0.95,Invoice 42
t2,2024-02-03,-120.00,deductible_expense,partial_50,,Client lunch
t3,2024-02-04,-80,,,,
";
        let txs = read_transactions_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].id.as_deref(), Some("t1"));
        assert_eq!(txs[0].amount, dec!(1500));
        assert_eq!(txs[0].confidence, Some(dec!(0.95)));
        assert_eq!(txs[1].tax_treatment, Some(TaxTreatment::Partial50));
        assert_eq!(txs[1].confidence, None);
        assert_eq!(txs[2].tax_category, None);
        assert_eq!(txs[2].tax_treatment, None);
    }

    #[test]
    fn csv_payroll_runs() {
        let csv = "\
run_date,gross_wages,employer_payroll_tax,employee_withholding
2024-01-31,5000,382.50,900
2024-02-29,5000,382.50,900
";
        let runs = read_payroll_csv(csv.as_bytes()).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].employer_payroll_tax, dec!(382.5));
    }

    #[test]
    fn tags_serialize_as_raw_strings() {
        let tx = TransactionRecord {
            id: None,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount: dec!(-10),
            tax_category: Some(CategoryTag::Legacy(LegacyTag::NonDeductible)),
            tax_treatment: Some(TaxTreatment::Partial50),
            confidence: None,
            description: None,
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["tax_category"], "non_deductible");
        assert_eq!(json["tax_treatment"], "partial_50");
    }

    #[test]
    fn csv_schema_columns() {
        let columns = TransactionRecord::csv_schema();
        let names: Vec<_> = columns.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            [
                "id",
                "date",
                "amount",
                "tax_category",
                "tax_treatment",
                "confidence",
                "description"
            ]
        );
        let date = &columns[1];
        assert!(date.required);
        assert_eq!(date.kind, "date");
        let amount = &columns[2];
        assert!(!amount.required);
        assert_eq!(amount.kind, "decimal");
    }
}
