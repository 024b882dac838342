//! Versioned federal tax tables keyed by tax year

use crate::core::FilingStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("no tax tables supplied")]
    Empty,
    #[error("duplicate tax table for {0}")]
    DuplicateYear(i32),
    #[error("{year} {status} brackets are empty")]
    EmptyBrackets { year: i32, status: FilingStatus },
    #[error("{year} {status} bracket bounds must be strictly ascending")]
    UnsortedBrackets { year: i32, status: FilingStatus },
    #[error("{year} {status} only the last bracket may be unbounded")]
    UnboundedNotLast { year: i32, status: FilingStatus },
    #[error("{year}: rate {rate} outside 0-1")]
    RateOutOfRange { year: i32, rate: Decimal },
    #[error("invalid tax table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One marginal bracket. `upper_bound = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bracket {
    #[schemars(with = "Option<f64>")]
    pub upper_bound: Option<Decimal>,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl Bracket {
    pub fn new(upper_bound: Decimal, rate: Decimal) -> Self {
        Bracket {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub fn top(rate: Decimal) -> Self {
        Bracket {
            upper_bound: None,
            rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ByFilingStatus<T> {
    pub single: T,
    pub married_joint: T,
    pub married_separate: T,
    pub head_of_household: T,
}

impl<T> ByFilingStatus<T> {
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedJoint => &self.married_joint,
            FilingStatus::MarriedSeparate => &self.married_separate,
            FilingStatus::HeadOfHousehold => &self.head_of_household,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (FilingStatus, &T)> {
        [
            (FilingStatus::Single, &self.single),
            (FilingStatus::MarriedJoint, &self.married_joint),
            (FilingStatus::MarriedSeparate, &self.married_separate),
            (FilingStatus::HeadOfHousehold, &self.head_of_household),
        ]
        .into_iter()
    }
}

/// Self-employment tax constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelfEmploymentRates {
    /// Share of net profit subject to SE tax (92.35%)
    #[serde(default = "default_net_earnings_factor")]
    #[schemars(with = "f64")]
    pub net_earnings_factor: Decimal,
    #[serde(default = "default_social_security_rate")]
    #[schemars(with = "f64")]
    pub social_security_rate: Decimal,
    #[serde(default = "default_medicare_rate")]
    #[schemars(with = "f64")]
    pub medicare_rate: Decimal,
    /// Earnings cap for the Social Security portion
    #[schemars(with = "f64")]
    pub social_security_wage_base: Decimal,
}

fn default_net_earnings_factor() -> Decimal {
    dec!(0.9235)
}

fn default_social_security_rate() -> Decimal {
    dec!(0.124)
}

fn default_medicare_rate() -> Decimal {
    dec!(0.029)
}

impl SelfEmploymentRates {
    fn with_wage_base(social_security_wage_base: Decimal) -> Self {
        SelfEmploymentRates {
            net_earnings_factor: default_net_earnings_factor(),
            social_security_rate: default_social_security_rate(),
            medicare_rate: default_medicare_rate(),
            social_security_wage_base,
        }
    }
}

/// Federal figures for one tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxTable {
    pub year: i32,
    #[schemars(with = "ByFilingStatus<f64>")]
    pub standard_deduction: ByFilingStatus<Decimal>,
    pub brackets: ByFilingStatus<Vec<Bracket>>,
    pub self_employment: SelfEmploymentRates,
}

impl TaxTable {
    pub fn standard_deduction(&self, status: FilingStatus) -> Decimal {
        *self.standard_deduction.get(status)
    }

    pub fn brackets(&self, status: FilingStatus) -> &[Bracket] {
        self.brackets.get(status)
    }

    fn validate(&self) -> Result<(), TableError> {
        let year = self.year;
        let se = &self.self_employment;
        for rate in [se.net_earnings_factor, se.social_security_rate, se.medicare_rate] {
            check_rate(year, rate)?;
        }

        for (status, brackets) in self.brackets.iter() {
            if brackets.is_empty() {
                return Err(TableError::EmptyBrackets { year, status });
            }
            let mut previous = Decimal::ZERO;
            for (i, bracket) in brackets.iter().enumerate() {
                check_rate(year, bracket.rate)?;
                match bracket.upper_bound {
                    Some(upper) if upper <= previous => {
                        return Err(TableError::UnsortedBrackets { year, status })
                    }
                    Some(upper) => previous = upper,
                    None if i + 1 != brackets.len() => {
                        return Err(TableError::UnboundedNotLast { year, status })
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

fn check_rate(year: i32, rate: Decimal) -> Result<(), TableError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(TableError::RateOutOfRange { year, rate });
    }
    Ok(())
}

/// Validated set of tax tables, sorted by year and never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTables {
    tables: Vec<TaxTable>,
}

impl TaxTables {
    pub fn new(mut tables: Vec<TaxTable>) -> Result<Self, TableError> {
        if tables.is_empty() {
            return Err(TableError::Empty);
        }
        tables.sort_by_key(|t| t.year);
        for pair in tables.windows(2) {
            if pair[0].year == pair[1].year {
                return Err(TableError::DuplicateYear(pair[0].year));
            }
        }
        for table in &tables {
            table.validate()?;
        }
        Ok(TaxTables { tables })
    }

    /// Tables shipped with the crate (IRS figures for 2024 and 2025)
    pub fn builtin() -> Self {
        TaxTables {
            tables: vec![table_2024(), table_2025()],
        }
    }

    /// Load tables from a JSON array of `TaxTable`
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let tables: Vec<TaxTable> = serde_json::from_reader(reader)?;
        Self::new(tables)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.tables.iter().map(|t| t.year)
    }

    /// Table for `year`, else the latest earlier table, else the earliest table
    pub fn for_year(&self, year: i32) -> &TaxTable {
        let table = self
            .tables
            .iter()
            .rev()
            .find(|t| t.year <= year)
            .unwrap_or(&self.tables[0]);
        if table.year != year {
            log::warn!(
                "No tax table for {}, using {} figures",
                year,
                table.year
            );
        }
        table
    }
}

impl Default for TaxTables {
    fn default() -> Self {
        Self::builtin()
    }
}

fn schedule(bounds: [Decimal; 6]) -> Vec<Bracket> {
    const RATES: [Decimal; 6] = [
        dec!(0.10),
        dec!(0.12),
        dec!(0.22),
        dec!(0.24),
        dec!(0.32),
        dec!(0.35),
    ];
    bounds
        .into_iter()
        .zip(RATES)
        .map(|(upper, rate)| Bracket::new(upper, rate))
        .chain(std::iter::once(Bracket::top(dec!(0.37))))
        .collect()
}

fn table_2024() -> TaxTable {
    TaxTable {
        year: 2024,
        standard_deduction: ByFilingStatus {
            single: dec!(14600),
            married_joint: dec!(29200),
            married_separate: dec!(14600),
            head_of_household: dec!(21900),
        },
        brackets: ByFilingStatus {
            single: schedule([
                dec!(11600),
                dec!(47150),
                dec!(100525),
                dec!(191950),
                dec!(243725),
                dec!(609350),
            ]),
            married_joint: schedule([
                dec!(23200),
                dec!(94300),
                dec!(201050),
                dec!(383900),
                dec!(487450),
                dec!(731200),
            ]),
            married_separate: schedule([
                dec!(11600),
                dec!(47150),
                dec!(100525),
                dec!(191950),
                dec!(243725),
                dec!(365600),
            ]),
            head_of_household: schedule([
                dec!(16550),
                dec!(63100),
                dec!(100500),
                dec!(191950),
                dec!(243700),
                dec!(609350),
            ]),
        },
        self_employment: SelfEmploymentRates::with_wage_base(dec!(168600)),
    }
}

fn table_2025() -> TaxTable {
    TaxTable {
        year: 2025,
        standard_deduction: ByFilingStatus {
            single: dec!(15000),
            married_joint: dec!(30000),
            married_separate: dec!(15000),
            head_of_household: dec!(22500),
        },
        brackets: ByFilingStatus {
            single: schedule([
                dec!(11925),
                dec!(48475),
                dec!(103350),
                dec!(197300),
                dec!(250525),
                dec!(626350),
            ]),
            married_joint: schedule([
                dec!(23850),
                dec!(96950),
                dec!(206700),
                dec!(394600),
                dec!(501050),
                dec!(751600),
            ]),
            married_separate: schedule([
                dec!(11925),
                dec!(48475),
                dec!(103350),
                dec!(197300),
                dec!(250525),
                dec!(375800),
            ]),
            head_of_household: schedule([
                dec!(17000),
                dec!(64850),
                dec!(103350),
                dec!(197300),
                dec!(250500),
                dec!(626350),
            ]),
        },
        self_employment: SelfEmploymentRates::with_wage_base(dec!(176100)),
    }
}
