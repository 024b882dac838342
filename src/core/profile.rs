use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest flat state rate the estimator accepts
pub const MAX_STATE_RATE: Decimal = dec!(0.20);

/// Legal form of the business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[serde(alias = "sole_prop", alias = "sole_proprietor")]
    SoleProprietorship,
    #[serde(alias = "smllc", alias = "llc_single_member")]
    SingleMemberLlc,
    #[serde(alias = "mmllc", alias = "llc_multi_member")]
    MultiMemberLlc,
    #[serde(alias = "scorp", alias = "s_corporation")]
    SCorp,
    #[serde(alias = "ccorp", alias = "c_corporation")]
    CCorp,
    Partnership,
    #[default]
    Unknown,
}

impl EntityType {
    /// Lenient parse of legacy free-text entity values
    pub fn parse_legacy(raw: &str) -> Option<EntityType> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        match normalized.as_str() {
            "sole_proprietorship" | "sole_proprietor" | "sole_prop" | "sole_trader" | "soleprop" => {
                Some(EntityType::SoleProprietorship)
            }
            "llc" | "single_member_llc" | "smllc" | "llc_single_member" | "single_llc" => {
                Some(EntityType::SingleMemberLlc)
            }
            "multi_member_llc" | "mmllc" | "llc_multi_member" | "multi_llc" => {
                Some(EntityType::MultiMemberLlc)
            }
            "s_corp" | "scorp" | "s_corporation" => Some(EntityType::SCorp),
            "c_corp" | "ccorp" | "c_corporation" | "corporation" => Some(EntityType::CCorp),
            "partnership" | "llp" => Some(EntityType::Partnership),
            _ => None,
        }
    }

    /// Owner pays self-employment tax on the business profit
    pub fn is_self_employed(&self) -> bool {
        matches!(self, EntityType::SoleProprietorship | EntityType::SingleMemberLlc)
    }

    pub fn display(&self) -> &'static str {
        match self {
            EntityType::SoleProprietorship => "sole proprietorship",
            EntityType::SingleMemberLlc => "single-member LLC",
            EntityType::MultiMemberLlc => "multi-member LLC",
            EntityType::SCorp => "S corporation",
            EntityType::CCorp => "C corporation",
            EntityType::Partnership => "partnership",
            EntityType::Unknown => "unknown entity",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// Federal filing status of the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    #[serde(alias = "married_filing_jointly", alias = "mfj")]
    MarriedJoint,
    #[serde(alias = "married_filing_separately", alias = "mfs")]
    MarriedSeparate,
    #[serde(alias = "hoh")]
    HeadOfHousehold,
}

impl FilingStatus {
    pub fn display(&self) -> &'static str {
        match self {
            FilingStatus::Single => "single",
            FilingStatus::MarriedJoint => "married filing jointly",
            FilingStatus::MarriedSeparate => "married filing separately",
            FilingStatus::HeadOfHousehold => "head of household",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// Business tax settings as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BusinessTaxProfile {
    /// Entity type; takes priority over `legacy_entity_type`
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    /// Free-text entity type from older profiles (e.g. "LLC", "Sole Prop")
    #[serde(default)]
    pub legacy_entity_type: Option<String>,
    #[serde(default)]
    pub filing_status: Option<FilingStatus>,
    /// Two-letter state code
    #[serde(default)]
    pub state_code: Option<String>,
    /// Flat state income tax rate as a fraction (0.05 = 5%), clamped to 0-20%
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub state_rate: Option<Decimal>,
    #[serde(default)]
    pub payroll_enabled: bool,
    #[serde(default, alias = "sells_taxable_goods")]
    pub sells_taxable_goods_services: bool,
    /// Set to false to switch off self-employment tax
    #[serde(default)]
    pub self_employment_tax: Option<bool>,
}

/// Profile with every field resolved to a concrete value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProfile {
    pub entity_type: EntityType,
    pub filing_status: FilingStatus,
    pub state_code: Option<String>,
    pub state_rate: Decimal,
    pub payroll_enabled: bool,
    pub sells_taxable_goods_services: bool,
    pub self_employment_disabled: bool,
}

impl BusinessTaxProfile {
    pub fn normalize(&self) -> NormalizedProfile {
        let entity_type = self
            .entity_type
            .filter(|e| *e != EntityType::Unknown)
            .or_else(|| {
                self.legacy_entity_type
                    .as_deref()
                    .and_then(EntityType::parse_legacy)
            })
            .unwrap_or_default();

        let state_rate = self
            .state_rate
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, MAX_STATE_RATE);
        if self.state_rate.is_some_and(|r| r != state_rate) {
            log::warn!(
                "State rate {:?} clamped to {}",
                self.state_rate,
                state_rate
            );
        }

        let state_code = self
            .state_code
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        NormalizedProfile {
            entity_type,
            filing_status: self.filing_status.unwrap_or_default(),
            state_code,
            state_rate,
            payroll_enabled: self.payroll_enabled,
            sells_taxable_goods_services: self.sells_taxable_goods_services,
            self_employment_disabled: self.self_employment_tax == Some(false),
        }
    }
}

impl NormalizedProfile {
    pub fn self_employment_applies(&self) -> bool {
        self.entity_type.is_self_employed() && !self.self_employment_disabled
    }
}
