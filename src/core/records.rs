use super::values::{parse_decimal, ParameterValues};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// An institution or vendor that can be assessed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Institution type (e.g., "secondary_school", "vendor")
    #[serde(default)]
    pub kind: Option<String>,
    /// Local government area the entity belongs to
    #[serde(default)]
    pub lga: Option<String>,
}

/// A named revenue category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeSource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    /// Starting amount for every assessment. Missing or non-numeric values read as 0.
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[schemars(with = "Option<f64>")]
    pub default_amount: Option<Decimal>,
    /// Overrides the configured default currency for assessments of this source
    #[serde(default)]
    pub currency: Option<String>,
}

impl IncomeSource {
    pub fn base_amount(&self) -> Decimal {
        self.default_amount.unwrap_or(Decimal::ZERO)
    }
}

/// Declared type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Number,
    Enum,
    Boolean,
    #[default]
    #[serde(other)]
    Other,
}

impl DataType {
    pub fn display(&self) -> &'static str {
        match self {
            DataType::Number => "number",
            DataType::Enum => "enum",
            DataType::Boolean => "boolean",
            DataType::Other => "other",
        }
    }
}

/// How a parameter influences the assessed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CalculationRole {
    BaseAmount,
    Multiplier,
    Filter,
    PeriodYear,
    PeriodTerm,
    /// Captured in meta only
    #[default]
    #[serde(other)]
    Info,
}

impl CalculationRole {
    pub fn display(&self) -> &'static str {
        match self {
            CalculationRole::BaseAmount => "base_amount",
            CalculationRole::Multiplier => "multiplier",
            CalculationRole::Filter => "filter",
            CalculationRole::PeriodYear => "period_year",
            CalculationRole::PeriodTerm => "period_term",
            CalculationRole::Info => "info",
        }
    }
}

impl std::fmt::Display for CalculationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ParameterOptions {
    /// Enum value to multiplier factor
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, f64>")]
    pub multipliers: BTreeMap<String, Decimal>,
    /// Allowed enum values, if restricted
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

/// A single input the caller may supply for an income source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterDefinition {
    pub income_source_id: String,
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub data_type: DataType,
    /// Missing or unrecognised roles are informational
    #[serde(default, deserialize_with = "deserialize_role")]
    pub calculation_role: CalculationRole,
    #[serde(default)]
    pub options: ParameterOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl AssessmentStatus {
    pub fn display(&self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "Pending",
            AssessmentStatus::PartiallyPaid => "Partially Paid",
            AssessmentStatus::Paid => "Paid",
            AssessmentStatus::Cancelled => "Cancelled",
        }
    }
}

/// Assessment fields supplied by the caller; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub entity_id: String,
    pub income_source_id: String,
    pub amount_assessed: Decimal,
    pub currency: String,
    pub status: AssessmentStatus,
    pub due_date: NaiveDate,
    pub assessment_period: Option<String>,
    pub meta: ParameterValues,
    pub created_at: DateTime<Utc>,
}

/// A persisted assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assessment {
    pub id: u64,
    pub reference: String,
    pub entity_id: String,
    pub income_source_id: String,
    #[schemars(with = "f64")]
    pub amount_assessed: Decimal,
    pub currency: String,
    #[serde(default)]
    pub status: AssessmentStatus,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assessment_period: Option<String>,
    /// Parameter values as supplied, plus the calculation breakdown
    #[serde(default)]
    pub meta: ParameterValues,
    pub created_at: DateTime<Utc>,
}

fn deserialize_lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal))
}

// `null` roles behave like a missing role
fn deserialize_role<'de, D>(deserializer: D) -> Result<CalculationRole, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<CalculationRole>::deserialize(deserializer)?.unwrap_or_default())
}
