use super::calculator::{calculate_assessment_amount, Calculation, CalculationError};
use super::records::{Assessment, AssessmentStatus, NewAssessment};
use super::values::{display_value, ParameterValues};
use crate::store::{Store, StoreError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_CURRENCY: &str = "NGN";
pub const DEFAULT_DUE_IN_DAYS: i64 = 30;

/// Fallbacks for fields a caller does not supply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentDefaults {
    pub currency: String,
    pub due_in_days: i64,
}

impl Default for AssessmentDefaults {
    fn default() -> Self {
        AssessmentDefaults {
            currency: DEFAULT_CURRENCY.to_string(),
            due_in_days: DEFAULT_DUE_IN_DAYS,
        }
    }
}

/// Request to assess one entity against one income source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreateAssessment {
    pub entity_id: String,
    pub income_source_id: String,
    #[serde(default)]
    pub parameter_values: ParameterValues,
    /// Derived from the period year and term parameters when absent
    #[serde(default)]
    pub assessment_period: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<AssessmentStatus>,
}

/// Calculate and persist one assessment.
///
/// Nothing is inserted if the calculation fails. Pass a transaction handle as
/// `store` to make the insert part of a larger unit of work.
pub fn create_assessment_with_calculation<S: Store + ?Sized>(
    store: &mut S,
    params: CreateAssessment,
    defaults: &AssessmentDefaults,
) -> Result<(Assessment, Calculation), CalculationError> {
    let calculation = calculate_assessment_amount(
        &*store,
        &params.entity_id,
        &params.income_source_id,
        &params.parameter_values,
    )?;

    let assessment_period = params.assessment_period.or_else(|| {
        period_label(
            calculation.period_year.as_ref(),
            calculation.period_term.as_ref(),
        )
    });

    let created_at = Utc::now();
    let due_date = params
        .due_date
        .unwrap_or_else(|| created_at.date_naive() + Duration::days(defaults.due_in_days));
    let currency = params
        .currency
        .or_else(|| calculation.income_source.currency.clone())
        .unwrap_or_else(|| defaults.currency.clone());

    // A parameter literally named "breakdown" is shadowed by the breakdown
    let mut meta = calculation.meta.clone();
    meta.insert(
        "breakdown".to_string(),
        serde_json::to_value(&calculation.breakdown).map_err(StoreError::from)?,
    );

    let assessment = store.insert_assessment(NewAssessment {
        entity_id: params.entity_id,
        income_source_id: params.income_source_id,
        amount_assessed: calculation.amount.round_dp(2),
        currency,
        status: params.status.unwrap_or_default(),
        due_date,
        assessment_period,
        meta,
        created_at,
    })?;

    log::info!(
        "Created assessment {} ({}) for {}: {} {}",
        assessment.id,
        assessment.reference,
        assessment.entity_id,
        assessment.currency,
        assessment.amount_assessed
    );

    Ok((assessment, calculation))
}

/// `"{year}-T{term}"` when both are known, `"{year}"` with only a year.
pub fn period_label(year: Option<&Value>, term: Option<&Value>) -> Option<String> {
    match (year, term) {
        (Some(year), Some(term)) => Some(format!(
            "{}-T{}",
            display_value(year),
            display_value(term)
        )),
        (Some(year), None) => Some(display_value(year)),
        (None, _) => None,
    }
}

/// Short human-facing reference, stable for a given record
pub fn assessment_reference(
    id: u64,
    entity_id: &str,
    income_source_id: &str,
    created_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{id}|{entity_id}|{income_source_id}|{}",
        created_at.to_rfc3339()
    ));
    let digest = hex::encode_upper(hasher.finalize());
    format!("ASM-{}", &digest[..10])
}
