//! Dynamic assessment amount calculation.
//!
//! The amount starts at the income source's default and is then shaped by
//! each parameter definition, in declared order:
//!
//! - `base_amount` replaces the running amount
//! - `multiplier` compounds onto the running amount
//! - `filter` forces the amount to zero when supplied as `false`
//! - `period_year` / `period_term` are captured for the period label
//!
//! Because later multipliers apply to whatever the amount currently is, the
//! declaration order of definitions is significant.

use super::records::{CalculationRole, DataType, IncomeSource, ParameterDefinition};
use super::values::{display_value, is_supplied, parse_decimal, ParameterValues};
use crate::store::{Store, StoreError};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),
    #[error("income source not found: {0}")]
    IncomeSourceNotFound(String),
    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(String),
    #[error("assessed amount overflowed while applying parameter: {key}")]
    AmountOverflow { key: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CalculationError {
    /// HTTP-class status for reporting the error to a caller
    pub fn status_code(&self) -> u16 {
        match self {
            CalculationError::EntityNotFound(_) | CalculationError::IncomeSourceNotFound(_) => 404,
            CalculationError::MissingRequiredParameter(_) => 400,
            CalculationError::AmountOverflow { .. } => 422,
            CalculationError::Store(_) => 500,
        }
    }
}

/// Error body returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl From<&CalculationError> for ErrorBody {
    fn from(err: &CalculationError) -> Self {
        ErrorBody {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BaseOverride {
    pub key: String,
    #[schemars(with = "f64")]
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MultiplierApplied {
    pub key: String,
    /// The value as supplied
    pub value: Value,
    #[schemars(with = "f64")]
    pub multiplier: Decimal,
}

/// Audit trail of how the amount was derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Breakdown {
    #[schemars(with = "f64")]
    pub base_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_override: Option<BaseOverride>,
    /// Present once the first multiplier has been applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipliers: Option<Vec<MultiplierApplied>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_out_by: Option<String>,
}

impl Breakdown {
    fn new(base_amount: Decimal) -> Self {
        Breakdown {
            base_amount,
            base_override: None,
            multipliers: None,
            filtered_out_by: None,
        }
    }

    pub fn multipliers(&self) -> &[MultiplierApplied] {
        self.multipliers.as_deref().unwrap_or_default()
    }
}

/// Result of a calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    pub amount: Decimal,
    pub breakdown: Breakdown,
    /// Every definition's supplied value, `null` when absent
    pub meta: ParameterValues,
    pub period_year: Option<Value>,
    pub period_term: Option<Value>,
    /// The income source the calculation was run against
    #[serde(skip)]
    pub income_source: IncomeSource,
}

/// Calculate the assessment amount for an entity and income source.
///
/// Only reads from the store. All three lookups happen before validation,
/// and both the required-parameter check and the effect pass walk the same
/// fetched list of definitions.
pub fn calculate_assessment_amount<S: Store + ?Sized>(
    store: &S,
    entity_id: &str,
    income_source_id: &str,
    parameter_values: &ParameterValues,
) -> Result<Calculation, CalculationError> {
    let entity = store.entity(entity_id)?;
    let income_source = store.income_source(income_source_id)?;
    let definitions = store.parameter_definitions(income_source_id)?;

    if entity.is_none() {
        return Err(CalculationError::EntityNotFound(entity_id.to_string()));
    }
    let income_source = income_source
        .ok_or_else(|| CalculationError::IncomeSourceNotFound(income_source_id.to_string()))?;

    check_required(&definitions, parameter_values)?;

    let mut calc = Calculator::new(income_source.base_amount());
    for definition in &definitions {
        calc.apply(definition, parameter_values.get(&definition.key))?;
    }

    log::debug!(
        "Assessed {} for entity {} against {}: {}",
        income_source.name,
        entity_id,
        income_source_id,
        calc.amount
    );

    Ok(Calculation {
        amount: calc.amount,
        breakdown: calc.breakdown,
        meta: calc.meta,
        period_year: calc.period_year,
        period_term: calc.period_term,
        income_source,
    })
}

/// First required definition (in listing order) without a usable value fails.
fn check_required(
    definitions: &[ParameterDefinition],
    values: &ParameterValues,
) -> Result<(), CalculationError> {
    match definitions
        .iter()
        .find(|d| d.required && !is_supplied(values.get(&d.key)))
    {
        Some(missing) => Err(CalculationError::MissingRequiredParameter(
            missing.key.clone(),
        )),
        None => Ok(()),
    }
}

struct Calculator {
    amount: Decimal,
    breakdown: Breakdown,
    meta: ParameterValues,
    period_year: Option<Value>,
    period_term: Option<Value>,
}

impl Calculator {
    fn new(base_amount: Decimal) -> Self {
        Calculator {
            amount: base_amount,
            breakdown: Breakdown::new(base_amount),
            meta: ParameterValues::new(),
            period_year: None,
            period_term: None,
        }
    }

    fn apply(
        &mut self,
        definition: &ParameterDefinition,
        value: Option<&Value>,
    ) -> Result<(), CalculationError> {
        let key = &definition.key;
        self.meta
            .insert(key.clone(), value.cloned().unwrap_or(Value::Null));

        let value = match value {
            Some(v) if is_supplied(Some(v)) => v,
            _ => return Ok(()),
        };

        match definition.calculation_role {
            CalculationRole::BaseAmount => self.base_amount(key, value),
            CalculationRole::Multiplier => self.multiplier(definition, value)?,
            CalculationRole::Filter => self.filter(definition, value),
            CalculationRole::PeriodYear => self.period_year = Some(value.clone()),
            CalculationRole::PeriodTerm => self.period_term = Some(value.clone()),
            CalculationRole::Info => {}
        }
        Ok(())
    }

    fn base_amount(&mut self, key: &str, value: &Value) {
        match parse_decimal(value) {
            Some(base) => {
                if base.is_sign_negative() && !base.is_zero() {
                    log::warn!("{key}: negative base amount {base}");
                }
                log::debug!("{key}: base amount {} -> {base}", self.amount);
                self.amount = base;
                self.breakdown.base_override = Some(BaseOverride {
                    key: key.to_string(),
                    value: base,
                });
            }
            None => log::warn!("{key}: ignoring non-numeric base amount {value}"),
        }
    }

    fn multiplier(
        &mut self,
        definition: &ParameterDefinition,
        value: &Value,
    ) -> Result<(), CalculationError> {
        let key = &definition.key;
        let factor = match definition.data_type {
            DataType::Number => parse_decimal(value).unwrap_or(Decimal::ONE),
            DataType::Enum => definition
                .options
                .multipliers
                .get(&display_value(value))
                .copied()
                .unwrap_or(Decimal::ONE),
            DataType::Boolean | DataType::Other => Decimal::ONE,
        };
        if factor.is_sign_negative() && !factor.is_zero() {
            log::warn!("{key}: negative multiplier {factor}");
        }

        self.amount = self
            .amount
            .checked_mul(factor)
            .ok_or_else(|| CalculationError::AmountOverflow { key: key.clone() })?;
        log::debug!("{key}: x{factor} -> {}", self.amount);

        self.breakdown
            .multipliers
            .get_or_insert_with(Vec::new)
            .push(MultiplierApplied {
                key: key.clone(),
                value: value.clone(),
                multiplier: factor,
            });
        Ok(())
    }

    fn filter(&mut self, definition: &ParameterDefinition, value: &Value) {
        if definition.data_type == DataType::Boolean && *value == Value::Bool(false) {
            log::debug!("{}: filtered out", definition.key);
            self.amount = Decimal::ZERO;
            self.breakdown.filtered_out_by = Some(definition.key.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::{Entity, ParameterOptions};
    use crate::store::{MemoryStore, StoreData};
    use rust_decimal_macros::dec;
    use serde_json::json;

    const ENTITY: &str = "gss-otukpo";
    const SOURCE: &str = "school-levy";

    fn def(key: &str, data_type: DataType, role: CalculationRole) -> ParameterDefinition {
        ParameterDefinition {
            income_source_id: SOURCE.to_string(),
            key: key.to_string(),
            label: None,
            required: false,
            data_type,
            calculation_role: role,
            options: ParameterOptions::default(),
        }
    }

    fn required(mut d: ParameterDefinition) -> ParameterDefinition {
        d.required = true;
        d
    }

    fn school_type() -> ParameterDefinition {
        let mut d = def("school_type", DataType::Enum, CalculationRole::Multiplier);
        d.options.multipliers.extend([
            ("boarding".to_string(), dec!(1.5)),
            ("day".to_string(), dec!(1)),
        ]);
        d
    }

    fn store(default_amount: Option<Decimal>, definitions: Vec<ParameterDefinition>) -> MemoryStore {
        MemoryStore::new(StoreData {
            entities: vec![Entity {
                id: ENTITY.to_string(),
                name: "GSS Otukpo".to_string(),
                kind: None,
                lga: Some("Otukpo".to_string()),
            }],
            income_sources: vec![IncomeSource {
                id: SOURCE.to_string(),
                name: "School Levy".to_string(),
                code: None,
                default_amount,
                currency: None,
            }],
            parameter_definitions: definitions,
            assessments: vec![],
        })
        .unwrap()
    }

    fn values(pairs: &[(&str, Value)]) -> ParameterValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn calculate(store: &MemoryStore, pairs: &[(&str, Value)]) -> Calculation {
        calculate_assessment_amount(store, ENTITY, SOURCE, &values(pairs)).unwrap()
    }

    #[test]
    fn no_definitions_returns_default_amount() {
        let store = store(Some(dec!(1000)), vec![]);
        let calc = calculate(&store, &[]);
        assert_eq!(calc.amount, dec!(1000));
        assert_eq!(calc.breakdown.base_amount, dec!(1000));
        assert!(calc.breakdown.multipliers().is_empty());
        assert!(calc.breakdown.base_override.is_none());
        assert!(calc.meta.is_empty());
    }

    #[test]
    fn negative_values_are_applied_as_given() {
        let store = store(
            Some(dec!(1000)),
            vec![def("students", DataType::Number, CalculationRole::Multiplier)],
        );
        let calc = calculate(&store, &[("students", json!("-3"))]);
        assert_eq!(calc.amount, dec!(-3000));
        assert_eq!(calc.breakdown.multipliers()[0].multiplier, dec!(-3));
    }

    #[test]
    fn missing_default_amount_starts_at_zero() {
        let store = store(None, vec![]);
        assert_eq!(calculate(&store, &[]).amount, Decimal::ZERO);
    }

    #[test]
    fn base_amount_overrides_default() {
        let store = store(
            Some(dec!(1000)),
            vec![def("fee", DataType::Number, CalculationRole::BaseAmount)],
        );
        let calc = calculate(&store, &[("fee", json!("5000"))]);
        assert_eq!(calc.amount, dec!(5000));
        assert_eq!(
            calc.breakdown.base_override,
            Some(BaseOverride {
                key: "fee".to_string(),
                value: dec!(5000)
            })
        );
        assert_eq!(calc.breakdown.base_amount, dec!(1000));
    }

    #[test]
    fn non_numeric_base_amount_is_ignored() {
        let store = store(
            Some(dec!(1000)),
            vec![def("fee", DataType::Number, CalculationRole::BaseAmount)],
        );
        let calc = calculate(&store, &[("fee", json!("five thousand"))]);
        assert_eq!(calc.amount, dec!(1000));
        assert!(calc.breakdown.base_override.is_none());
        assert_eq!(calc.meta["fee"], json!("five thousand"));
    }

    #[test]
    fn numeric_multiplier() {
        let store = store(
            Some(dec!(1000)),
            vec![def("students", DataType::Number, CalculationRole::Multiplier)],
        );
        let calc = calculate(&store, &[("students", json!(2))]);
        assert_eq!(calc.amount, dec!(2000));
        assert_eq!(
            calc.breakdown.multipliers(),
            &[MultiplierApplied {
                key: "students".to_string(),
                value: json!(2),
                multiplier: dec!(2),
            }]
        );
    }

    #[test]
    fn unparseable_numeric_multiplier_defaults_to_one() {
        let store = store(
            Some(dec!(1000)),
            vec![def("students", DataType::Number, CalculationRole::Multiplier)],
        );
        let calc = calculate(&store, &[("students", json!("many"))]);
        assert_eq!(calc.amount, dec!(1000));
        assert_eq!(calc.breakdown.multipliers()[0].multiplier, Decimal::ONE);
    }

    #[test]
    fn enum_multiplier_uses_options() {
        let store = store(Some(dec!(1000)), vec![school_type()]);
        assert_eq!(
            calculate(&store, &[("school_type", json!("boarding"))]).amount,
            dec!(1500)
        );
        assert_eq!(
            calculate(&store, &[("school_type", json!("day"))]).amount,
            dec!(1000)
        );
        // Unknown enum value
        let calc = calculate(&store, &[("school_type", json!("mission"))]);
        assert_eq!(calc.amount, dec!(1000));
        assert_eq!(calc.breakdown.multipliers()[0].multiplier, Decimal::ONE);
    }

    #[test]
    fn multiplier_on_other_type_is_one() {
        let store = store(
            Some(dec!(1000)),
            vec![def("flag", DataType::Boolean, CalculationRole::Multiplier)],
        );
        let calc = calculate(&store, &[("flag", json!(true))]);
        assert_eq!(calc.amount, dec!(1000));
        assert_eq!(calc.breakdown.multipliers().len(), 1);
    }

    #[test]
    fn multipliers_compound_in_order() {
        let store = store(
            Some(dec!(100)),
            vec![
                def("students", DataType::Number, CalculationRole::Multiplier),
                school_type(),
            ],
        );
        let calc = calculate(
            &store,
            &[("students", json!(40)), ("school_type", json!("boarding"))],
        );
        assert_eq!(calc.amount, dec!(6000));
        let keys: Vec<_> = calc
            .breakdown
            .multipliers()
            .iter()
            .map(|m| m.key.as_str())
            .collect();
        assert_eq!(keys, vec!["students", "school_type"]);
    }

    #[test]
    fn boolean_false_filter_zeroes_amount() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("students", DataType::Number, CalculationRole::Multiplier),
                def("is_active", DataType::Boolean, CalculationRole::Filter),
            ],
        );
        let calc = calculate(
            &store,
            &[("students", json!(3)), ("is_active", json!(false))],
        );
        assert_eq!(calc.amount, Decimal::ZERO);
        assert_eq!(calc.breakdown.filtered_out_by.as_deref(), Some("is_active"));
    }

    #[test]
    fn filter_only_fires_on_boolean_false() {
        let boolean = store(
            Some(dec!(1000)),
            vec![def("is_active", DataType::Boolean, CalculationRole::Filter)],
        );
        for value in [json!(true), json!("false"), json!(0)] {
            let calc = calculate(&boolean, &[("is_active", value)]);
            assert_eq!(calc.amount, dec!(1000));
            assert!(calc.breakdown.filtered_out_by.is_none());
        }

        let text = store(
            Some(dec!(1000)),
            vec![def("is_active", DataType::Other, CalculationRole::Filter)],
        );
        let calc = calculate(&text, &[("is_active", json!(false))]);
        assert_eq!(calc.amount, dec!(1000));
    }

    #[test]
    fn multiplier_after_filter_stays_zero() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("is_active", DataType::Boolean, CalculationRole::Filter),
                def("students", DataType::Number, CalculationRole::Multiplier),
            ],
        );
        let calc = calculate(
            &store,
            &[("is_active", json!(false)), ("students", json!(5))],
        );
        assert_eq!(calc.amount, Decimal::ZERO);
        assert_eq!(calc.breakdown.multipliers().len(), 1);
    }

    #[test]
    fn missing_required_parameter_names_key() {
        let store = store(
            Some(dec!(1000)),
            vec![required(def(
                "students",
                DataType::Number,
                CalculationRole::Multiplier,
            ))],
        );
        let err = calculate_assessment_amount(&store, ENTITY, SOURCE, &ParameterValues::new())
            .unwrap_err();
        assert!(matches!(err, CalculationError::MissingRequiredParameter(ref k) if k == "students"));
        assert_eq!(err.status_code(), 400);

        let err = calculate_assessment_amount(
            &store,
            ENTITY,
            SOURCE,
            &values(&[("students", json!(""))]),
        )
        .unwrap_err();
        assert!(matches!(err, CalculationError::MissingRequiredParameter(ref k) if k == "students"));
    }

    #[test]
    fn first_missing_required_parameter_wins() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("notes", DataType::Other, CalculationRole::Info),
                required(def("year", DataType::Number, CalculationRole::PeriodYear)),
                required(def("students", DataType::Number, CalculationRole::Multiplier)),
            ],
        );
        let err = calculate_assessment_amount(&store, ENTITY, SOURCE, &ParameterValues::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: year");
    }

    #[test]
    fn unknown_entity_and_income_source() {
        let store = store(Some(dec!(1000)), vec![]);
        let err = calculate_assessment_amount(&store, "nope", SOURCE, &ParameterValues::new())
            .unwrap_err();
        assert!(matches!(err, CalculationError::EntityNotFound(ref id) if id == "nope"));
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            ErrorBody::from(&err),
            ErrorBody {
                status: 404,
                message: "entity not found: nope".to_string()
            }
        );

        let err = calculate_assessment_amount(&store, ENTITY, "nope", &ParameterValues::new())
            .unwrap_err();
        assert!(matches!(err, CalculationError::IncomeSourceNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn meta_records_every_definition() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("notes", DataType::Other, CalculationRole::Info),
                def("students", DataType::Number, CalculationRole::Multiplier),
                def("lga", DataType::Other, CalculationRole::Info),
            ],
        );
        let calc = calculate(&store, &[("notes", json!("first term")), ("extra", json!(1))]);
        assert_eq!(calc.meta.len(), 3);
        assert_eq!(calc.meta["notes"], json!("first term"));
        assert_eq!(calc.meta["students"], Value::Null);
        assert_eq!(calc.meta["lga"], Value::Null);
        assert!(!calc.meta.contains_key("extra"));
        // Absent optional multiplier contributes nothing
        assert!(calc.breakdown.multipliers.is_none());
        assert_eq!(calc.amount, dec!(1000));
    }

    #[test]
    fn period_values_are_captured() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("year", DataType::Number, CalculationRole::PeriodYear),
                def("term", DataType::Enum, CalculationRole::PeriodTerm),
            ],
        );
        let calc = calculate(&store, &[("year", json!(2024)), ("term", json!("2"))]);
        assert_eq!(calc.period_year, Some(json!(2024)));
        assert_eq!(calc.period_term, Some(json!("2")));
        assert_eq!(calc.amount, dec!(1000));

        let calc = calculate(&store, &[("year", json!(""))]);
        assert_eq!(calc.period_year, None);
        assert_eq!(calc.period_term, None);
    }

    #[test]
    fn base_override_then_multiplier_applies_to_override() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("fee", DataType::Number, CalculationRole::BaseAmount),
                def("students", DataType::Number, CalculationRole::Multiplier),
            ],
        );
        let calc = calculate(&store, &[("fee", json!("5000")), ("students", json!(2))]);
        assert_eq!(calc.amount, dec!(10000));
    }

    #[test]
    fn multiplier_then_base_override_discards_multiplier() {
        let store = store(
            Some(dec!(1000)),
            vec![
                def("students", DataType::Number, CalculationRole::Multiplier),
                def("fee", DataType::Number, CalculationRole::BaseAmount),
            ],
        );
        let calc = calculate(&store, &[("fee", json!("5000")), ("students", json!(2))]);
        assert_eq!(calc.amount, dec!(5000));
        // Applied to the default before the override replaced it
        assert_eq!(calc.breakdown.multipliers().len(), 1);
    }

    #[test]
    fn repeated_calculation_is_identical() {
        let store = store(
            Some(dec!(750.25)),
            vec![
                def("students", DataType::Number, CalculationRole::Multiplier),
                school_type(),
                def("year", DataType::Number, CalculationRole::PeriodYear),
            ],
        );
        let input = [
            ("students", json!("12.5")),
            ("school_type", json!("boarding")),
            ("year", json!(2024)),
        ];
        let first = calculate(&store, &input);
        let second = calculate(&store, &input);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let store = store(
            Some(Decimal::MAX),
            vec![def("students", DataType::Number, CalculationRole::Multiplier)],
        );
        let err = calculate_assessment_amount(
            &store,
            ENTITY,
            SOURCE,
            &values(&[("students", json!(10))]),
        )
        .unwrap_err();
        assert!(matches!(err, CalculationError::AmountOverflow { ref key } if key == "students"));
    }

    #[test]
    fn breakdown_serializes_only_populated_fields() {
        let store = store(Some(dec!(1000)), vec![]);
        let calc = calculate(&store, &[]);
        let json = serde_json::to_value(&calc.breakdown).unwrap();
        assert_eq!(json, json!({"base_amount": "1000"}));
    }
}
