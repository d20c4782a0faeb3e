use super::records::{CalculationRole, DataType};
use crate::store::StoreData;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Problems in parameter definitions that make a rule ineffective or ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum DefinitionWarning {
    /// The same key is declared twice for one income source; the later
    /// definition sees the same supplied value again.
    DuplicateKey { income_source_id: String, key: String },
    /// Definition refers to an income source that does not exist.
    OrphanDefinition { income_source_id: String, key: String },
    /// Enum multiplier with no multiplier table always applies 1.
    EnumMultiplierWithoutOptions { income_source_id: String, key: String },
    /// Filters only fire for boolean parameters.
    FilterNotBoolean { income_source_id: String, key: String },
    /// Multipliers on types other than number or enum always apply 1.
    MultiplierOnUnsupportedType { income_source_id: String, key: String },
    /// Multiplier table entry for a value outside the allowed enum values.
    UnknownEnumMultiplierValue {
        income_source_id: String,
        key: String,
        value: String,
    },
    /// Multiplier table entry below zero; selecting it makes the amount negative.
    NegativeMultiplier {
        income_source_id: String,
        key: String,
        value: String,
    },
}

impl DefinitionWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            DefinitionWarning::DuplicateKey { .. } => "DuplicateKey",
            DefinitionWarning::OrphanDefinition { .. } => "OrphanDefinition",
            DefinitionWarning::EnumMultiplierWithoutOptions { .. } => "EnumMultiplierWithoutOptions",
            DefinitionWarning::FilterNotBoolean { .. } => "FilterNotBoolean",
            DefinitionWarning::MultiplierOnUnsupportedType { .. } => "MultiplierOnUnsupportedType",
            DefinitionWarning::UnknownEnumMultiplierValue { .. } => "UnknownEnumMultiplierValue",
            DefinitionWarning::NegativeMultiplier { .. } => "NegativeMultiplier",
        }
    }

    pub fn income_source_id(&self) -> &str {
        match self {
            DefinitionWarning::DuplicateKey { income_source_id, .. }
            | DefinitionWarning::OrphanDefinition { income_source_id, .. }
            | DefinitionWarning::EnumMultiplierWithoutOptions { income_source_id, .. }
            | DefinitionWarning::FilterNotBoolean { income_source_id, .. }
            | DefinitionWarning::MultiplierOnUnsupportedType { income_source_id, .. }
            | DefinitionWarning::UnknownEnumMultiplierValue { income_source_id, .. }
            | DefinitionWarning::NegativeMultiplier { income_source_id, .. } => {
                income_source_id
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            DefinitionWarning::DuplicateKey { key, .. } => {
                format!("'{key}' is declared more than once")
            }
            DefinitionWarning::OrphanDefinition { key, .. } => {
                format!("'{key}' belongs to an unknown income source")
            }
            DefinitionWarning::EnumMultiplierWithoutOptions { key, .. } => {
                format!("'{key}' is an enum multiplier with no multipliers; it always applies 1")
            }
            DefinitionWarning::FilterNotBoolean { key, .. } => {
                format!("'{key}' is a filter on a non-boolean parameter; it never fires")
            }
            DefinitionWarning::MultiplierOnUnsupportedType { key, .. } => {
                format!("'{key}' is a multiplier that is neither number nor enum; it always applies 1")
            }
            DefinitionWarning::UnknownEnumMultiplierValue { key, value, .. } => {
                format!("'{key}' has a multiplier for '{value}', which is not an allowed value")
            }
            DefinitionWarning::NegativeMultiplier { key, value, .. } => {
                format!("'{key}' has a negative multiplier for '{value}'")
            }
        }
    }
}

/// Check every parameter definition in the store, in listing order.
pub fn validate_definitions(data: &StoreData) -> Vec<DefinitionWarning> {
    let sources: HashSet<&str> = data.income_sources.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut warnings = Vec::new();

    for def in &data.parameter_definitions {
        let source = def.income_source_id.clone();
        let key = def.key.clone();

        if !sources.contains(def.income_source_id.as_str()) {
            warnings.push(DefinitionWarning::OrphanDefinition {
                income_source_id: source.clone(),
                key: key.clone(),
            });
        }
        if !seen.insert((def.income_source_id.as_str(), def.key.as_str())) {
            warnings.push(DefinitionWarning::DuplicateKey {
                income_source_id: source.clone(),
                key: key.clone(),
            });
        }

        match (def.calculation_role, def.data_type) {
            (CalculationRole::Multiplier, DataType::Enum) => {
                if def.options.multipliers.is_empty() {
                    warnings.push(DefinitionWarning::EnumMultiplierWithoutOptions {
                        income_source_id: source.clone(),
                        key: key.clone(),
                    });
                }
                for (value, factor) in &def.options.multipliers {
                    let allowed = def.options.values.as_ref().map_or(true, |v| v.contains(value));
                    if !allowed {
                        warnings.push(DefinitionWarning::UnknownEnumMultiplierValue {
                            income_source_id: source.clone(),
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                    if factor.is_sign_negative() && !factor.is_zero() {
                        warnings.push(DefinitionWarning::NegativeMultiplier {
                            income_source_id: source.clone(),
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
            (CalculationRole::Multiplier, DataType::Boolean | DataType::Other) => {
                warnings.push(DefinitionWarning::MultiplierOnUnsupportedType {
                    income_source_id: source,
                    key,
                });
            }
            (CalculationRole::Filter, data_type) if data_type != DataType::Boolean => {
                warnings.push(DefinitionWarning::FilterNotBoolean {
                    income_source_id: source,
                    key,
                });
            }
            _ => {}
        }
    }

    warnings
}
