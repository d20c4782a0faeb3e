pub mod assessment;
pub mod calculator;
pub mod records;
pub mod values;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use assessment::{
    assessment_reference, create_assessment_with_calculation, period_label, AssessmentDefaults,
    CreateAssessment,
};
pub use calculator::{calculate_assessment_amount, Calculation, CalculationError, ErrorBody};
pub use records::{Assessment, Entity, IncomeSource, NewAssessment, ParameterDefinition};
pub use values::{parse_key_value, ParameterValues};
pub use warnings::{validate_definitions, DefinitionWarning};
