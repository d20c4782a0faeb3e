//! Record lookups and assessment persistence.
//!
//! The calculator only needs three reads and one insert, so it is written
//! against the [`Store`] trait. [`MemoryStore`] holds everything in memory;
//! [`JsonStore`] loads from and saves to a single JSON file.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::{MemoryStore, StoreData};

use crate::core::{Assessment, Entity, IncomeSource, NewAssessment, ParameterDefinition};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store {
    fn entity(&self, id: &str) -> StoreResult<Option<Entity>>;

    fn income_source(&self, id: &str) -> StoreResult<Option<IncomeSource>>;

    /// Definitions for an income source, in declared order
    fn parameter_definitions(&self, income_source_id: &str)
        -> StoreResult<Vec<ParameterDefinition>>;

    fn insert_assessment(&mut self, assessment: NewAssessment) -> StoreResult<Assessment>;

    fn assessments(&self) -> StoreResult<Vec<Assessment>>;
}
