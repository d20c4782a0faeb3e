use super::{Store, StoreError, StoreResult};
use crate::core::{
    assessment_reference, Assessment, Entity, IncomeSource, NewAssessment, ParameterDefinition,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything the store holds; also the on-disk JSON layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoreData {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub income_sources: Vec<IncomeSource>,
    /// Listing order is the declared order used during calculation
    #[serde(default)]
    pub parameter_definitions: Vec<ParameterDefinition>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
}

impl StoreData {
    /// Reject duplicate record ids
    pub fn validate(&self) -> StoreResult<()> {
        check_unique("entity", self.entities.iter().map(|e| e.id.clone()))?;
        check_unique(
            "income source",
            self.income_sources.iter().map(|s| s.id.clone()),
        )?;
        check_unique(
            "assessment",
            self.assessments.iter().map(|a| a.id.to_string()),
        )?;
        Ok(())
    }

    fn next_assessment_id(&self) -> u64 {
        self.assessments.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }
}

fn check_unique(kind: &'static str, ids: impl Iterator<Item = String>) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            return Err(StoreError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: StoreData,
}

impl MemoryStore {
    pub fn new(data: StoreData) -> StoreResult<Self> {
        data.validate()?;
        Ok(MemoryStore { data })
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Run `f` as one unit: if it fails, every change it made is discarded.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<T, E>,
    {
        let snapshot = self.data.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                log::debug!("Rolling back transaction");
                self.data = snapshot;
                Err(err)
            }
        }
    }

    pub(super) fn restore(&mut self, data: StoreData) {
        self.data = data;
    }
}

impl Store for MemoryStore {
    fn entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        Ok(self.data.entities.iter().find(|e| e.id == id).cloned())
    }

    fn income_source(&self, id: &str) -> StoreResult<Option<IncomeSource>> {
        Ok(self.data.income_sources.iter().find(|s| s.id == id).cloned())
    }

    fn parameter_definitions(
        &self,
        income_source_id: &str,
    ) -> StoreResult<Vec<ParameterDefinition>> {
        Ok(self
            .data
            .parameter_definitions
            .iter()
            .filter(|d| d.income_source_id == income_source_id)
            .cloned()
            .collect())
    }

    fn insert_assessment(&mut self, new: NewAssessment) -> StoreResult<Assessment> {
        let id = self.data.next_assessment_id();
        let assessment = Assessment {
            id,
            reference: assessment_reference(
                id,
                &new.entity_id,
                &new.income_source_id,
                &new.created_at,
            ),
            entity_id: new.entity_id,
            income_source_id: new.income_source_id,
            amount_assessed: new.amount_assessed,
            currency: new.currency,
            status: new.status,
            due_date: new.due_date,
            assessment_period: new.assessment_period,
            meta: new.meta,
            created_at: new.created_at,
        };
        self.data.assessments.push(assessment.clone());
        Ok(assessment)
    }

    fn assessments(&self) -> StoreResult<Vec<Assessment>> {
        Ok(self.data.assessments.clone())
    }
}
