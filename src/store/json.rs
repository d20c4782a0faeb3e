use super::{MemoryStore, Store, StoreData, StoreError, StoreResult};
use crate::core::{Assessment, Entity, IncomeSource, NewAssessment, ParameterDefinition};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A store backed by one JSON file. Changes are only written by [`JsonStore::save`]
/// or a successful [`JsonStore::transaction`].
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    store: MemoryStore,
}

impl JsonStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = File::open(path)?;
        let data: StoreData = serde_json::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} entities, {} income sources, {} parameter definitions, {} assessments from {}",
            data.entities.len(),
            data.income_sources.len(),
            data.parameter_definitions.len(),
            data.assessments.len(),
            path.display()
        );
        Ok(JsonStore {
            path: path.to_path_buf(),
            store: MemoryStore::new(data)?,
        })
    }

    pub fn data(&self) -> &StoreData {
        self.store.data()
    }

    /// Write the current state, replacing the file atomically.
    pub fn save(&self) -> StoreResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, self.store.data())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        log::debug!("Saved store to {}", self.path.display());
        Ok(())
    }

    /// Run `f` as one unit and save on success. On failure, in memory and on
    /// disk are left exactly as they were.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<T, E>,
        E: From<StoreError>,
    {
        let snapshot = self.store.data().clone();
        let value = self.store.transaction(f)?;
        if let Err(err) = self.save() {
            self.store.restore(snapshot);
            return Err(err.into());
        }
        Ok(value)
    }
}

impl Store for JsonStore {
    fn entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        self.store.entity(id)
    }

    fn income_source(&self, id: &str) -> StoreResult<Option<IncomeSource>> {
        self.store.income_source(id)
    }

    fn parameter_definitions(
        &self,
        income_source_id: &str,
    ) -> StoreResult<Vec<ParameterDefinition>> {
        self.store.parameter_definitions(income_source_id)
    }

    /// Inserts in memory only; call [`JsonStore::save`] or use a transaction.
    fn insert_assessment(&mut self, assessment: NewAssessment) -> StoreResult<Assessment> {
        self.store.insert_assessment(assessment)
    }

    fn assessments(&self) -> StoreResult<Vec<Assessment>> {
        self.store.assessments()
    }
}
