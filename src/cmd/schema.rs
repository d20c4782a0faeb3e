//! Schema command - print expected input formats

use crate::core::CreateAssessment;
use crate::store::StoreData;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which document to describe
    #[arg(value_enum, default_value = "store")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the store file
    Store,
    /// JSON Schema for an assessment request (assess-batch takes an array of these)
    Request,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.format {
            SchemaFormat::Store => schema_for!(StoreData),
            SchemaFormat::Request => schema_for!(CreateAssessment),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}
