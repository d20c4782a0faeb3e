//! Sources command - income sources and their parameter definitions

use crate::cmd::{print_json, GlobalArgs};
use crate::core::{IncomeSource, ParameterDefinition};
use crate::money::{display_amount, format_factor};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct SourcesCommand {
    /// Only show this income source
    #[arg(short, long)]
    source: Option<String>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct SourceView<'a> {
    #[serde(flatten)]
    source: &'a IncomeSource,
    parameter_definitions: Vec<&'a ParameterDefinition>,
}

#[derive(Debug, Tabled)]
struct DefinitionRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Type")]
    data_type: &'static str,
    #[tabled(rename = "Role")]
    role: &'static str,
    #[tabled(rename = "Required")]
    required: &'static str,
    #[tabled(rename = "Multipliers")]
    multipliers: String,
}

impl DefinitionRow {
    fn new(position: usize, def: &ParameterDefinition) -> Self {
        DefinitionRow {
            position,
            key: def.key.clone(),
            label: def.label.clone().unwrap_or_default(),
            data_type: def.data_type.display(),
            role: def.calculation_role.display(),
            required: if def.required { "yes" } else { "" },
            multipliers: def
                .options
                .multipliers
                .iter()
                .map(|(value, factor)| format!("{value}=x{}", format_factor(*factor)))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl SourcesCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let store = global.open_store()?;
        let data = store.data();

        let views: Vec<SourceView> = data
            .income_sources
            .iter()
            .filter(|s| self.source.as_deref().map_or(true, |id| s.id == id))
            .map(|source| SourceView {
                source,
                parameter_definitions: data
                    .parameter_definitions
                    .iter()
                    .filter(|d| d.income_source_id == source.id)
                    .collect(),
            })
            .collect();

        if let Some(id) = &self.source {
            if views.is_empty() {
                anyhow::bail!("income source not found: {id}");
            }
        }

        if self.json {
            return print_json(&views);
        }

        for view in &views {
            let source = view.source;
            let currency = source.currency.as_deref().unwrap_or("NGN");
            println!();
            println!(
                "{} ({}){}",
                source.name,
                source.id,
                source
                    .code
                    .as_deref()
                    .map(|c| format!(" [{c}]"))
                    .unwrap_or_default()
            );
            println!(
                "Default amount: {}",
                display_amount(currency, source.base_amount())
            );
            if view.parameter_definitions.is_empty() {
                println!("No parameters");
                continue;
            }
            let rows: Vec<_> = view
                .parameter_definitions
                .iter()
                .enumerate()
                .map(|(i, d)| DefinitionRow::new(i + 1, d))
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        Ok(())
    }
}
