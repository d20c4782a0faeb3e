pub mod assess;
pub mod assessments;
pub mod calculate;
pub mod schema;
pub mod sources;
pub mod validate;

use crate::core::values::display_value;
use crate::core::{
    period_label, AssessmentDefaults, Calculation, CalculationError, ErrorBody, ParameterValues,
};
use crate::money::{display_amount, format_factor};
use crate::store::JsonStore;
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Options shared by every command
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// JSON store holding entities, income sources, parameter definitions and assessments
    #[arg(
        long,
        global = true,
        env = "MOETRACKIT_STORE",
        default_value = "moetrackit.json"
    )]
    pub store: PathBuf,
}

impl GlobalArgs {
    pub fn open_store(&self) -> anyhow::Result<JsonStore> {
        JsonStore::open(&self.store)
            .with_context(|| format!("failed to open store {}", self.store.display()))
    }
}

/// Entity, income source and parameter values for a single calculation
#[derive(Args, Debug)]
pub struct CalculationArgs {
    /// Entity (institution) id
    #[arg(short, long)]
    pub entity: String,

    /// Income source id
    #[arg(short, long)]
    pub source: String,

    /// Parameter value as key=value (repeatable)
    #[arg(short, long = "param", value_parser = crate::core::parse_key_value)]
    pub params: Vec<(String, Value)>,

    /// JSON object of parameter values; --param entries take precedence
    #[arg(long = "params")]
    pub params_file: Option<PathBuf>,
}

impl CalculationArgs {
    pub fn parameter_values(&self) -> anyhow::Result<ParameterValues> {
        let mut values = match &self.params_file {
            Some(path) => read_parameter_values(path)?,
            None => ParameterValues::new(),
        };
        values.extend(self.params.iter().cloned());
        Ok(values)
    }
}

/// Fallbacks for assessment fields
#[derive(Args, Debug)]
pub struct DefaultsArgs {
    /// Currency when neither the request nor the income source sets one
    #[arg(long, env = "MOETRACKIT_CURRENCY", default_value = "NGN")]
    pub default_currency: String,

    /// Days from creation until an assessment falls due
    #[arg(long, env = "MOETRACKIT_DUE_DAYS", default_value_t = 30)]
    pub due_days: i64,
}

impl From<&DefaultsArgs> for AssessmentDefaults {
    fn from(args: &DefaultsArgs) -> Self {
        AssessmentDefaults {
            currency: args.default_currency.clone(),
            due_in_days: args.due_days,
        }
    }
}

fn read_parameter_values(path: &Path) -> anyhow::Result<ParameterValues> {
    let file = File::open(path)
        .with_context(|| format!("failed to open parameter file {}", path.display()))?;
    let values = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} must contain a JSON object", path.display()))?;
    Ok(values)
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a calculation failure as `{status, message}` and exit with code 1
pub fn exit_with_error_body(err: &CalculationError) -> anyhow::Result<()> {
    print_json(&ErrorBody::from(err))?;
    std::process::exit(1)
}

/// Currency an assessment of this calculation is stored in, absent an explicit one
pub fn calculation_currency(calculation: &Calculation, defaults: &AssessmentDefaults) -> String {
    calculation
        .income_source
        .currency
        .clone()
        .unwrap_or_else(|| defaults.currency.clone())
}

#[derive(Debug, Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Step")]
    step: &'static str,
    #[tabled(rename = "Parameter")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Factor")]
    factor: String,
}

/// Print the breakdown table followed by the assessed amount
pub fn print_calculation(calculation: &Calculation, currency: &str) {
    let breakdown = &calculation.breakdown;
    let mut rows = vec![BreakdownRow {
        step: "Default",
        key: calculation.income_source.name.clone(),
        value: display_amount(currency, breakdown.base_amount),
        factor: String::new(),
    }];
    if let Some(base) = &breakdown.base_override {
        rows.push(BreakdownRow {
            step: "Base override",
            key: base.key.clone(),
            value: display_amount(currency, base.value),
            factor: String::new(),
        });
    }
    for m in breakdown.multipliers() {
        rows.push(BreakdownRow {
            step: "Multiplier",
            key: m.key.clone(),
            value: display_value(&m.value),
            factor: format!("x{}", format_factor(m.multiplier)),
        });
    }
    if let Some(key) = &breakdown.filtered_out_by {
        rows.push(BreakdownRow {
            step: "Filtered out",
            key: key.clone(),
            value: "false".to_string(),
            factor: "x0".to_string(),
        });
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!();
    println!(
        "Amount assessed: {}",
        display_amount(currency, calculation.amount)
    );
    if let Some(period) = period_label(
        calculation.period_year.as_ref(),
        calculation.period_term.as_ref(),
    ) {
        println!("Period: {}", period);
    }
}
