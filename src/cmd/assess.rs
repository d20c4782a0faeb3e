//! Assess commands - calculate and store assessments

use crate::cmd::{
    exit_with_error_body, print_calculation, print_json, CalculationArgs, DefaultsArgs, GlobalArgs,
};
use crate::core::{
    create_assessment_with_calculation, Assessment, AssessmentDefaults, Calculation,
    CalculationError, CreateAssessment,
};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct AssessCommand {
    #[command(flatten)]
    calculation: CalculationArgs,

    /// Assessment period label; derived from period parameters when omitted
    #[arg(long)]
    period: Option<String>,

    /// Due date (YYYY-MM-DD); defaults to --due-days after today
    #[arg(long)]
    due_date: Option<NaiveDate>,

    /// Currency for this assessment
    #[arg(long)]
    currency: Option<String>,

    #[command(flatten)]
    defaults: DefaultsArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl AssessCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let request = CreateAssessment {
            entity_id: self.calculation.entity.clone(),
            income_source_id: self.calculation.source.clone(),
            parameter_values: self.calculation.parameter_values()?,
            assessment_period: self.period.clone(),
            due_date: self.due_date,
            currency: self.currency.clone(),
            status: None,
        };
        store_requests(global, vec![request], &self.defaults, self.json)
    }
}

#[derive(Args, Debug)]
pub struct AssessBatchCommand {
    /// JSON array of assessment requests; all are stored or none are
    file: PathBuf,

    #[command(flatten)]
    defaults: DefaultsArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl AssessBatchCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let requests = read_batch(&self.file)?;
        store_requests(global, requests, &self.defaults, self.json)
    }
}

/// Create every request inside one transaction and report the result
fn store_requests(
    global: &GlobalArgs,
    requests: Vec<CreateAssessment>,
    defaults: &DefaultsArgs,
    json: bool,
) -> anyhow::Result<()> {
    let mut store = global.open_store()?;
    let defaults = AssessmentDefaults::from(defaults);

    let result = store.transaction(|tx| {
        requests
            .into_iter()
            .map(|request| create_assessment_with_calculation(&mut *tx, request, &defaults))
            .collect::<Result<Vec<_>, CalculationError>>()
    });

    let created = match result {
        Ok(created) => created,
        Err(err) if json => return exit_with_error_body(&err),
        Err(err) => return Err(err.into()),
    };
    log::info!(
        "Stored {} assessment(s) in {}",
        created.len(),
        global.store.display()
    );

    if json {
        let assessments: Vec<&Assessment> = created.iter().map(|(a, _)| a).collect();
        print_json(&assessments)
    } else {
        print_created(&created);
        Ok(())
    }
}

fn print_created(created: &[(Assessment, Calculation)]) {
    for (assessment, calculation) in created {
        println!();
        println!(
            "Assessment #{} {} ({} / {})",
            assessment.id,
            assessment.reference,
            assessment.entity_id,
            assessment.income_source_id
        );
        print_calculation(calculation, &assessment.currency);
        println!("Due: {}", assessment.due_date.format("%Y-%m-%d"));
    }
    if created.len() > 1 {
        println!();
        println!("{} assessments stored", created.len());
    }
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<CreateAssessment>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open batch file {}", path.display()))?;
    let requests: Vec<CreateAssessment> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid batch file {}", path.display()))?;
    if requests.is_empty() {
        anyhow::bail!("batch file {} contains no requests", path.display());
    }
    Ok(requests)
}
