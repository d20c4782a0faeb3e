//! Assessments command - list stored assessments with filtering

use crate::cmd::{print_json, GlobalArgs};
use crate::core::Assessment;
use crate::money::display_amount;
use crate::store::Store;
use clap::Args;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct AssessmentsCommand {
    /// Filter by entity id
    #[arg(short, long)]
    entity: Option<String>,

    /// Filter by income source id
    #[arg(short, long)]
    source: Option<String>,

    /// Filter by assessment period (e.g., 2024-T2)
    #[arg(short, long)]
    period: Option<String>,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

/// Row for the assessments table and CSV output
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct AssessmentRow {
    #[tabled(rename = "#")]
    pub id: u64,

    #[tabled(rename = "Reference")]
    pub reference: String,

    #[tabled(rename = "Entity")]
    pub entity_id: String,

    #[tabled(rename = "Income Source")]
    pub income_source_id: String,

    #[tabled(rename = "Period")]
    pub period: String,

    #[tabled(rename = "Amount")]
    pub amount: String,

    #[tabled(rename = "Currency")]
    pub currency: String,

    #[tabled(rename = "Status")]
    pub status: String,

    #[tabled(rename = "Due")]
    pub due_date: String,
}

impl AssessmentRow {
    fn new(assessment: &Assessment, formatted: bool) -> Self {
        AssessmentRow {
            id: assessment.id,
            reference: assessment.reference.clone(),
            entity_id: assessment.entity_id.clone(),
            income_source_id: assessment.income_source_id.clone(),
            period: assessment.assessment_period.clone().unwrap_or_default(),
            amount: if formatted {
                display_amount(&assessment.currency, assessment.amount_assessed)
            } else {
                format!("{:.2}", assessment.amount_assessed)
            },
            currency: assessment.currency.clone(),
            status: assessment.status.display().to_string(),
            due_date: assessment.due_date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl AssessmentsCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let store = global.open_store()?;
        let assessments: Vec<Assessment> = store
            .assessments()?
            .into_iter()
            .filter(|a| self.matches(a))
            .collect();

        if self.json {
            print_json(&assessments)
        } else if self.csv {
            write_csv(assessments.iter().map(|a| AssessmentRow::new(a, false)), io::stdout())
        } else {
            self.print_table(&assessments);
            Ok(())
        }
    }

    fn matches(&self, assessment: &Assessment) -> bool {
        self.entity
            .as_deref()
            .map_or(true, |e| assessment.entity_id == e)
            && self
                .source
                .as_deref()
                .map_or(true, |s| assessment.income_source_id == s)
            && self
                .period
                .as_deref()
                .map_or(true, |p| assessment.assessment_period.as_deref() == Some(p))
    }

    fn print_table(&self, assessments: &[Assessment]) {
        if assessments.is_empty() {
            println!("No assessments found matching filters");
            return;
        }

        let rows: Vec<_> = assessments
            .iter()
            .map(|a| AssessmentRow::new(a, true))
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!("{} assessment(s)", assessments.len());
    }
}

fn write_csv<I, W>(rows: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = AssessmentRow>,
    W: io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
