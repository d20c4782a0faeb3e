//! Validate command - surface parameter definition problems without assessing anything

use crate::cmd::{print_json, GlobalArgs};
use crate::core::{validate_definitions, DefinitionWarning};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    issue_count: usize,
    issues: Vec<ValidationIssue<'a>>,
}

#[derive(Debug, Serialize)]
struct ValidationIssue<'a> {
    #[serde(flatten)]
    warning: &'a DefinitionWarning,
    message: String,
}

impl ValidateCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let store = global.open_store()?;
        let warnings = validate_definitions(store.data());

        if self.json {
            print_json(&ValidationOutput {
                issue_count: warnings.len(),
                issues: warnings
                    .iter()
                    .map(|warning| ValidationIssue {
                        warning,
                        message: warning.message(),
                    })
                    .collect(),
            })?;
        } else {
            self.print_text(&warnings);
        }

        // Exit with code 1 if issues found
        if !warnings.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, warnings: &[DefinitionWarning]) {
        println!();
        println!("PARAMETER DEFINITION CHECK");
        println!();

        if warnings.is_empty() {
            println!("\u{2713} No issues found.");
            return;
        }

        println!("\u{26A0} {} issue(s) found:", warnings.len());
        println!();
        for (i, warning) in warnings.iter().enumerate() {
            println!(
                "  {}. [{}] {}",
                i + 1,
                warning.kind(),
                warning.income_source_id()
            );
            println!("     {}", warning.message());
            println!();
        }
    }
}
