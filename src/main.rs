mod cmd;
mod core;
mod money;
mod store;

use clap::{Parser, Subcommand};
use cmd::{
    assess::{AssessBatchCommand, AssessCommand},
    assessments::AssessmentsCommand,
    calculate::CalculateCommand,
    schema::SchemaCommand,
    sources::SourcesCommand,
    validate::ValidateCommand,
    GlobalArgs,
};

/// Calculate and record levy assessments for entities against income sources
#[derive(Parser, Debug)]
#[command(name = "moetrackit", version, about)]
struct Opts {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate an assessment amount without storing anything
    Calculate(CalculateCommand),
    /// Calculate and store a single assessment
    Assess(AssessCommand),
    /// Calculate and store a JSON array of assessment requests in one transaction
    AssessBatch(AssessBatchCommand),
    /// List stored assessments
    Assessments(AssessmentsCommand),
    /// Show income sources and their parameter definitions
    Sources(SourcesCommand),
    /// Check parameter definitions for configuration problems
    Validate(ValidateCommand),
    /// Print JSON schemas for the store file and assessment requests
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match &opts.command {
        Command::Calculate(cmd) => cmd.exec(&opts.global),
        Command::Assess(cmd) => cmd.exec(&opts.global),
        Command::AssessBatch(cmd) => cmd.exec(&opts.global),
        Command::Assessments(cmd) => cmd.exec(&opts.global),
        Command::Sources(cmd) => cmd.exec(&opts.global),
        Command::Validate(cmd) => cmd.exec(&opts.global),
        Command::Schema(cmd) => cmd.exec(),
    }
}
