//! Calculate command - dry-run assessment with breakdown, nothing is stored

use crate::cmd::{
    calculation_currency, exit_with_error_body, print_calculation, print_json, CalculationArgs,
    DefaultsArgs, GlobalArgs,
};
use crate::core::{calculate_assessment_amount, AssessmentDefaults};
use clap::Args;

#[derive(Args, Debug)]
pub struct CalculateCommand {
    #[command(flatten)]
    calculation: CalculationArgs,

    #[command(flatten)]
    defaults: DefaultsArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl CalculateCommand {
    pub fn exec(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let store = global.open_store()?;
        let values = self.calculation.parameter_values()?;
        let result = calculate_assessment_amount(
            &store,
            &self.calculation.entity,
            &self.calculation.source,
            &values,
        );

        let calculation = match result {
            Ok(calculation) => calculation,
            Err(err) if self.json => return exit_with_error_body(&err),
            Err(err) => return Err(err.into()),
        };

        if self.json {
            print_json(&calculation)
        } else {
            let defaults = AssessmentDefaults::from(&self.defaults);
            print_calculation(&calculation, &calculation_currency(&calculation, &defaults));
            Ok(())
        }
    }
}
