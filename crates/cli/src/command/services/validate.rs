use crate::command::domain::{parse_payload, CommandOutcome, ValidatePayload, ValidateOutput};
use crate::input::{read_centers, PAST_FUNDING, PER_CENTER_CAP, PROGRAM_NAME};
use anyhow::Result;
use funding_protocol::Hint;
use serde_json::Value;

pub(crate) struct ValidateService;

impl ValidateService {
    pub fn run(&self, payload: Value) -> Result<CommandOutcome> {
        let payload: ValidatePayload = parse_payload(payload)?;
        let table = read_centers(&payload.input)?;

        let output = ValidateOutput {
            rows: table.len(),
            columns: table.headers.clone(),
            has_per_center_cap: table.has_column(PER_CENTER_CAP),
            has_program_name: table.has_column(PROGRAM_NAME),
            has_past_funding: table.has_column(PAST_FUNDING),
            people_served_total: table.people_served_total(),
            historical_total: table.historical_total(),
        };

        let mut outcome = CommandOutcome::from_value(&output)?;
        if !output.has_past_funding {
            outcome.hints.push(Hint::info(
                "No past_funding column: historical deviation checks are skipped",
            ));
        }
        if output.people_served_total == 0.0 {
            outcome.hints.push(Hint::warn(
                "people_served is 0 in every row: the per-person rate has no effect",
            ));
        }
        outcome.meta.input_path = Some(payload.input.display().to_string());
        outcome.meta.rows = Some(output.rows);
        Ok(outcome)
    }
}
