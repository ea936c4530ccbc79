use crate::command::domain::{
    parse_payload, AllocateOutput, AllocatePayload, CommandOutcome, InfeasibleAllocation,
};
use crate::input::{funding_params, read_centers};
use crate::output::{default_output_path, write_allocation_file};
use crate::report::render_allocation_report;
use crate::settings::Settings;
use crate::warnings::{collect_warnings, WarningCode};
use anyhow::{Context, Result};
use chrono::Local;
use funding_protocol::Hint;
use funding_solver::Solver;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub(crate) struct AllocateService {
    settings: Settings,
}

impl AllocateService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self, payload: Value) -> Result<CommandOutcome> {
        let payload: AllocatePayload = parse_payload(payload)?;
        let table = read_centers(&payload.input)?;
        let params = funding_params(
            payload.total_funding,
            payload.base_funding,
            payload.unincorporated_funding,
            payload.cap,
        )?;

        let solver = Solver::new(self.settings.solver.clone())?;
        let allocation = solver.solve(&table.recipients, &params)?;
        let warnings = collect_warnings(
            &table,
            &allocation,
            self.settings.report.deviation_threshold,
        );

        if payload.strict && !allocation.is_feasible() {
            let message = warnings
                .iter()
                .find(|w| w.code != WarningCode::HistoricalDeviation)
                .map(|w| w.message.clone())
                .unwrap_or_else(|| {
                    format!("Allocation is {}", allocation.status.as_str())
                });
            return Err(InfeasibleAllocation {
                status: allocation.status,
                message,
            }
            .into());
        }

        let output_path = match &payload.output {
            Some(path) => path.clone(),
            None => {
                let dir = payload
                    .output_dir
                    .as_deref()
                    .unwrap_or(&self.settings.report.output_dir);
                default_output_path(dir, Local::now())
            }
        };
        write_allocation_file(&output_path, &table, &allocation)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        if let Some(report_path) = &payload.report {
            let markdown =
                render_allocation_report(&payload.input, &table, &allocation, &warnings);
            write_report(report_path, &markdown)?;
        }

        let mut hints: Vec<Hint> = warnings
            .iter()
            .map(|warning| Hint::warn(warning.message.clone()))
            .collect();
        hints.push(Hint::info(format!(
            "Wrote {} rows to {}",
            table.len(),
            output_path.display()
        )));

        let output = AllocateOutput::new(&table, &allocation, warnings);
        let mut outcome = CommandOutcome::from_value(output)?;
        outcome.hints = hints;
        outcome.meta.input_path = Some(payload.input.display().to_string());
        outcome.meta.output_path = Some(output_path.display().to_string());
        outcome.meta.report_path = payload
            .report
            .as_ref()
            .map(|path| path.display().to_string());
        outcome.meta.rows = Some(table.len());
        Ok(outcome)
    }
}

fn write_report(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, markdown).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}
