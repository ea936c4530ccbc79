use crate::input::CenterTable;
use crate::warnings::Warning;
use anyhow::Result;
pub use funding_protocol::{Hint, ResponseMeta};
use funding_solver::{Allocation, SolveStatus};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Allocate,
    Validate,
    Capabilities,
}

impl CommandAction {
    pub const ALL: [CommandAction; 3] = [
        CommandAction::Allocate,
        CommandAction::Validate,
        CommandAction::Capabilities,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Allocate => "allocate",
            CommandAction::Validate => "validate",
            CommandAction::Capabilities => "capabilities",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AllocatePayload {
    pub input: PathBuf,
    pub total_funding: f64,
    #[serde(default)]
    pub base_funding: f64,
    #[serde(default)]
    pub unincorporated_funding: f64,
    /// Global per-center cap; 0 means none
    #[serde(default)]
    pub cap: f64,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub report: Option<PathBuf>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidatePayload {
    pub input: PathBuf,
}

#[derive(Debug, Serialize, Clone)]
pub struct CenterAllocation {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    pub people_served: f64,
    pub incentive: f64,
    pub effective_cap: Option<f64>,
    pub per_center_funding: f64,
    pub capped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub past_funding: Option<f64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct AllocateOutput {
    pub per_person_rate: f64,
    pub status: SolveStatus,
    pub disbursed: f64,
    pub gap: f64,
    pub iterations: u32,
    pub rate_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation_rate: Option<f64>,
    pub total_cap: Option<f64>,
    pub capped_centers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_total: Option<f64>,
    pub warnings: Vec<Warning>,
    pub centers: Vec<CenterAllocation>,
}

impl AllocateOutput {
    pub fn new(table: &CenterTable, allocation: &Allocation, warnings: Vec<Warning>) -> Self {
        let centers = table
            .recipients
            .iter()
            .zip(&allocation.rows)
            .enumerate()
            .map(|(idx, (recipient, row))| CenterAllocation {
                row: idx + 1,
                program_name: table.program_name(idx).map(str::to_string),
                people_served: recipient.people_served,
                incentive: recipient.incentive,
                effective_cap: row.effective_cap.limit(),
                per_center_funding: row.per_center_funding,
                capped: row.capped,
                past_funding: table.past_funding_at(idx),
            })
            .collect();

        Self {
            per_person_rate: allocation.rate,
            status: allocation.status,
            disbursed: allocation.disbursed,
            gap: allocation.gap,
            iterations: allocation.iterations,
            rate_max: allocation.rate_max,
            saturation_rate: allocation.saturation_rate,
            total_cap: allocation.total_cap(),
            capped_centers: allocation.capped_count(),
            historical_total: table.historical_total(),
            warnings,
            centers,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ValidateOutput {
    pub rows: usize,
    pub columns: Vec<String>,
    pub has_per_center_cap: bool,
    pub has_program_name: bool,
    pub has_past_funding: bool,
    pub people_served_total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_total: Option<f64>,
}

/// Raised by `allocate --strict` when the solver could not meet the target
#[derive(Error, Debug)]
#[error("{message}")]
pub struct InfeasibleAllocation {
    pub status: SolveStatus,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct CommandOutcome {
    pub data: Value,
    pub hints: Vec<Hint>,
    pub meta: ResponseMeta,
}

impl CommandOutcome {
    pub fn from_value<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            hints: Vec::new(),
            meta: ResponseMeta::default(),
        })
    }
}

pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|err| PayloadError(err.to_string()).into())
}

#[derive(Error, Debug)]
#[error("Invalid payload: {0}")]
pub struct PayloadError(pub String);
