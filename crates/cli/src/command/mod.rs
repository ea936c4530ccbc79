pub mod domain;
mod services;

pub use domain::{
    AllocateOutput, AllocatePayload, CenterAllocation, CommandAction, CommandOutcome,
    CommandRequest, InfeasibleAllocation, PayloadError, ValidateOutput, ValidatePayload,
};

use crate::input::InputError;
use crate::settings::LoadedSettings;
use funding_protocol::{ErrorEnvelope, Response, ResponseMeta};
use funding_solver::SolverError;
use services::Services;
use std::io;
use std::time::Instant;

pub struct CommandHandler {
    services: Services,
    config_path: Option<String>,
}

impl CommandHandler {
    pub fn new(loaded: LoadedSettings) -> Self {
        Self {
            config_path: loaded.path.map(|path| path.display().to_string()),
            services: Services::new(loaded.settings),
        }
    }

    pub fn execute(&self, request: CommandRequest) -> Response {
        let started = Instant::now();
        let CommandRequest { action, payload } = request;
        log::debug!("Executing action={}", action.as_str());

        let mut response = match self.services.route(action, payload) {
            Ok(outcome) => {
                let mut response = Response::ok(outcome.data);
                response.hints = outcome.hints;
                response.meta = ResponseMeta {
                    schema_version: response.meta.schema_version,
                    ..outcome.meta
                };
                response
            }
            Err(err) => error_response(&err),
        };

        response.meta.config_path = self.config_path.clone();
        response.meta.duration_ms = Some(started.elapsed().as_millis() as u64);
        response
    }
}

/// Machine code and remediation hint for an error chain
pub fn classify_error(err: &anyhow::Error) -> (&'static str, Option<&'static str>) {
    for cause in err.chain() {
        if let Some(input) = cause.downcast_ref::<InputError>() {
            let code = input.code();
            return (code, hint_for(code));
        }
        if let Some(solver) = cause.downcast_ref::<SolverError>() {
            let code = solver.code();
            return (code, hint_for(code));
        }
        if cause.downcast_ref::<InfeasibleAllocation>().is_some() {
            return ("infeasible", hint_for("infeasible"));
        }
        if cause.downcast_ref::<PayloadError>().is_some() {
            return ("invalid_parameter", hint_for("invalid_parameter"));
        }
        if cause.downcast_ref::<io::Error>().is_some()
            || cause.downcast_ref::<csv::Error>().is_some()
        {
            return ("io", hint_for("io"));
        }
    }
    ("internal", None)
}

fn hint_for(code: &str) -> Option<&'static str> {
    match code {
        "invalid_input" => Some(
            "The CSV needs 'people_served' and 'incentive' columns with a non-negative number in every row",
        ),
        "invalid_parameter" => Some(
            "Use total_funding > 0 and non-negative base_funding, unincorporated_funding and cap",
        ),
        "empty_input" => Some("Add at least one center row below the CSV header"),
        "infeasible" => Some(
            "Lower total_funding, raise the caps or solver.rate_max, or drop --strict to keep the saturated result",
        ),
        "invalid_config" => Some(
            "Fix the settings file (sections [solver] and [report]) or unset FUNDING_ALLOCATOR_CONFIG",
        ),
        "io" => Some("Check that the input exists and the output location is writable"),
        _ => None,
    }
}

pub fn error_response(err: &anyhow::Error) -> Response {
    let (code, hint) = classify_error(err);
    response_with_code(code, hint, err)
}

/// Error response for settings that failed to load before any action ran
pub fn config_error_response(err: &anyhow::Error) -> Response {
    response_with_code("invalid_config", hint_for("invalid_config"), err)
}

fn response_with_code(code: &str, hint: Option<&str>, err: &anyhow::Error) -> Response {
    let message = format!("{err:#}");
    log::error!("{message}");
    Response::error(ErrorEnvelope {
        code: code.to_string(),
        message,
        details: None,
        hint: hint.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handler() -> CommandHandler {
        CommandHandler::new(LoadedSettings::default())
    }

    fn request(value: serde_json::Value) -> CommandRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn capabilities_lists_actions_and_defaults() {
        let response = handler().execute(request(json!({"action": "capabilities"})));

        assert!(!response.is_error());
        assert_eq!(response.data["server"]["name"], "funding-allocator");
        assert_eq!(
            response.data["actions"],
            json!(["allocate", "validate", "capabilities"])
        );
        assert_eq!(
            response.data["defaults"]["rate_max"],
            Settings::default().solver.rate_max
        );
        assert!(response.meta.duration_ms.is_some());
    }

    #[test]
    fn missing_file_is_io_error() {
        let response = handler().execute(request(json!({
            "action": "validate",
            "payload": {"input": "/definitely/not/here.csv"}
        })));

        let error = response.error.unwrap();
        assert_eq!(error.code, "io");
        assert!(error.message.contains("/definitely/not/here.csv"));
    }

    #[test]
    fn bad_parameters_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("centers.csv");
        std::fs::write(&input, "people_served,incentive\n10,0\n").unwrap();

        let response = handler().execute(request(json!({
            "action": "allocate",
            "payload": {"input": input, "total_funding": 0.0}
        })));

        let error = response.error.unwrap();
        assert_eq!(error.code, "invalid_parameter");
        assert!(error.message.contains("Ensure Total Funding > 0"));
        assert!(error.hint.is_some());
    }

    #[test]
    fn malformed_payload_is_invalid_parameter() {
        let response = handler().execute(request(json!({
            "action": "allocate",
            "payload": {"input": "x.csv", "total": 5}
        })));
        assert_eq!(response.error.unwrap().code, "invalid_parameter");
    }

    #[test]
    fn missing_columns_are_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("centers.csv");
        std::fs::write(&input, "program_name,people_served\nA,10\n").unwrap();

        let response = handler().execute(request(json!({
            "action": "validate",
            "payload": {"input": input}
        })));
        assert_eq!(response.error.unwrap().code, "invalid_input");
    }

    #[test]
    fn unclassified_errors_are_internal() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(classify_error(&err), ("internal", None));
        assert_eq!(config_error_response(&err).error.unwrap().code, "invalid_config");
    }
}
