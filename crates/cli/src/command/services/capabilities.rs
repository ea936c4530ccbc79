use crate::command::domain::{CommandAction, CommandOutcome};
use crate::settings::Settings;
use anyhow::Result;
use funding_protocol::{Capabilities, CapabilitiesServer, DefaultSettings, RESPONSE_SCHEMA_VERSION};
use serde_json::Value;

pub(crate) struct CapabilitiesService {
    settings: Settings,
}

impl CapabilitiesService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self, _payload: Value) -> Result<CommandOutcome> {
        let solver = &self.settings.solver;
        let output = Capabilities {
            schema_version: RESPONSE_SCHEMA_VERSION,
            server: CapabilitiesServer {
                name: "funding-allocator".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            actions: CommandAction::ALL
                .iter()
                .map(|action| action.as_str().to_string())
                .collect(),
            defaults: DefaultSettings {
                rate_max: solver.rate_max,
                rate_tolerance: solver.rate_tolerance,
                funding_tolerance: solver.funding_tolerance,
                deviation_threshold: self.settings.report.deviation_threshold,
            },
        };

        CommandOutcome::from_value(output)
    }
}
