mod allocate;
mod capabilities;
mod validate;

use crate::command::domain::{CommandAction, CommandOutcome};
use crate::settings::Settings;
use anyhow::Result;
use serde_json::Value;

pub struct Services {
    allocate: allocate::AllocateService,
    capabilities: capabilities::CapabilitiesService,
    validate: validate::ValidateService,
}

impl Services {
    pub fn new(settings: Settings) -> Self {
        Self {
            capabilities: capabilities::CapabilitiesService::new(settings.clone()),
            allocate: allocate::AllocateService::new(settings),
            validate: validate::ValidateService,
        }
    }

    pub fn route(&self, action: CommandAction, payload: Value) -> Result<CommandOutcome> {
        match action {
            CommandAction::Allocate => self.allocate.run(payload),
            CommandAction::Validate => self.validate.run(payload),
            CommandAction::Capabilities => self.capabilities.run(payload),
        }
    }
}
