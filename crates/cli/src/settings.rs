use anyhow::{anyhow, Context, Result};
use funding_solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FUNDING_ALLOCATOR_CONFIG";
pub const RATE_MAX_ENV: &str = "FUNDING_RATE_MAX";
pub const OUTPUT_DIR_ENV: &str = "FUNDING_OUTPUT_DIR";
pub const DEFAULT_CONFIG_FILE: &str = "funding.toml";

/// Share of historical funding the new total may deviate by before warning
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    pub deviation_threshold: f64,
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub solver: SolverConfig,
    pub report: ReportSettings,
}

/// Settings plus where they came from
#[derive(Debug, Clone, Default)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub path: Option<PathBuf>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.solver
            .validate()
            .map_err(|err| anyhow!("Invalid [solver] settings: {err}"))?;
        let threshold = self.report.deviation_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            anyhow::bail!(
                "Invalid [report] settings: deviation_threshold must be finite and >= 0 (got {threshold})"
            );
        }
        Ok(())
    }

    /// Parse settings from JSON or TOML bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let utf8 =
                    std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
                let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                    anyhow!(
                        "Settings are not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    )
                })?;
                serde_json::to_value(toml_value)
                    .map_err(|err| anyhow!("Failed to convert TOML settings to JSON: {err}"))?
            }
        };

        serde_json::from_value(value).map_err(|err| anyhow!("Settings parse error: {err}"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = env::var(RATE_MAX_ENV) {
            let rate_max: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{RATE_MAX_ENV} must be a number (got {raw:?})"))?;
            self.solver.rate_max = rate_max;
        }
        if let Ok(dir) = env::var(OUTPUT_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.report.output_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }
}

/// Explicit path, then `FUNDING_ALLOCATOR_CONFIG`, then `./funding.toml` if present
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

pub fn load_settings(explicit: Option<&Path>) -> Result<LoadedSettings> {
    let path = resolve_config_path(explicit);
    let mut settings = match &path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let settings = Settings::parse(&bytes)
                .with_context(|| format!("Invalid settings file {}", path.display()))?;
            log::debug!("Loaded settings from {}", path.display());
            settings
        }
        None => Settings::default(),
    };
    settings.apply_env_overrides()?;
    settings.validate()?;
    Ok(LoadedSettings { settings, path })
}
