use serde::{Deserialize, Serialize};

/// Default upper bound of the rate search (currency per person)
pub const DEFAULT_RATE_MAX: f64 = 4000.0;

/// Configuration for the rate search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Largest per-person rate considered (currency per person)
    pub rate_max: f64,

    /// Width of the final bisection bracket (currency per person)
    pub rate_tolerance: f64,

    /// Funding gap (currency) still treated as an exact match
    pub funding_tolerance: f64,

    /// Hard bound on bisection steps
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rate_max: DEFAULT_RATE_MAX,
            rate_tolerance: 1e-6,
            funding_tolerance: 0.01,
            max_iterations: 200,
        }
    }
}

impl SolverConfig {
    /// Config matching the first-generation ceiling of 2000 per person
    pub fn legacy() -> Self {
        Self {
            rate_max: 2000.0,
            ..Default::default()
        }
    }

    /// Builder: set the rate ceiling
    #[must_use]
    pub const fn with_rate_max(mut self, rate_max: f64) -> Self {
        self.rate_max = rate_max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.rate_max.is_finite() || self.rate_max <= 0.0 {
            return Err(format!(
                "rate_max must be finite and > 0 (got {})",
                self.rate_max
            ));
        }

        if !self.rate_tolerance.is_finite() || self.rate_tolerance <= 0.0 {
            return Err(format!(
                "rate_tolerance must be finite and > 0 (got {})",
                self.rate_tolerance
            ));
        }

        if self.rate_tolerance > self.rate_max {
            return Err(format!(
                "rate_tolerance ({}) cannot exceed rate_max ({})",
                self.rate_tolerance, self.rate_max
            ));
        }

        if !self.funding_tolerance.is_finite() || self.funding_tolerance < 0.0 {
            return Err(format!(
                "funding_tolerance must be finite and >= 0 (got {})",
                self.funding_tolerance
            ));
        }

        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }

        let required = self.required_steps();
        if self.max_iterations < required {
            return Err(format!(
                "max_iterations ({}) is below the {required} halvings needed to narrow rate_max ({}) to rate_tolerance ({})",
                self.max_iterations, self.rate_max, self.rate_tolerance
            ));
        }

        Ok(())
    }

    /// Number of halvings needed to shrink `[0, rate_max]` below `rate_tolerance`
    fn required_steps(&self) -> u32 {
        let ratio = (self.rate_max / self.rate_tolerance).max(1.0);
        ratio.log2().ceil() as u32
    }

    pub(crate) fn bisection_steps(&self) -> u32 {
        self.required_steps().min(self.max_iterations)
    }
}
