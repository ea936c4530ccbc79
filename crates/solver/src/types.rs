use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};

/// Ceiling on a single center's funding.
///
/// A raw cap of `0` means "no cap" in this domain; that rule lives in
/// [`FundingCap::from_raw`] and nowhere else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum FundingCap {
    /// No ceiling
    #[default]
    Unbounded,

    /// Funding may not exceed this amount
    Limit(f64),
}

impl FundingCap {
    /// Interpret a raw numeric cap, where zero means unbounded
    #[must_use]
    pub fn from_raw(raw: f64) -> Self {
        if raw == 0.0 {
            Self::Unbounded
        } else {
            Self::Limit(raw)
        }
    }

    /// Interpret an optional raw cap, where absent or zero means unbounded
    #[must_use]
    pub fn from_optional(raw: Option<f64>) -> Self {
        raw.map_or(Self::Unbounded, Self::from_raw)
    }

    /// The numeric ceiling, if any
    #[must_use]
    pub const fn limit(self) -> Option<f64> {
        match self {
            Self::Unbounded => None,
            Self::Limit(value) => Some(value),
        }
    }

    /// The tighter of two caps
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unbounded, cap) | (cap, Self::Unbounded) => cap,
            (Self::Limit(a), Self::Limit(b)) => Self::Limit(a.min(b)),
        }
    }

    /// Apply the cap to an amount
    #[must_use]
    pub fn clamp(self, amount: f64) -> f64 {
        match self {
            Self::Unbounded => amount,
            Self::Limit(limit) => amount.min(limit),
        }
    }

    /// Whether `amount` has reached the ceiling
    #[must_use]
    pub fn binds(self, amount: f64) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Limit(limit) => amount >= limit,
        }
    }

    fn validate(self, field: &'static str, index: Option<usize>) -> Result<()> {
        let Self::Limit(value) = self else {
            return Ok(());
        };
        if value.is_finite() && value > 0.0 {
            return Ok(());
        }
        Err(match index {
            Some(index) => SolverError::InvalidRecipient {
                index,
                field,
                value,
            },
            None => SolverError::InvalidParameter {
                name: field,
                value,
                reason: "must be finite and positive",
            },
        })
    }
}

impl From<Option<f64>> for FundingCap {
    fn from(raw: Option<f64>) -> Self {
        Self::from_optional(raw)
    }
}

impl From<FundingCap> for Option<f64> {
    fn from(cap: FundingCap) -> Self {
        cap.limit()
    }
}

/// One funded center as seen by the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Count (or weight) driving the per-person component
    pub people_served: f64,

    /// Weight driving the unincorporated-center bonus
    pub incentive: f64,

    /// Individual ceiling for this center
    #[serde(default)]
    pub per_center_cap: FundingCap,
}

impl Recipient {
    /// Create an uncapped recipient
    #[must_use]
    pub const fn new(people_served: f64, incentive: f64) -> Self {
        Self {
            people_served,
            incentive,
            per_center_cap: FundingCap::Unbounded,
        }
    }

    /// Builder: set the individual cap
    #[must_use]
    pub const fn with_cap(mut self, cap: FundingCap) -> Self {
        self.per_center_cap = cap;
        self
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        for (field, value) in [
            ("people_served", self.people_served),
            ("incentive", self.incentive),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SolverError::InvalidRecipient {
                    index,
                    field,
                    value,
                });
            }
        }
        self.per_center_cap.validate("per_center_cap", Some(index))
    }
}

/// Scalars supplied once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingParams {
    /// Target sum to distribute
    pub total_funding: f64,

    /// Flat amount added to every center
    #[serde(default)]
    pub base_funding: f64,

    /// Coefficient multiplying each center's incentive
    #[serde(default)]
    pub unincorporated_funding: f64,

    /// Ceiling applied to every center
    #[serde(default)]
    pub global_cap: FundingCap,
}

impl FundingParams {
    /// Parameters with only a target; no base, no bonus, no global cap
    #[must_use]
    pub const fn new(total_funding: f64) -> Self {
        Self {
            total_funding,
            base_funding: 0.0,
            unincorporated_funding: 0.0,
            global_cap: FundingCap::Unbounded,
        }
    }

    #[must_use]
    pub const fn base_funding(mut self, amount: f64) -> Self {
        self.base_funding = amount;
        self
    }

    #[must_use]
    pub const fn unincorporated_funding(mut self, amount: f64) -> Self {
        self.unincorporated_funding = amount;
        self
    }

    /// Builder: set the global cap from a raw value (zero means none)
    #[must_use]
    pub fn global_cap(mut self, raw: f64) -> Self {
        self.global_cap = FundingCap::from_raw(raw);
        self
    }

    /// Check sign and finiteness of every parameter
    pub fn validate(&self) -> Result<()> {
        if !self.total_funding.is_finite() || self.total_funding <= 0.0 {
            return Err(SolverError::InvalidParameter {
                name: "total_funding",
                value: self.total_funding,
                reason: "must be finite and > 0",
            });
        }
        for (name, value) in [
            ("base_funding", self.base_funding),
            ("unincorporated_funding", self.unincorporated_funding),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SolverError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite and >= 0",
                });
            }
        }
        self.global_cap.validate("global_cap", None)
    }

    /// Binding ceiling for a recipient: the smaller of its own cap and the global cap
    #[must_use]
    pub fn effective_cap(&self, recipient: &Recipient) -> FundingCap {
        recipient.per_center_cap.min(self.global_cap)
    }

    /// Funding a recipient receives before the per-person component
    #[must_use]
    pub fn floor_for(&self, recipient: &Recipient) -> f64 {
        self.base_funding + self.unincorporated_funding * recipient.incentive
    }
}

/// Reason the rate ran into its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationReason {
    /// Raising the rate adds nothing: every center with people served is at
    /// its cap, so the target exceeds what the caps can absorb
    CapsExhausted,

    /// The rate ceiling stops the aggregate short of the target
    RateCeiling,
}

/// Outcome classification of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolveStatus {
    /// The aggregate crosses the target inside `[0, rate_max]`
    Converged,

    /// Target unreachable; rate pinned at `rate_max`
    Saturated { reason: SaturationReason },

    /// Base and incentive funding alone already exceed the target
    FloorExceedsTarget,
}

impl SolveStatus {
    #[must_use]
    pub const fn is_feasible(self) -> bool {
        matches!(self, Self::Converged)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Saturated { .. } => "saturated",
            Self::FloorExceedsTarget => "floor_exceeds_target",
        }
    }
}

/// Solver output for one center, in input order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatedRow {
    pub effective_cap: FundingCap,
    pub per_center_funding: f64,

    /// Whether the effective cap binds at the chosen rate
    pub capped: bool,
}

/// Full result of a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Chosen per-person rate
    pub rate: f64,

    pub status: SolveStatus,

    /// Aggregate funding at `rate`
    pub disbursed: f64,

    /// `|total_funding - disbursed|`
    pub gap: f64,

    /// Bisection steps taken
    pub iterations: u32,

    /// Upper bound of the search
    pub rate_max: f64,

    /// Smallest rate at which the aggregate already equals its value at `rate_max`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation_rate: Option<f64>,

    /// Parameters the allocation was computed with
    pub params: FundingParams,

    pub rows: Vec<AllocatedRow>,
}

impl Allocation {
    #[must_use]
    pub const fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }

    /// Per-center funding in input order
    pub fn funding(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.per_center_funding)
    }

    /// Sum of effective caps, or `None` when any center is unbounded
    #[must_use]
    pub fn total_cap(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|row| row.effective_cap.limit())
            .sum::<Option<f64>>()
    }

    #[must_use]
    pub fn capped_count(&self) -> usize {
        self.rows.iter().filter(|row| row.capped).count()
    }
}
