use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::formula::{affine_slope, aggregate_funding, breakpoint, center_funding, is_capped};
use crate::types::{
    AllocatedRow, Allocation, FundingParams, Recipient, SaturationReason, SolveStatus,
};

/// Main solver interface: finds the per-person rate whose capped aggregate
/// matches the target funding
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
}

/// Outcome of a bracketed root search
#[derive(Debug, Clone, Copy)]
struct Search {
    rate: f64,
    iterations: u32,
}

impl Solver {
    /// Create a solver, rejecting invalid configuration
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate().map_err(SolverError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve for the rate minimizing `|total_funding - F(rate)|` on `[0, rate_max]`
    pub fn solve(&self, recipients: &[Recipient], params: &FundingParams) -> Result<Allocation> {
        if recipients.is_empty() {
            return Err(SolverError::EmptyRecipients);
        }
        params.validate()?;
        for (index, recipient) in recipients.iter().enumerate() {
            recipient.validate(index)?;
        }

        let target = params.total_funding;
        let rate_max = self.config.rate_max;
        let floor = aggregate_funding(recipients, params, 0.0);
        let ceiling = aggregate_funding(recipients, params, rate_max);
        log::debug!(
            "Solving {} centers: target={target:.2} floor={floor:.2} ceiling={ceiling:.2}",
            recipients.len()
        );

        let (rate, status, iterations, saturation_rate) = if target >= ceiling {
            let plateau = recipients.iter().all(|recipient| {
                recipient.people_served == 0.0 || is_capped(recipient, params, rate_max)
            });
            let reason = if plateau {
                SaturationReason::CapsExhausted
            } else {
                SaturationReason::RateCeiling
            };
            let search = self.saturation_point(recipients, params, floor, ceiling);
            log::warn!(
                "Target {target:.2} unreachable (max {ceiling:.2}); rate saturated at {rate_max} ({reason:?})"
            );
            (
                rate_max,
                SolveStatus::Saturated { reason },
                search.iterations,
                Some(search.rate),
            )
        } else if target <= floor {
            let status = if floor - target > self.config.funding_tolerance {
                log::warn!(
                    "Floor funding {floor:.2} already exceeds target {target:.2} at rate 0"
                );
                SolveStatus::FloorExceedsTarget
            } else {
                SolveStatus::Converged
            };
            (0.0, status, 0, None)
        } else {
            let search = self.search(recipients, params, target, 0.0, rate_max);
            (search.rate, SolveStatus::Converged, search.iterations, None)
        };

        let allocation =
            self.allocate(recipients, params, rate, status, iterations, saturation_rate);
        log::debug!(
            "Solved rate={:.6} status={} disbursed={:.2} gap={:.4} iterations={}",
            allocation.rate,
            allocation.status.as_str(),
            allocation.disbursed,
            allocation.gap,
            allocation.iterations
        );
        Ok(allocation)
    }

    /// Smallest rate at which `F` reaches `F(rate_max)`
    fn saturation_point(
        &self,
        recipients: &[Recipient],
        params: &FundingParams,
        floor: f64,
        ceiling: f64,
    ) -> Search {
        if floor >= ceiling {
            return Search {
                rate: 0.0,
                iterations: 0,
            };
        }
        self.search(recipients, params, ceiling, 0.0, self.config.rate_max)
    }

    /// Bracketed search for the smallest `rate` with `F(rate) >= target`.
    ///
    /// Requires `F(lo) < target <= F(hi)`. Once no breakpoint lies inside the
    /// bracket, `F` is affine there and the root is computed directly.
    fn search(
        &self,
        recipients: &[Recipient],
        params: &FundingParams,
        target: f64,
        mut lo: f64,
        mut hi: f64,
    ) -> Search {
        let steps = self.config.bisection_steps();
        let mut iterations = 0;

        loop {
            if let Some(slope) = affine_slope(recipients, params, lo, hi) {
                if slope > 0.0 {
                    let f_lo = aggregate_funding(recipients, params, lo);
                    let rate = (lo + (target - f_lo) / slope).clamp(lo, hi);
                    return Search { rate, iterations };
                }
            }
            if iterations >= steps {
                break;
            }

            let mid = 0.5 * (lo + hi);
            if aggregate_funding(recipients, params, mid) >= target {
                hi = mid;
            } else {
                lo = mid;
            }
            iterations += 1;
        }

        let rate = finish_piecewise(recipients, params, target, lo, hi);
        Search { rate, iterations }
    }

    fn allocate(
        &self,
        recipients: &[Recipient],
        params: &FundingParams,
        rate: f64,
        status: SolveStatus,
        iterations: u32,
        saturation_rate: Option<f64>,
    ) -> Allocation {
        let rows: Vec<AllocatedRow> = recipients
            .iter()
            .map(|recipient| AllocatedRow {
                effective_cap: params.effective_cap(recipient),
                per_center_funding: center_funding(recipient, params, rate),
                capped: is_capped(recipient, params, rate),
            })
            .collect();
        let disbursed: f64 = rows.iter().map(|row| row.per_center_funding).sum();

        Allocation {
            rate,
            status,
            disbursed,
            gap: (params.total_funding - disbursed).abs(),
            iterations,
            rate_max: self.config.rate_max,
            saturation_rate,
            params: *params,
            rows,
        }
    }
}

/// Exact root on the affine piece of `[lo, hi]` that crosses `target`.
///
/// The bracket is split at every cap breakpoint it contains, so a root
/// sitting on a breakpoint is still solved on a straight segment.
fn finish_piecewise(
    recipients: &[Recipient],
    params: &FundingParams,
    target: f64,
    lo: f64,
    hi: f64,
) -> f64 {
    let mut knots: Vec<f64> = recipients
        .iter()
        .filter_map(|recipient| breakpoint(recipient, params))
        .filter(|rate| *rate > lo && *rate < hi)
        .collect();
    knots.sort_by(f64::total_cmp);
    knots.push(hi);

    let mut start = lo;
    let mut f_start = aggregate_funding(recipients, params, start);
    for end in knots {
        if end <= start {
            continue;
        }
        let f_end = aggregate_funding(recipients, params, end);
        if f_end >= target {
            let slope = (f_end - f_start) / (end - start);
            if slope > 0.0 {
                return (start + (target - f_start) / slope).clamp(start, end);
            }
            return end;
        }
        start = end;
        f_start = f_end;
    }
    hi
}

/// Solve with the default configuration
pub fn solve(recipients: &[Recipient], params: &FundingParams) -> Result<Allocation> {
    Solver::default().solve(recipients, params)
}
