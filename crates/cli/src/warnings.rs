use crate::input::CenterTable;
use funding_solver::{Allocation, SaturationReason, SolveStatus};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    Saturated,
    FloorExceedsTarget,
    HistoricalDeviation,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
}

/// Relative deviation of `total` from the historical total, if one exists
pub fn historical_deviation(total: f64, historical_total: f64) -> Option<f64> {
    if historical_total > 0.0 {
        Some((total - historical_total).abs() / historical_total)
    } else {
        None
    }
}

pub fn collect_warnings(
    table: &CenterTable,
    allocation: &Allocation,
    deviation_threshold: f64,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    match allocation.status {
        SolveStatus::Saturated { reason } => {
            let detail = match reason {
                SaturationReason::CapsExhausted => format!(
                    "every center with people served is at its cap ({:.2} disbursed of {:.2} requested)",
                    allocation.disbursed, allocation.params.total_funding
                ),
                SaturationReason::RateCeiling => format!(
                    "the rate ceiling stops funding at {:.2} of {:.2} requested; raise solver.rate_max",
                    allocation.disbursed, allocation.params.total_funding
                ),
            };
            warnings.push(Warning {
                code: WarningCode::Saturated,
                message: format!(
                    "Optimization failed: the per-person rate saturated at {}; {detail}",
                    allocation.rate_max
                ),
            });
        }
        SolveStatus::FloorExceedsTarget => warnings.push(Warning {
            code: WarningCode::FloorExceedsTarget,
            message: format!(
                "Base and unincorporated funding alone disburse {:.2}, more than the {:.2} requested; per-person rate is 0",
                allocation.disbursed, allocation.params.total_funding
            ),
        }),
        SolveStatus::Converged => {}
    }

    if let Some(historical) = table.historical_total() {
        let total = allocation.params.total_funding;
        if let Some(deviation) = historical_deviation(total, historical) {
            if deviation > deviation_threshold {
                warnings.push(Warning {
                    code: WarningCode::HistoricalDeviation,
                    message: format!(
                        "Requested total funding {total:.2} differs from historical total {historical:.2} by {:.1}% (threshold {:.1}%)",
                        deviation * 100.0,
                        deviation_threshold * 100.0
                    ),
                });
            }
        }
    }

    for warning in &warnings {
        log::warn!("{}", warning.message);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_centers;
    use funding_solver::{solve, FundingParams};

    fn table(csv: &str) -> CenterTable {
        parse_centers(csv.as_bytes()).unwrap()
    }

    #[test]
    fn deviation_requires_positive_history() {
        assert_eq!(historical_deviation(110.0, 100.0), Some(0.1));
        assert_eq!(historical_deviation(100.0, 0.0), None);
    }

    #[test]
    fn converged_run_close_to_history_has_no_warnings() {
        let table = table("people_served,incentive,past_funding\n100,0,1000\n200,0,2000\n");
        let allocation = solve(&table.recipients, &FundingParams::new(3_200.0)).unwrap();
        assert!(collect_warnings(&table, &allocation, 0.1).is_empty());
    }

    #[test]
    fn large_deviation_from_history_warns() {
        let table = table("people_served,incentive,past_funding\n100,0,1000\n200,0,2000\n");
        let allocation = solve(&table.recipients, &FundingParams::new(4_000.0)).unwrap();
        let warnings = collect_warnings(&table, &allocation, 0.1);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::HistoricalDeviation);
        assert!(warnings[0].message.contains("33.3%"));
    }

    #[test]
    fn saturation_and_floor_warn() {
        let table = table("people_served,incentive\n10,0\n");

        let saturated = solve(
            &table.recipients,
            &FundingParams::new(5_000.0).global_cap(1_000.0),
        )
        .unwrap();
        let warnings = collect_warnings(&table, &saturated, 0.1);
        assert_eq!(warnings[0].code, WarningCode::Saturated);
        assert!(warnings[0].message.contains("at its cap"));

        let floor = solve(&table.recipients, &FundingParams::new(10.0).base_funding(50.0)).unwrap();
        let warnings = collect_warnings(&table, &floor, 0.1);
        assert_eq!(warnings[0].code, WarningCode::FloorExceedsTarget);
    }
}
