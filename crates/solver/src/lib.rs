//! # Funding Solver
//!
//! Finds the single per-person rate that distributes a fixed funding pool
//! across centers under per-center and global caps.
//!
//! ## Model
//!
//! Each center receives
//!
//! ```text
//! min(base + unincorporated * incentive + rate * people_served, effective_cap)
//! ```
//!
//! where `effective_cap` is the tighter of the center's own cap and the global
//! cap (a cap of zero means "no cap"). The aggregate `F(rate)` is continuous,
//! piecewise-linear and non-decreasing, so the rate matching the target is a
//! root of `F(rate) - total_funding` on `[0, rate_max]`.
//!
//! ## Architecture
//!
//! ```text
//! Recipients + FundingParams
//!     │
//!     ├──> Validation (signs, finiteness, non-empty)
//!     │
//!     ├──> Bracket F(0) .. F(rate_max)
//!     │    ├─> target >= F(rate_max) → Saturated at rate_max
//!     │    └─> target <= F(0)        → rate 0 (FloorExceedsTarget if overshooting)
//!     │
//!     ├──> Bisection until no cap breakpoint lies in the bracket,
//!     │    then an exact step on the affine piece
//!     │
//!     └──> Allocation (rate, status, rows in input order)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use funding_solver::{FundingParams, Recipient, Solver, SolverConfig};
//!
//! let centers = vec![
//!     Recipient::new(100.0, 0.0),
//!     Recipient::new(200.0, 0.0),
//!     Recipient::new(50.0, 0.0),
//! ];
//! let params = FundingParams::new(3500.0);
//!
//! let solver = Solver::new(SolverConfig::default()).unwrap();
//! let allocation = solver.solve(&centers, &params).unwrap();
//!
//! assert_eq!(allocation.rate, 10.0);
//! assert!(allocation.is_feasible());
//! for funding in allocation.funding() {
//!     println!("{funding:.2}");
//! }
//! ```

mod config;
mod error;
mod formula;
mod solver;
mod types;

pub use config::{SolverConfig, DEFAULT_RATE_MAX};
pub use error::{Result, SolverError};
pub use formula::{aggregate_funding, center_funding};
pub use solver::{solve, Solver};
pub use types::{
    AllocatedRow, Allocation, FundingCap, FundingParams, Recipient, SaturationReason,
    SolveStatus,
};
