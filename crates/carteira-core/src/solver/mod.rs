#[cfg(feature = "mosek")]
pub mod mosek;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::model::ModelInstance;
use crate::CarteiraResult;

/// Options forwarded to the external solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Relative MIP gap at which the solver may stop.
    pub mip_gap: f64,
    /// Wall-clock limit per solve, in seconds.
    pub time_limit_secs: f64,
    /// Whether the solver may write its own log to the console.
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            mip_gap: 0.01,
            time_limit_secs: 60.0,
            verbose: false,
        }
    }
}

/// Solver-reported outcome of one solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal within the gap tolerance.
    Solved,
    /// Stopped at the time limit with a feasible incumbent.
    TimeLimit,
    Infeasible,
    Unbounded,
    /// Anything the backend could not classify, verbatim.
    Unknown(String),
}

impl SolveStatus {
    /// The textual status string, matching the solver convention the
    /// sweep and reports key on.
    pub fn as_str(&self) -> &str {
        match self {
            SolveStatus::Solved => "solved",
            SolveStatus::TimeLimit => "limit",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Unknown(s) => s.as_str(),
        }
    }

    /// A usable solution exists: proven optimal, or a time-limit hit
    /// with an incumbent.
    pub fn is_usable(&self) -> bool {
        matches!(self, SolveStatus::Solved | SolveStatus::TimeLimit)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable values and objective reported by the solver. Vectors are
/// aligned with the model instance's asset and sector universes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolveStatus,
    pub weights: Vec<f64>,
    pub selected: Vec<bool>,
    pub sectors_on: Vec<bool>,
    /// Objective value: portfolio variance w' Sigma w.
    pub objective: f64,
}

/// The external solver boundary. Implementations marshal the declarative
/// model into their native structures and run exactly one solve.
pub trait MiqpSolver {
    fn name(&self) -> &str;

    fn solve(&self, model: &ModelInstance, options: &SolverOptions) -> CarteiraResult<Solution>;
}

/// One solve together with its measured wall-clock duration.
#[derive(Debug, Clone)]
pub struct SolveRun {
    pub solution: Solution,
    pub elapsed: Duration,
}

/// Trigger a single solve and measure it. Exactly one attempt: an
/// infeasible or timed-out model is a normal outcome carried in the
/// status, and a backend error propagates to the caller, which decides
/// whether it is fatal.
pub fn solve_model(
    backend: &dyn MiqpSolver,
    model: &ModelInstance,
    options: &SolverOptions,
) -> CarteiraResult<SolveRun> {
    let start = Instant::now();
    let solution = backend.solve(model, options)?;
    Ok(SolveRun {
        solution,
        elapsed: start.elapsed(),
    })
}

/// Locate a solver backend. With the `mosek` feature this performs the
/// two-location license discovery; without any backend feature compiled
/// in, reports the environment as unavailable.
pub fn default_backend() -> CarteiraResult<Box<dyn MiqpSolver>> {
    #[cfg(feature = "mosek")]
    {
        Ok(Box::new(mosek::MosekSolver::locate()?))
    }
    #[cfg(not(feature = "mosek"))]
    {
        Err(crate::error::CarteiraError::SolverUnavailable(
            "no backend compiled in; rebuild with `--features mosek`".into(),
        ))
    }
}
