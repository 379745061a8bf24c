use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CarteiraError;
use crate::model::ModelInstance;
use crate::solver::SolveRun;
use crate::types::{Money, Rate, Weight};
use crate::CarteiraResult;

/// Weights at or below this threshold are numerical noise from the
/// solver and are suppressed from the allocation.
pub const WEIGHT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// One allocated position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLine {
    pub ticker: String,
    pub weight: Weight,
    /// Capital allocated to this position, rounded to cents.
    pub amount: Money,
}

/// Human-facing summary of a successful solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub lines: Vec<AllocationLine>,
    pub expected_return: Rate,
    /// Square root of the objective (portfolio variance).
    pub volatility: Rate,
    pub capital: Money,
    pub solve_time_secs: f64,
}

/// Outcome of reporting on one solve: a full summary when the solver
/// proved optimality, otherwise just its raw status string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AllocationReport {
    Solved(AllocationSummary),
    Unsolved { status: String },
}

/// Build the allocation report for a finished solve.
///
/// Only a proven-optimal solve gets the full summary; a time-limit
/// incumbent is reported by status here (the sweep is the place that
/// accepts incumbents).
pub fn build_report(
    model: &ModelInstance,
    run: &SolveRun,
    capital: Money,
) -> CarteiraResult<AllocationReport> {
    if run.solution.status != crate::solver::SolveStatus::Solved {
        return Ok(AllocationReport::Unsolved {
            status: run.solution.status.as_str().to_string(),
        });
    }

    let mut lines = Vec::new();
    for (i, ticker) in model.assets.iter().enumerate() {
        let weight = decimal_from_f64(run.solution.weights[i], "weight")?;
        if weight > WEIGHT_EPSILON {
            lines.push(AllocationLine {
                ticker: ticker.clone(),
                weight,
                amount: (capital * weight).round_dp(2),
            });
        }
    }
    lines.sort_by(|a, b| b.weight.cmp(&a.weight));

    let realized: f64 = model
        .mu
        .iter()
        .zip(&run.solution.weights)
        .map(|(m, w)| m * w)
        .sum();
    let volatility = decimal_from_f64(run.solution.objective.sqrt(), "volatility")?;
    let expected_return = decimal_from_f64(realized, "expected return")?;

    Ok(AllocationReport::Solved(AllocationSummary {
        lines,
        expected_return,
        volatility,
        capital,
        solve_time_secs: run.elapsed.as_secs_f64(),
    }))
}

pub(crate) fn decimal_from_f64(value: f64, what: &str) -> CarteiraResult<Decimal> {
    if !value.is_finite() {
        return Err(CarteiraError::InvalidInput {
            field: what.into(),
            reason: format!("solver returned non-finite value {}", value),
        });
    }
    Decimal::from_f64(value).ok_or_else(|| CarteiraError::InvalidInput {
        field: what.into(),
        reason: format!("{} is not representable as Decimal", value),
    })
}
