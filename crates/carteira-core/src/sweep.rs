use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::MarketData;
use crate::error::CarteiraError;
use crate::model::{ModelInstance, ModelParams};
use crate::report::decimal_from_f64;
use crate::solver::{solve_model, MiqpSolver, SolverOptions};
use crate::types::Rate;
use crate::CarteiraResult;

/// Status label for a row whose solve produced a usable solution.
pub const STATUS_SOLVED: &str = "Solucionado";
/// Status label for a row whose solve raised an error.
pub const STATUS_ERROR: &str = "Erro";

/// The sweep grid: a full cross product of max-weight levels (outer)
/// and return targets (inner), at one fixed cardinality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub cardinality: u32,
    pub max_weights: Vec<Rate>,
    pub target_returns: Vec<Rate>,
    pub risk_free_rate: Rate,
    pub options: SolverOptions,
}

impl SweepConfig {
    pub fn total_runs(&self) -> usize {
        self.max_weights.len() * self.target_returns.len()
    }
}

/// One sweep iteration's outcome. Metrics are present only when the
/// status is `Solucionado`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    pub max_weight: Rate,
    pub target_return: Rate,
    pub cardinality: u32,
    pub status: String,
    pub risk: Option<Decimal>,
    pub realized_return: Option<Rate>,
    pub sharpe: Option<Decimal>,
}

/// All rows of a finished sweep plus the non-fatal issues met on the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub rows: Vec<SweepRow>,
    pub warnings: Vec<String>,
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: Rate, end: Rate, points: usize) -> CarteiraResult<Vec<Rate>> {
    match points {
        0 => Err(CarteiraError::InvalidInput {
            field: "points".into(),
            reason: "at least one point required".into(),
        }),
        1 => Ok(vec![start]),
        _ => {
            let step = (end - start) / Decimal::from(points as u64 - 1);
            let mut values: Vec<Rate> = (0..points)
                .map(|i| start + step * Decimal::from(i as u64))
                .collect();
            // Division truncation must not move the endpoint.
            if let Some(last) = values.last_mut() {
                *last = end;
            }
            Ok(values)
        }
    }
}

/// Run the full sweep sequentially, one blocking solve per grid point.
///
/// The model is instantiated fresh for every iteration. A failed solve
/// is isolated: the row records `Erro` and the sweep continues. One row
/// is accumulated per iteration regardless of outcome; `on_row` fires
/// after each (for progress display).
pub fn run_sweep<F>(
    data: &MarketData,
    backend: &dyn MiqpSolver,
    config: &SweepConfig,
    mut on_row: F,
) -> CarteiraResult<SweepOutcome>
where
    F: FnMut(usize, usize, &SweepRow),
{
    let mut rows = Vec::with_capacity(config.total_runs());
    let mut warnings = Vec::new();
    let total = config.total_runs();
    let mut run_count = 0usize;

    for max_weight in &config.max_weights {
        for target_return in &config.target_returns {
            run_count += 1;
            let params = ModelParams {
                cardinality: config.cardinality,
                max_weight: *max_weight,
                target_return: *target_return,
            };
            let row = run_iteration(data, backend, config, &params, &mut warnings);
            on_row(run_count, total, &row);
            rows.push(row);
        }
    }

    Ok(SweepOutcome { rows, warnings })
}

fn run_iteration(
    data: &MarketData,
    backend: &dyn MiqpSolver,
    config: &SweepConfig,
    params: &ModelParams,
    warnings: &mut Vec<String>,
) -> SweepRow {
    let blank = |status: String| SweepRow {
        max_weight: params.max_weight,
        target_return: params.target_return,
        cardinality: params.cardinality,
        status,
        risk: None,
        realized_return: None,
        sharpe: None,
    };

    let solved = ModelInstance::build(data, params)
        .and_then(|model| solve_model(backend, &model, &config.options).map(|run| (model, run)));

    let (model, run) = match solved {
        Ok(pair) => pair,
        Err(e) => {
            warnings.push(format!(
                "W_max={} R_target={}: {}",
                params.max_weight, params.target_return, e
            ));
            return blank(STATUS_ERROR.to_string());
        }
    };

    if !run.solution.status.is_usable() {
        return blank(run.solution.status.as_str().to_string());
    }

    match solved_metrics(&model, &run.solution.weights, run.solution.objective, config) {
        Ok((risk, realized_return, sharpe)) => SweepRow {
            max_weight: params.max_weight,
            target_return: params.target_return,
            cardinality: params.cardinality,
            status: STATUS_SOLVED.to_string(),
            risk: Some(risk),
            realized_return: Some(realized_return),
            sharpe: Some(sharpe),
        },
        Err(e) => {
            warnings.push(format!(
                "W_max={} R_target={}: {}",
                params.max_weight, params.target_return, e
            ));
            blank(STATUS_ERROR.to_string())
        }
    }
}

/// Risk, realized return and Sharpe ratio for a usable solution, all as
/// Decimal so that sharpe == (return - risk_free) / risk holds exactly
/// over the recorded values.
fn solved_metrics(
    model: &ModelInstance,
    weights: &[f64],
    objective: f64,
    config: &SweepConfig,
) -> CarteiraResult<(Decimal, Rate, Decimal)> {
    let risk = decimal_from_f64(objective.sqrt(), "risk")?;
    let realized: f64 = model.mu.iter().zip(weights).map(|(m, w)| m * w).sum();
    let realized_return = decimal_from_f64(realized, "realized return")?;

    // A zero-risk solve would divide by zero below. Rather than record a
    // bogus ratio, surface it as an explicit error for this row.
    if risk.is_zero() {
        return Err(CarteiraError::DivisionByZero {
            context: "sharpe ratio of a zero-risk portfolio".into(),
        });
    }
    let sharpe = (realized_return - config.risk_free_rate) / risk;
    Ok((risk, realized_return, sharpe))
}

/// For each distinct max-weight level with at least one `Solucionado`
/// row, the row with the highest Sharpe ratio. Ties keep the first
/// occurrence. Levels preserve their order of first appearance.
pub fn best_by_max_weight(rows: &[SweepRow]) -> Vec<SweepRow> {
    let mut best: Vec<SweepRow> = Vec::new();
    for row in rows {
        if row.status != STATUS_SOLVED {
            continue;
        }
        let sharpe = match row.sharpe {
            Some(s) => s,
            None => continue,
        };
        match best.iter_mut().find(|b| b.max_weight == row.max_weight) {
            Some(incumbent) => {
                let incumbent_sharpe = incumbent.sharpe.unwrap_or(Decimal::MIN);
                if sharpe > incumbent_sharpe {
                    *incumbent = row.clone();
                }
            }
            None => best.push(row.clone()),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CovarianceMatrix, ExpectedReturns, SectorEntry, SectorMap};
    use crate::solver::{MiqpSolver, Solution, SolveStatus};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    /// Backend scripted with a fixed sequence of per-call outcomes.
    struct ScriptedSolver {
        script: RefCell<Vec<CarteiraResult<(SolveStatus, f64)>>>,
        cardinalities_seen: RefCell<Vec<u32>>,
    }

    impl ScriptedSolver {
        fn new(script: Vec<CarteiraResult<(SolveStatus, f64)>>) -> Self {
            let mut script = script;
            script.reverse();
            ScriptedSolver {
                script: RefCell::new(script),
                cardinalities_seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl MiqpSolver for ScriptedSolver {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(
            &self,
            model: &ModelInstance,
            _options: &SolverOptions,
        ) -> CarteiraResult<Solution> {
            self.cardinalities_seen.borrow_mut().push(model.cardinality);
            let (status, objective) = self
                .script
                .borrow_mut()
                .pop()
                .expect("scripted solver exhausted")?;
            let n = model.num_assets();
            let weights = vec![1.0 / n as f64; n];
            Ok(Solution {
                status,
                weights,
                selected: vec![true; n],
                sectors_on: vec![true; model.num_sectors()],
                objective,
            })
        }
    }

    fn sample_data() -> MarketData {
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        MarketData {
            returns: ExpectedReturns::new(vec![
                ("AAA".into(), dec!(0.15)),
                ("BBB".into(), dec!(0.25)),
            ]),
            covariance: CovarianceMatrix {
                tickers,
                rows: vec![vec![dec!(0.04), dec!(0.01)], vec![dec!(0.01), dec!(0.09)]],
            },
            sectors: SectorMap {
                entries: vec![
                    SectorEntry {
                        ticker: "AAA".into(),
                        sector: "Financials".into(),
                    },
                    SectorEntry {
                        ticker: "BBB".into(),
                        sector: "Utilities".into(),
                    },
                ],
            },
        }
    }

    fn config(levels: usize, targets: usize) -> SweepConfig {
        SweepConfig {
            cardinality: 2,
            max_weights: linspace(dec!(0.10), dec!(0.20), levels).unwrap(),
            target_returns: linspace(dec!(0.12), dec!(0.30), targets).unwrap(),
            risk_free_rate: dec!(0.105),
            options: SolverOptions::default(),
        }
    }

    #[test]
    fn linspace_endpoints_and_count() {
        let values = linspace(dec!(0.12), dec!(0.30), 20).unwrap();
        assert_eq!(values.len(), 20);
        assert_eq!(values[0], dec!(0.12));
        assert_eq!(*values.last().unwrap(), dec!(0.30));
    }

    #[test]
    fn linspace_single_point() {
        assert_eq!(linspace(dec!(0.5), dec!(0.9), 1).unwrap(), vec![dec!(0.5)]);
    }

    #[test]
    fn sweep_covers_full_cross_product_with_fixed_cardinality() {
        let solver = ScriptedSolver::new(
            (0..6).map(|_| Ok((SolveStatus::Solved, 0.04))).collect(),
        );
        let outcome = run_sweep(&sample_data(), &solver, &config(2, 3), |_, _, _| {}).unwrap();
        assert_eq!(outcome.rows.len(), 6);
        assert!(outcome.rows.iter().all(|r| r.cardinality == 2));
        assert_eq!(solver.cardinalities_seen.borrow().len(), 6);
        assert!(solver.cardinalities_seen.borrow().iter().all(|&m| m == 2));
        // Outer loop is max weight, inner loop is target return.
        assert_eq!(outcome.rows[0].max_weight, outcome.rows[1].max_weight);
        assert!(outcome.rows[0].target_return < outcome.rows[1].target_return);
    }

    #[test]
    fn sharpe_identity_holds_for_every_solved_row() {
        let solver = ScriptedSolver::new(
            (0..4).map(|_| Ok((SolveStatus::Solved, 0.0625))).collect(),
        );
        let cfg = config(2, 2);
        let outcome = run_sweep(&sample_data(), &solver, &cfg, |_, _, _| {}).unwrap();
        for row in &outcome.rows {
            assert_eq!(row.status, STATUS_SOLVED);
            let sharpe = row.sharpe.unwrap();
            let expected =
                (row.realized_return.unwrap() - cfg.risk_free_rate) / row.risk.unwrap();
            assert_eq!(sharpe, expected);
        }
    }

    #[test]
    fn time_limit_counts_as_solved() {
        let solver = ScriptedSolver::new(vec![Ok((SolveStatus::TimeLimit, 0.04))]);
        let outcome = run_sweep(&sample_data(), &solver, &config(1, 1), |_, _, _| {}).unwrap();
        assert_eq!(outcome.rows[0].status, STATUS_SOLVED);
        assert!(outcome.rows[0].sharpe.is_some());
    }

    #[test]
    fn infeasible_rows_record_solver_status_and_null_metrics() {
        let solver = ScriptedSolver::new(vec![
            Ok((SolveStatus::Infeasible, 0.0)),
            Ok((SolveStatus::Solved, 0.04)),
        ]);
        let outcome = run_sweep(&sample_data(), &solver, &config(1, 2), |_, _, _| {}).unwrap();
        assert_eq!(outcome.rows[0].status, "infeasible");
        assert!(outcome.rows[0].risk.is_none());
        assert!(outcome.rows[0].sharpe.is_none());
        assert_eq!(outcome.rows[1].status, STATUS_SOLVED);
    }

    #[test]
    fn backend_errors_are_isolated_per_iteration() {
        let solver = ScriptedSolver::new(vec![
            Err(CarteiraError::SolverFailure("license expired".into())),
            Ok((SolveStatus::Solved, 0.04)),
        ]);
        let outcome = run_sweep(&sample_data(), &solver, &config(1, 2), |_, _, _| {}).unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].status, STATUS_ERROR);
        assert_eq!(outcome.rows[1].status, STATUS_SOLVED);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("license expired"));
    }

    #[test]
    fn zero_risk_solve_is_an_explicit_error_row() {
        let solver = ScriptedSolver::new(vec![Ok((SolveStatus::Solved, 0.0))]);
        let outcome = run_sweep(&sample_data(), &solver, &config(1, 1), |_, _, _| {}).unwrap();
        assert_eq!(outcome.rows[0].status, STATUS_ERROR);
        assert!(outcome.rows[0].sharpe.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn best_by_max_weight_takes_max_sharpe_per_level() {
        let solver = ScriptedSolver::new(vec![
            Ok((SolveStatus::Solved, 0.09)),
            Ok((SolveStatus::Solved, 0.0225)),
            Ok((SolveStatus::Infeasible, 0.0)),
            Ok((SolveStatus::Solved, 0.04)),
        ]);
        let outcome = run_sweep(&sample_data(), &solver, &config(2, 2), |_, _, _| {}).unwrap();
        let best = best_by_max_weight(&outcome.rows);
        assert_eq!(best.len(), 2);
        // Level one: lower objective means lower risk and higher Sharpe.
        assert_eq!(best[0].risk, outcome.rows[1].risk);
        // Level two: the only solved row wins.
        assert_eq!(best[1].risk, outcome.rows[3].risk);
    }

    #[test]
    fn best_by_max_weight_ties_keep_first_occurrence() {
        let rows = vec![
            SweepRow {
                max_weight: dec!(0.10),
                target_return: dec!(0.12),
                cardinality: 15,
                status: STATUS_SOLVED.into(),
                risk: Some(dec!(0.2)),
                realized_return: Some(dec!(0.18)),
                sharpe: Some(dec!(1.5)),
            },
            SweepRow {
                max_weight: dec!(0.10),
                target_return: dec!(0.15),
                cardinality: 15,
                status: STATUS_SOLVED.into(),
                risk: Some(dec!(0.3)),
                realized_return: Some(dec!(0.20)),
                sharpe: Some(dec!(1.5)),
            },
        ];
        let best = best_by_max_weight(&rows);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].target_return, dec!(0.12));
    }

    #[test]
    fn all_failures_leave_no_solved_rows_and_empty_best() {
        let solver = ScriptedSolver::new(
            (0..4).map(|_| Ok((SolveStatus::Infeasible, 0.0))).collect(),
        );
        let outcome = run_sweep(&sample_data(), &solver, &config(2, 2), |_, _, _| {}).unwrap();
        assert!(outcome.rows.iter().all(|r| r.status != STATUS_SOLVED));
        assert!(best_by_max_weight(&outcome.rows).is_empty());
    }
}
