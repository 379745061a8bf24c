//! MOSEK backend. Marshals the declarative model into a MOSEK task and
//! runs its mixed-integer conic/QP optimizer. Requires a local MOSEK
//! installation with a valid license; gate behind the `mosek` feature.

use std::path::PathBuf;

use mosek::{Boundkey, Dparam, Iparam, Objsense, Solsta, Soltype, Task, Variabletype};

use crate::error::CarteiraError;
use crate::model::{Cmp, ModelInstance};
use crate::solver::{MiqpSolver, Solution, SolveStatus, SolverOptions};
use crate::CarteiraResult;

const BINARY_THRESHOLD: f64 = 0.5;

pub struct MosekSolver {
    license_path: PathBuf,
}

impl MosekSolver {
    /// Locate the MOSEK license: the `MOSEKLM_LICENSE_FILE` environment
    /// variable first, then the conventional `~/mosek/mosek.lic`.
    pub fn locate() -> CarteiraResult<Self> {
        if let Ok(path) = std::env::var("MOSEKLM_LICENSE_FILE") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(MosekSolver { license_path: path });
            }
        }
        if let Ok(home) = std::env::var("HOME") {
            let fallback = PathBuf::from(home).join("mosek").join("mosek.lic");
            if fallback.exists() {
                return Ok(MosekSolver {
                    license_path: fallback,
                });
            }
        }
        Err(CarteiraError::SolverUnavailable(
            "MOSEK license not found via MOSEKLM_LICENSE_FILE or ~/mosek/mosek.lic".into(),
        ))
    }

    pub fn license_path(&self) -> &PathBuf {
        &self.license_path
    }
}

impl MiqpSolver for MosekSolver {
    fn name(&self) -> &str {
        "mosek"
    }

    fn solve(&self, model: &ModelInstance, options: &SolverOptions) -> CarteiraResult<Solution> {
        let n = model.num_assets();
        let s = model.num_sectors();
        let numvar = model.num_vars();
        let constraints = model.linear_constraints();

        let mut task = Task::new().ok_or_else(|| solver_err("could not create task"))?;

        task.append_vars(numvar as i32).map_err(solver_err)?;
        task.append_cons(constraints.len() as i32).map_err(solver_err)?;

        // Weights: continuous, non-negative.
        for i in 0..n {
            task.put_var_bound(i as i32, Boundkey::LO, 0.0, f64::INFINITY)
                .map_err(solver_err)?;
        }
        // Asset and sector flags: binary.
        for j in n..numvar {
            task.put_var_type(j as i32, Variabletype::TYPE_INT)
                .map_err(solver_err)?;
            task.put_var_bound(j as i32, Boundkey::RA, 0.0, 1.0)
                .map_err(solver_err)?;
        }

        // Linear constraint rows.
        for (row, constraint) in constraints.iter().enumerate() {
            let subj: Vec<i32> = constraint
                .terms
                .iter()
                .map(|(var, _)| model.var_index(*var) as i32)
                .collect();
            let valj: Vec<f64> = constraint.terms.iter().map(|(_, c)| *c).collect();
            task.put_a_row(row as i32, &subj, &valj).map_err(solver_err)?;

            let (bk, bl, bu) = match constraint.cmp {
                Cmp::Eq => (Boundkey::FX, constraint.rhs, constraint.rhs),
                Cmp::Le => (Boundkey::UP, f64::NEG_INFINITY, constraint.rhs),
                Cmp::Ge => (Boundkey::LO, constraint.rhs, f64::INFINITY),
            };
            task.put_con_bound(row as i32, bk, bl, bu).map_err(solver_err)?;
        }

        // Objective: minimize w' Sigma w, i.e. 1/2 w' (2 Sigma) w. MOSEK
        // takes the lower triangle of Q.
        let mut qsubi = Vec::new();
        let mut qsubj = Vec::new();
        let mut qval = Vec::new();
        for i in 0..n {
            for j in 0..=i {
                let v = 2.0 * model.sigma[i][j];
                if v != 0.0 {
                    qsubi.push(i as i32);
                    qsubj.push(j as i32);
                    qval.push(v);
                }
            }
        }
        task.put_q_obj(&qsubi, &qsubj, &qval).map_err(solver_err)?;
        task.put_obj_sense(Objsense::MINIMIZE).map_err(solver_err)?;

        task.put_dou_param(Dparam::MIO_TOL_REL_GAP, options.mip_gap)
            .map_err(solver_err)?;
        task.put_dou_param(Dparam::MIO_MAX_TIME, options.time_limit_secs)
            .map_err(solver_err)?;
        task.put_int_param(Iparam::LOG, if options.verbose { 10 } else { 0 })
            .map_err(solver_err)?;

        task.optimize().map_err(solver_err)?;

        let solsta = task.get_sol_sta(Soltype::ITG).map_err(solver_err)?;
        let status = if solsta == Solsta::INTEGER_OPTIMAL {
            SolveStatus::Solved
        } else if solsta == Solsta::PRIM_FEAS {
            // Feasible incumbent without an optimality proof: the time
            // limit or the gap stop kicked in.
            SolveStatus::TimeLimit
        } else if solsta == Solsta::PRIM_INFEAS_CER {
            SolveStatus::Infeasible
        } else if solsta == Solsta::DUAL_INFEAS_CER {
            SolveStatus::Unbounded
        } else {
            SolveStatus::Unknown(format!("{:?}", solsta))
        };

        if !status.is_usable() {
            return Ok(Solution {
                status,
                weights: vec![0.0; n],
                selected: vec![false; n],
                sectors_on: vec![false; s],
                objective: 0.0,
            });
        }

        let mut xx = vec![0.0; numvar];
        task.get_xx(Soltype::ITG, &mut xx).map_err(solver_err)?;
        let objective = task.get_primal_obj(Soltype::ITG).map_err(solver_err)?;

        Ok(Solution {
            status,
            weights: xx[0..n].to_vec(),
            selected: xx[n..2 * n].iter().map(|v| *v > BINARY_THRESHOLD).collect(),
            sectors_on: xx[2 * n..].iter().map(|v| *v > BINARY_THRESHOLD).collect(),
            objective,
        })
    }
}

fn solver_err<E: std::fmt::Display>(e: E) -> CarteiraError {
    CarteiraError::SolverFailure(e.to_string())
}
