use carteira_core::report::AllocationReport;
use carteira_core::sweep::STATUS_SOLVED;

use crate::output::{fmt_pct, Payload};

/// Print just the key answer values.
pub fn print_minimal(payload: &Payload) {
    match payload {
        Payload::Allocation(env) => match &env.result {
            AllocationReport::Solved(summary) => {
                println!(
                    "return={} volatility={} positions={}",
                    fmt_pct(summary.expected_return),
                    fmt_pct(summary.volatility),
                    summary.lines.len()
                );
            }
            AllocationReport::Unsolved { status } => println!("{}", status),
        },
        Payload::Frontier(env) => {
            let solved = env
                .result
                .rows
                .iter()
                .filter(|r| r.status == STATUS_SOLVED)
                .count();
            let top = env
                .result
                .best
                .iter()
                .max_by_key(|r| r.sharpe.unwrap_or_default());
            match top {
                Some(row) => println!(
                    "solved={}/{} best_sharpe={:.2} at W_max={} R_target={}",
                    solved,
                    env.result.rows.len(),
                    row.sharpe.unwrap_or_default(),
                    fmt_pct(row.max_weight),
                    fmt_pct(row.target_return)
                ),
                None => println!("solved=0/{} no viable solution", env.result.rows.len()),
            }
        }
    }
}
