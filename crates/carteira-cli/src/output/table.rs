use colored::Colorize;
use tabled::{builder::Builder, Table};

use carteira_core::report::{AllocationReport, AllocationSummary};
use carteira_core::sweep::{SweepRow, STATUS_SOLVED};
use carteira_core::types::ComputationOutput;

use crate::output::{fmt_pct, FrontierResult, Payload};

/// Human-readable tables via the tabled crate.
pub fn print_table(payload: &Payload) {
    match payload {
        Payload::Allocation(env) => print_allocation(env),
        Payload::Frontier(env) => print_frontier(env),
    }
}

fn print_allocation(env: &ComputationOutput<AllocationReport>) {
    match &env.result {
        AllocationReport::Solved(summary) => print_allocation_summary(summary),
        AllocationReport::Unsolved { status } => {
            println!(
                "{} {}",
                "No optimal solution found. Solver status:".red(),
                status
            );
        }
    }
    print_warnings(&env.warnings);
    println!("\nMethodology: {}", env.methodology);
}

fn print_allocation_summary(summary: &AllocationSummary) {
    println!("{}", "--- Recommended Allocation ---".bold());
    let mut builder = Builder::default();
    builder.push_record(["Ticker", "Weight", "Amount"]);
    for line in &summary.lines {
        builder.push_record([
            line.ticker.as_str(),
            &fmt_pct(line.weight),
            &format!("R$ {}", line.amount),
        ]);
    }
    println!("{}", Table::from(builder));

    println!();
    println!(
        "Expected annual return:     {}",
        fmt_pct(summary.expected_return).green()
    );
    println!(
        "Annual risk (volatility):   {}",
        fmt_pct(summary.volatility).yellow()
    );
    println!("Solver wall time:           {:.4} s", summary.solve_time_secs);
}

fn print_frontier(env: &ComputationOutput<FrontierResult>) {
    let solved: Vec<&SweepRow> = env
        .result
        .rows
        .iter()
        .filter(|r| r.status == STATUS_SOLVED)
        .collect();

    if solved.is_empty() {
        println!(
            "{}",
            "Analysis finished, but no viable solution was found with the given parameters."
                .yellow()
        );
        println!("Try a lower return target (R_target) or a higher number of assets (m).");
    } else {
        println!("{}", "--- Sensitivity Analysis Results ---".bold());
        println!("{}", sweep_table(&solved));

        let best: Vec<&SweepRow> = env.result.best.iter().collect();
        println!();
        println!("{}", "--- Best Portfolios by Sharpe Ratio ---".bold());
        println!("{}", sweep_table(&best));
    }

    print_warnings(&env.warnings);
    println!("\nMethodology: {}", env.methodology);
}

fn sweep_table(rows: &[&SweepRow]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["W_max", "R_target", "m", "Status", "Risk", "Return", "Sharpe"]);
    for row in rows {
        builder.push_record([
            fmt_pct(row.max_weight),
            fmt_pct(row.target_return),
            row.cardinality.to_string(),
            row.status.clone(),
            row.risk.map(fmt_pct).unwrap_or_default(),
            row.realized_return.map(fmt_pct).unwrap_or_default(),
            row.sharpe
                .map(|s| format!("{:.2}", s))
                .unwrap_or_default(),
        ]);
    }
    Table::from(builder)
}

fn print_warnings(warnings: &[String]) {
    if !warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow());
        for w in warnings {
            println!("  - {}", w);
        }
    }
}
