use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::json;

use carteira_core::data::{load_market_data, DataPaths};
use carteira_core::solver::{default_backend, SolverOptions};
use carteira_core::sweep::{
    best_by_max_weight, linspace, run_sweep, SweepConfig, STATUS_ERROR, STATUS_SOLVED,
};
use carteira_core::types::with_metadata;

use crate::output::{fmt_pct, plot, FrontierResult, Payload};

/// Arguments for the efficient-frontier sensitivity sweep
#[derive(Args)]
pub struct FrontierArgs {
    /// Expected-returns CSV (ticker, annualized return)
    #[arg(long, default_value = "data/vetor_retornos_calculado.csv")]
    pub returns: PathBuf,

    /// Covariance matrix CSV (square, tickers on both axes)
    #[arg(long, default_value = "data/matriz_covariancia_calculada.csv")]
    pub covariance: PathBuf,

    /// Ticker-to-sector mapping CSV (columns Ticker, Setor)
    #[arg(long, default_value = "data/mapeamento_setores.csv")]
    pub sectors: PathBuf,

    /// Fixed number of assets for the whole sweep
    #[arg(long, default_value = "15")]
    pub cardinality: u32,

    /// Lowest return target
    #[arg(long, default_value = "0.12")]
    pub return_min: Decimal,

    /// Highest return target
    #[arg(long, default_value = "0.30")]
    pub return_max: Decimal,

    /// Number of evenly spaced return targets
    #[arg(long, default_value = "20")]
    pub return_steps: usize,

    /// Comma-separated per-asset weight caps to test
    #[arg(long, value_delimiter = ',', default_value = "0.10,0.15,0.20")]
    pub max_weights: Vec<Decimal>,

    /// Annual risk-free rate for Sharpe ratios
    #[arg(long, default_value = "0.105")]
    pub risk_free_rate: Decimal,

    /// Relative MIP gap at which the solver may stop
    #[arg(long, default_value = "0.01")]
    pub mip_gap: f64,

    /// Per-solve wall-clock limit, in seconds
    #[arg(long, default_value = "60")]
    pub time_limit: f64,

    /// Let the solver write its own log
    #[arg(long)]
    pub verbose_solver: bool,

    /// Where to write the frontier scatter plot
    #[arg(long, default_value = "fronteira.svg")]
    pub plot: PathBuf,

    /// Skip plot rendering
    #[arg(long)]
    pub no_plot: bool,
}

pub fn run_frontier(args: FrontierArgs) -> Result<Payload, Box<dyn std::error::Error>> {
    let paths = DataPaths {
        returns: args.returns.clone(),
        covariance: args.covariance.clone(),
        sectors: args.sectors.clone(),
    };

    eprintln!("{}", "Loading market data...".dimmed());
    let data = load_market_data(&paths)?;
    let backend = default_backend()?;

    let config = SweepConfig {
        cardinality: args.cardinality,
        max_weights: args.max_weights.clone(),
        target_returns: linspace(args.return_min, args.return_max, args.return_steps)?,
        risk_free_rate: args.risk_free_rate,
        options: SolverOptions {
            mip_gap: args.mip_gap,
            time_limit_secs: args.time_limit,
            verbose: args.verbose_solver,
        },
    };

    eprintln!(
        "{}",
        format!(
            "Sensitivity sweep: {} runs on {} (m={}, risk-free {})",
            config.total_runs(),
            backend.name(),
            config.cardinality,
            fmt_pct(args.risk_free_rate),
        )
        .bold()
    );

    let start = Instant::now();
    let outcome = run_sweep(&data, backend.as_ref(), &config, |run, total, row| {
        let status = if row.status == STATUS_SOLVED {
            row.status.green()
        } else if row.status == STATUS_ERROR {
            row.status.red()
        } else {
            row.status.yellow()
        };
        eprintln!(
            "{} W_max={} R_target={} -> {}",
            format!("[{}/{}]", run, total).dimmed(),
            fmt_pct(row.max_weight),
            fmt_pct(row.target_return),
            status
        );
    })?;

    let best = best_by_max_weight(&outcome.rows);
    let mut warnings = outcome.warnings.clone();

    if best.is_empty() {
        warnings.push(
            "no viable solution found; try a lower return target or a higher cardinality".into(),
        );
    } else if !args.no_plot {
        plot::render_frontier(&args.plot, &outcome.rows, &best)?;
        eprintln!(
            "{}",
            format!("Frontier plot written to {}", args.plot.display()).dimmed()
        );
    }

    let envelope = with_metadata(
        "Efficient frontier via repeated MIQP solves over a parameter grid",
        &json!({
            "solver": backend.name(),
            "cardinality": args.cardinality,
            "return_targets": &config.target_returns,
            "max_weights": &config.max_weights,
            "risk_free_rate": args.risk_free_rate,
            "mip_gap": args.mip_gap,
            "time_limit_secs": args.time_limit,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        FrontierResult {
            rows: outcome.rows,
            best,
        },
    );
    Ok(Payload::Frontier(envelope))
}
