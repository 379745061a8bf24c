use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::json;

use carteira_core::data::{load_market_data, DataPaths};
use carteira_core::model::{ModelInstance, ModelParams};
use carteira_core::report::{build_report, AllocationReport};
use carteira_core::solver::{default_backend, solve_model, SolverOptions};
use carteira_core::types::with_metadata;

use crate::output::Payload;

/// Arguments for a single portfolio solve
#[derive(Args)]
pub struct OptimizeArgs {
    /// Expected-returns CSV (ticker, annualized return)
    #[arg(long, default_value = "data/vetor_retornos_calculado.csv")]
    pub returns: PathBuf,

    /// Covariance matrix CSV (square, tickers on both axes)
    #[arg(long, default_value = "data/matriz_covariancia_calculada.csv")]
    pub covariance: PathBuf,

    /// Ticker-to-sector mapping CSV (columns Ticker, Setor)
    #[arg(long, default_value = "data/mapeamento_setores.csv")]
    pub sectors: PathBuf,

    /// Exact number of assets to select
    #[arg(long, default_value = "15")]
    pub cardinality: u32,

    /// Maximum weight of any single asset
    #[arg(long, default_value = "0.15")]
    pub max_weight: Decimal,

    /// Minimum acceptable expected portfolio return
    #[arg(long, default_value = "0.15")]
    pub target_return: Decimal,

    /// Total capital to allocate
    #[arg(long, default_value = "100000")]
    pub capital: Decimal,

    /// Relative MIP gap at which the solver may stop
    #[arg(long, default_value = "0.01")]
    pub mip_gap: f64,

    /// Per-solve wall-clock limit, in seconds
    #[arg(long, default_value = "60")]
    pub time_limit: f64,

    /// Let the solver write its own log
    #[arg(long)]
    pub verbose_solver: bool,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Payload, Box<dyn std::error::Error>> {
    let paths = DataPaths {
        returns: args.returns.clone(),
        covariance: args.covariance.clone(),
        sectors: args.sectors.clone(),
    };

    eprintln!("{}", "Loading market data...".dimmed());
    let data = load_market_data(&paths)?;
    let backend = default_backend()?;

    let params = ModelParams {
        cardinality: args.cardinality,
        max_weight: args.max_weight,
        target_return: args.target_return,
    };
    let options = SolverOptions {
        mip_gap: args.mip_gap,
        time_limit_secs: args.time_limit,
        verbose: args.verbose_solver,
    };

    let model = ModelInstance::build(&data, &params)?;
    eprintln!(
        "{}",
        format!(
            "Solving with {}: {} assets, {} sectors, m={}",
            backend.name(),
            model.num_assets(),
            model.num_sectors(),
            model.cardinality
        )
        .dimmed()
    );

    let start = Instant::now();
    let run = solve_model(backend.as_ref(), &model, &options)?;
    let report = build_report(&model, &run, args.capital)?;

    let mut warnings = Vec::new();
    if let AllocationReport::Unsolved { status } = &report {
        warnings.push(format!("no optimal solution: solver status '{}'", status));
    }

    let envelope = with_metadata(
        "Minimum-variance MIQP with cardinality and sector diversification",
        &json!({
            "solver": backend.name(),
            "cardinality": args.cardinality,
            "max_weight": args.max_weight,
            "target_return": args.target_return,
            "capital": args.capital,
            "mip_gap": args.mip_gap,
            "time_limit_secs": args.time_limit,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    );
    Ok(Payload::Allocation(envelope))
}
