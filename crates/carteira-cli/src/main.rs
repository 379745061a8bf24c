mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::frontier::FrontierArgs;
use commands::optimize::OptimizeArgs;

/// Cardinality-constrained portfolio selection through an external MIQP solver
#[derive(Parser)]
#[command(
    name = "carteira",
    version,
    about = "Cardinality-constrained portfolio selection through an external MIQP solver",
    long_about = "Assembles a sector-diversified, cardinality-constrained portfolio model \
                  from CSV market data, hands it to an external mixed-integer quadratic \
                  solver, and post-processes the results. The frontier command sweeps the \
                  return target and the per-asset weight cap to trace an efficient frontier."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one portfolio and print the recommended allocation
    Optimize(OptimizeArgs),
    /// Sweep return targets and weight caps to trace the efficient frontier
    Frontier(FrontierArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Optimize(args) => commands::optimize::run_optimize(args),
        Commands::Frontier(args) => commands::frontier::run_frontier(args),
        Commands::Version => {
            println!("carteira {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(payload) => {
            output::render(&cli.output, &payload);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
