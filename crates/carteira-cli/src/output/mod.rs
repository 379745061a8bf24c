pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod plot;
pub mod table;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use carteira_core::report::AllocationReport;
use carteira_core::sweep::SweepRow;
use carteira_core::types::ComputationOutput;

use crate::OutputFormat;

/// Sweep rows together with the best-per-level selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierResult {
    pub rows: Vec<SweepRow>,
    pub best: Vec<SweepRow>,
}

/// Everything a command can hand back for rendering.
pub enum Payload {
    Allocation(ComputationOutput<AllocationReport>),
    Frontier(ComputationOutput<FrontierResult>),
}

/// Dispatch output to the appropriate formatter.
pub fn render(format: &OutputFormat, payload: &Payload) {
    match format {
        OutputFormat::Json => json::print_json(payload),
        OutputFormat::Table => table::print_table(payload),
        OutputFormat::Csv => csv_out::print_csv(payload),
        OutputFormat::Minimal => minimal::print_minimal(payload),
    }
}

/// A rate as a percentage with two decimals, e.g. `12.50%`.
pub fn fmt_pct(value: Decimal) -> String {
    format!("{:.2}%", value * dec!(100))
}
