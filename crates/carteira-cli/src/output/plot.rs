use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use carteira_core::sweep::{SweepRow, STATUS_SOLVED};

use crate::output::fmt_pct;

const SERIES_COLORS: &[RGBColor] = &[BLUE, GREEN, MAGENTA, CYAN, BLACK];

/// Risk/return scatter of all solved sweep rows, one series per weight
/// cap, with the best-Sharpe portfolios highlighted.
pub fn render_frontier(
    path: &Path,
    rows: &[SweepRow],
    best: &[SweepRow],
) -> Result<(), Box<dyn Error>> {
    let solved: Vec<&SweepRow> = rows.iter().filter(|r| r.status == STATUS_SOLVED).collect();
    if solved.is_empty() {
        return Ok(());
    }

    let all_points: Vec<(f64, f64)> = solved.iter().filter_map(|r| to_xy(r)).collect();
    let (x_min, x_max) = padded_bounds(all_points.iter().map(|p| p.0));
    let (y_min, y_max) = padded_bounds(all_points.iter().map(|p| p.1));

    let root = SVGBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Fronteira Eficiente - Análise de Sensibilidade",
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Risco Anual (Volatilidade)")
        .y_desc("Retorno Anual Esperado")
        .x_label_formatter(&|v: &f64| format!("{:.1}%", v * 100.0))
        .y_label_formatter(&|v: &f64| format!("{:.1}%", v * 100.0))
        .draw()?;

    // One series per weight-cap level, in order of first appearance.
    let mut levels: Vec<Decimal> = Vec::new();
    for row in &solved {
        if !levels.contains(&row.max_weight) {
            levels.push(row.max_weight);
        }
    }
    for (k, level) in levels.iter().enumerate() {
        let color = SERIES_COLORS[k % SERIES_COLORS.len()];
        let points: Vec<(f64, f64)> = solved
            .iter()
            .filter(|r| r.max_weight == *level)
            .filter_map(|r| to_xy(r))
            .collect();
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 5, color.filled())),
            )?
            .label(format!("W_max = {}", fmt_pct(*level)))
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    let best_points: Vec<(f64, f64)> = best.iter().filter_map(to_xy).collect();
    chart
        .draw_series(
            best_points
                .iter()
                .map(|&(x, y)| TriangleMarker::new((x, y), 9, RED.filled())),
        )?
        .label("Ótimo Sharpe")
        .legend(|(x, y)| TriangleMarker::new((x, y), 9, RED.filled()));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

fn to_xy(row: &SweepRow) -> Option<(f64, f64)> {
    let risk = row.risk.and_then(|d| d.to_f64())?;
    let ret = row.realized_return.and_then(|d| d.to_f64())?;
    Some((risk, ret))
}

fn padded_bounds<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    let pad = ((max - min) * 0.1).max(0.005);
    (min - pad, max + pad)
}
