use std::io;

use carteira_core::report::AllocationReport;

use crate::output::Payload;

/// Write the result rows as CSV to stdout.
pub fn print_csv(payload: &Payload) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match payload {
        Payload::Allocation(env) => match &env.result {
            AllocationReport::Solved(summary) => {
                for line in &summary.lines {
                    let _ = wtr.serialize(line);
                }
            }
            AllocationReport::Unsolved { status } => {
                let _ = wtr.write_record(["status", status.as_str()]);
            }
        },
        Payload::Frontier(env) => {
            // Every sweep row, including the failed ones; the status
            // column tells them apart.
            for row in &env.result.rows {
                let _ = wtr.serialize(row);
            }
        }
    }

    let _ = wtr.flush();
}
