//! CSV export for tick history.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::{TickRecord, joules_to_kwh};

/// Column header for CSV tick export.
const HEADER: &str = "tick,hour_index,capacity_factor,consumption_j,generated_j,\
                       net_j,stored_energy_j,stored_energy_kwh,degraded";

/// Exports tick records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `records` - Tick records, oldest first
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[TickRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes tick records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[TickRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.tick.to_string(),
            r.hour_index.to_string(),
            format!("{:.4}", r.capacity_factor),
            format!("{:.3}", r.consumption_j),
            format!("{:.3}", r.generated_j),
            format!("{:.3}", r.net_j),
            format!("{:.3}", r.stored_energy_j),
            format!("{:.6}", joules_to_kwh(r.stored_energy_j)),
            r.degraded.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
