//! CSV sinks for extraction tables and failure logs

use std::fs::File;
use std::io::Write;
use std::path::Path;
use csv::Writer;
use log::info;

use crate::batch::PointFailure;
use crate::errors::ExtractResult;
use crate::record::Table;

/// Write the table as CSV: header row, then one row per record
pub fn write_table<W: Write>(table: &Table, writer: W) -> ExtractResult<()> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(table.header())?;
    for row in table.rows() {
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the table to a CSV file
pub fn write_table_file<P: AsRef<Path>>(table: &Table, path: P) -> ExtractResult<()> {
    let file = File::create(path.as_ref())?;
    write_table(table, file)?;
    info!("Wrote {} record(s) to {}", table.len(), path.as_ref().display());
    Ok(())
}

/// Write failed points as `index,id,cause` rows
pub fn write_failures<W: Write>(failures: &[PointFailure], writer: W) -> ExtractResult<()> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(["index", "id", "cause"])?;
    for failure in failures {
        csv.write_record([failure.index.to_string(), failure.point_id.clone(), failure.cause.clone()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the failure log to a file
pub fn write_failures_file<P: AsRef<Path>>(failures: &[PointFailure], path: P) -> ExtractResult<()> {
    let file = File::create(path.as_ref())?;
    write_failures(failures, file)?;
    info!("Wrote {} failure(s) to {}", failures.len(), path.as_ref().display());
    Ok(())
}
