//! Writes the cohort result table as a comma-separated file.
//!
//! The columns are `Participant`, then `{Abbrev}_cm3` and `{Abbrev}_SAweighted` for every region in
//! label table order, and finally `Proportional_SA_rank`. Missing values are written as empty fields.

use csv::WriterBuilder;
use tempfile::NamedTempFile;

use std::io::Write;
use std::path::Path;

use crate::cohort::CohortTable;
use crate::error::Result;

pub const PARTICIPANT_COLUMN: &str = "Participant";
pub const PROPORTIONAL_SA_RANK_COLUMN: &str = "Proportional_SA_rank";

/// The header row of the result file.
pub fn cohort_header(table: &CohortTable) -> Vec<String> {
    let mut header = Vec::with_capacity(table.regions.len() * 2 + 2);
    header.push(PARTICIPANT_COLUMN.to_string());
    for abbrev in table.regions.iter() {
        header.push(format!("{}_cm3", abbrev));
        header.push(format!("{}_SAweighted", abbrev));
    }
    header.push(PROPORTIONAL_SA_RANK_COLUMN.to_string());
    header
}


/// Format a value for the result file: shortest representation that reads back to the same `f64`, empty if there is no value.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => String::new(),
    }
}


/// Write the result table to the given writer.
pub fn write_cohort_to<W: Write>(output: W, table: &CohortTable) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b',').from_writer(output);

    wtr.write_record(cohort_header(table))?;

    for record in table.records.iter() {
        let mut row: Vec<String> = Vec::with_capacity(record.regions.len() * 2 + 2);
        row.push(record.participant.clone());
        for region in record.regions.iter() {
            row.push(format_value(Some(region.volume_cm3)));
            row.push(format_value(region.weighted_cm3));
        }
        row.push(format_value(record.proportional_sa_rank));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}


/// Write the result table to a file.
///
/// The table is first written to a temporary file next to `path`, which replaces `path` only once
/// everything has been written. On error, `path` is left untouched.
pub fn write_cohort_csv<P: AsRef<Path>>(path: P, table: &CohortTable) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_cohort_to(&mut tmp, table)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
