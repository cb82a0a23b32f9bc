//! Append-only CSV storage of extracted records.
//!
//! One row per invoice, one column per top-level key. The header is
//! written only when the file is new or empty; later records are not
//! reconciled against it.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PharmscanError, Result};
use crate::models::record::InvoiceRecord;

/// Append `record` as one CSV row, creating the file if needed.
///
/// An empty record is refused with [`PharmscanError::EmptyRecord`] and
/// the file is left untouched.
pub fn append_record(path: &Path, record: &InvoiceRecord) -> Result<()> {
    if record.is_empty() {
        return Err(PharmscanError::EmptyRecord);
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::Writer::from_writer(file);

    if needs_header {
        debug!(path = %path.display(), "Writing CSV header");
        writer.write_record(record.keys())?;
    }

    writer.write_record(record_cells(record))?;
    writer.flush()?;

    info!(path = %path.display(), columns = record.len(), "Record appended");
    Ok(())
}

/// Number of invoice rows in a CSV written by [`append_record`].
///
/// Counts lines minus the header, so cells containing newlines are
/// counted more than once. A missing file holds zero invoices.
pub fn count_invoices(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut lines: usize = 0;
    for line in reader.lines() {
        line?;
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}

/// CSV cells for a record, in key order.
///
/// Strings are written verbatim; everything else as compact JSON.
pub fn record_cells(record: &InvoiceRecord) -> Vec<String> {
    record
        .iter()
        .map(|(_, value)| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
