use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::de::DeserializeOwned;

use super::model::{FiducialTable, Format};
use crate::error::{FiducialError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a fiducial file. Lines starting with `#` are comments; there is no
/// header row.
pub fn load_file(path: &Path) -> Result<FiducialTable> {
    info!("reading fiducials from {}", path.display());
    let file = File::open(path)?;
    load_reader(file)
}

/// Read fiducial CSV from any reader.
pub fn load_reader<R: Read>(reader: R) -> Result<FiducialTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    parse_records(&records)
}

/// Turn raw records into a typed table, detecting the layout from the
/// column count.
///
/// Every record must have the width of the first one. An empty input has no
/// detectable layout and is a schema error.
pub fn parse_records(records: &[StringRecord]) -> Result<FiducialTable> {
    let columns = records.first().map_or(0, |r| r.len());
    let format = Format::from_column_count(columns)?;
    debug!("detected {format} layout ({columns} columns, {} rows)", records.len());

    for (row, record) in records.iter().enumerate() {
        if record.len() != columns {
            return Err(FiducialError::Parse {
                row,
                message: format!("expected {columns} fields, found {}", record.len()),
            });
        }
    }

    Ok(match format {
        Format::Legacy => FiducialTable::Legacy(deserialize_rows(records)?),
        Format::Extended => FiducialTable::Extended(deserialize_rows(records)?),
    })
}

fn deserialize_rows<T: DeserializeOwned>(records: &[StringRecord]) -> Result<Vec<T>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            record.deserialize(None).map_err(|e| FiducialError::Parse {
                row,
                message: e.to_string(),
            })
        })
        .collect()
}
