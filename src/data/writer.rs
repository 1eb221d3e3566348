use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use log::info;

use super::model::FiducialTable;
use crate::error::Result;

/// Write `table` to `path` as a fiducial file in the table's own format.
pub fn save_file(path: &Path, table: &FiducialTable) -> Result<()> {
    info!(
        "writing {} fiducials ({}) to {}",
        table.len(),
        table.format(),
        path.display()
    );
    let file = BufWriter::new(File::create(path)?);
    save_writer(file, table)
}

/// Header block, then one comma-separated line per row. Coordinates and
/// orientation carry exactly 3 decimals; flags are written as integers.
pub fn save_writer<W: Write>(mut writer: W, table: &FiducialTable) -> Result<()> {
    writer.write_all(table.format().header().as_bytes())?;

    let mut csv = WriterBuilder::new()
        .has_headers(false)
        .from_writer(&mut writer);

    match table {
        FiducialTable::Legacy(rows) => {
            for r in rows {
                csv.write_record([
                    r.label.clone(),
                    decimal(r.x),
                    decimal(r.y),
                    decimal(r.z),
                    r.sel.to_string(),
                    r.vis.to_string(),
                ])?;
            }
        }
        FiducialTable::Extended(rows) => {
            for r in rows {
                csv.write_record([
                    r.id.clone(),
                    decimal(r.x),
                    decimal(r.y),
                    decimal(r.z),
                    decimal(r.ow),
                    decimal(r.ox),
                    decimal(r.oy),
                    decimal(r.oz),
                    r.vis.to_string(),
                    r.sel.to_string(),
                    r.lock.to_string(),
                    r.label.clone(),
                    r.desc.clone(),
                    r.associated_node_id.clone(),
                ])?;
            }
        }
    }

    csv.flush()?;
    drop(csv);
    writer.flush()?;
    Ok(())
}

fn decimal(value: f64) -> String {
    format!("{value:.3}")
}
