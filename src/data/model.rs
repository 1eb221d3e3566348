use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FiducialError, Result};

// ---------------------------------------------------------------------------
// Format – which of the two on-disk table layouts
// ---------------------------------------------------------------------------

/// Column names of the legacy 6-column layout.
pub const LEGACY_COLUMNS: [&str; 6] = ["label", "x", "y", "z", "sel", "vis"];

/// Column names of the Slicer 4.10 markups layout.
pub const EXTENDED_COLUMNS: [&str; 14] = [
    "id",
    "x",
    "y",
    "z",
    "ow",
    "ox",
    "oy",
    "oz",
    "vis",
    "sel",
    "lock",
    "label",
    "desc",
    "associatedNodeID",
];

const LEGACY_HEADER: &str = "#label,x,y,z,sel,vis\n";

const EXTENDED_HEADER: &str = "# Markups fiducial file version = 4.10\n\
# CoordinateSystem = 0\n\
# columns = id,x,y,z,ow,ox,oy,oz,vis,sel,lock,label,desc,associatedNodeID\n";

/// Prefix of the node ids synthesised when projecting to [`Format::Extended`].
pub const MARKUPS_ID_PREFIX: &str = "vtkMRMLMarkupsFiducialNode_";

/// On-disk table layout of a fiducial file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `label,x,y,z,sel,vis`
    Legacy,
    /// `id,x,y,z,ow,ox,oy,oz,vis,sel,lock,label,desc,associatedNodeID`
    Extended,
}

impl Format {
    /// Detect the layout from the number of columns in a table.
    pub fn from_column_count(columns: usize) -> Result<Self> {
        match columns {
            6 => Ok(Format::Legacy),
            14 => Ok(Format::Extended),
            _ => Err(FiducialError::Schema { columns }),
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Format::Legacy => &LEGACY_COLUMNS,
            Format::Extended => &EXTENDED_COLUMNS,
        }
    }

    pub fn column_count(self) -> usize {
        self.columns().len()
    }

    /// The literal comment block written before the data rows.
    pub fn header(self) -> &'static str {
        match self {
            Format::Legacy => LEGACY_HEADER,
            Format::Extended => EXTENDED_HEADER,
        }
    }
}

impl FromStr for Format {
    type Err = FiducialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "original" => Ok(Format::Legacy),
            "extended" | "markup" | "markups" | "original_markup" => Ok(Format::Extended),
            other => Err(FiducialError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Legacy => write!(f, "legacy"),
            Format::Extended => write!(f, "extended"),
        }
    }
}

/// Coordinate frame for point queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    #[default]
    Physical,
    /// Continuous voxel index of the bound reference image.
    Index,
}

// ---------------------------------------------------------------------------
// Rows – one record per landmark
// ---------------------------------------------------------------------------

/// Flags are written as integers, but the markups writer of some tools emits
/// them as floats (`0.000`), so accept any number and treat non-zero as set.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(u8::from(value != 0.0))
}

/// A row of the legacy layout. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRow {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub sel: u8,
    #[serde(deserialize_with = "deserialize_flag")]
    pub vis: u8,
}

/// A row of the markups layout. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedRow {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ow: f64,
    pub ox: f64,
    pub oy: f64,
    pub oz: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub vis: u8,
    #[serde(deserialize_with = "deserialize_flag")]
    pub sel: u8,
    #[serde(deserialize_with = "deserialize_flag")]
    pub lock: u8,
    pub label: String,
    pub desc: String,
    #[serde(rename = "associatedNodeID")]
    pub associated_node_id: String,
}

impl ExtendedRow {
    /// Whether the orientation is the `(0, 0, 0, 1)` default.
    pub fn has_default_orientation(&self) -> bool {
        self.ow == 0.0 && self.ox == 0.0 && self.oy == 0.0 && self.oz == 1.0
    }
}

/// Access shared by both row layouts.
pub trait FiducialRow {
    fn label(&self) -> &str;
    /// The (x, y, z) exactly as stored on disk.
    fn position(&self) -> DVec3;
    fn set_position(&mut self, position: DVec3);
}

impl FiducialRow for LegacyRow {
    fn label(&self) -> &str {
        &self.label
    }

    fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    fn set_position(&mut self, position: DVec3) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }
}

impl FiducialRow for ExtendedRow {
    fn label(&self) -> &str {
        &self.label
    }

    fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    fn set_position(&mut self, position: DVec3) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }
}

/// Round to the 3 decimals the file format carries.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// FiducialTable – the loaded table in its native layout
// ---------------------------------------------------------------------------

/// A full fiducial table. The variant is the table's format.
#[derive(Debug, Clone, PartialEq)]
pub enum FiducialTable {
    Legacy(Vec<LegacyRow>),
    Extended(Vec<ExtendedRow>),
}

impl FiducialTable {
    pub fn format(&self) -> Format {
        match self {
            FiducialTable::Legacy(_) => Format::Legacy,
            FiducialTable::Extended(_) => Format::Extended,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FiducialTable::Legacy(rows) => rows.len(),
            FiducialTable::Extended(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in row order.
    pub fn labels(&self) -> Vec<&str> {
        self.positions().map(|(label, _)| label).collect()
    }

    /// `(label, on-disk position)` for every row, in row order.
    pub fn positions(&self) -> Box<dyn Iterator<Item = (&str, DVec3)> + '_> {
        match self {
            FiducialTable::Legacy(rows) => Box::new(rows.iter().map(|r| (r.label(), r.position()))),
            FiducialTable::Extended(rows) => Box::new(rows.iter().map(|r| (r.label(), r.position()))),
        }
    }

    /// On-disk position of the row with `label`.
    pub fn position(&self, label: &str) -> Option<DVec3> {
        self.positions()
            .find(|(l, _)| *l == label)
            .map(|(_, position)| position)
    }

    /// Overwrite the on-disk position of the row with `label`.
    pub fn set_position(&mut self, label: &str, position: DVec3) -> Result<()> {
        let row: Option<&mut dyn FiducialRow> = match self {
            FiducialTable::Legacy(rows) => rows
                .iter_mut()
                .find(|r| r.label == label)
                .map(|r| r as &mut dyn FiducialRow),
            FiducialTable::Extended(rows) => rows
                .iter_mut()
                .find(|r| r.label == label)
                .map(|r| r as &mut dyn FiducialRow),
        };
        match row {
            Some(row) => {
                row.set_position(position);
                Ok(())
            }
            None => Err(FiducialError::UnknownLabel(label.to_string())),
        }
    }

    /// Reorder rows by label. Duplicate labels are rejected.
    pub fn sort_by_label(&mut self) -> Result<()> {
        match self {
            FiducialTable::Legacy(rows) => sort_rows(rows),
            FiducialTable::Extended(rows) => sort_rows(rows),
        }
    }

    /// Project onto `format`, keeping the current row order.
    ///
    /// * to legacy: `label,x,y,z,sel,vis` are copied as-is.
    /// * legacy to extended: ids are synthesised from the row position,
    ///   orientation is `(0, 0, 0, 1)`, `lock` is 0, `desc` and
    ///   `associatedNodeID` are empty, numbers are rounded to 3 decimals.
    /// * extended to extended: the existing id, orientation, lock and text
    ///   columns are kept; numbers are rounded to 3 decimals.
    pub fn to_format(&self, format: Format) -> FiducialTable {
        match (self, format) {
            (FiducialTable::Legacy(rows), Format::Legacy) => FiducialTable::Legacy(rows.clone()),
            (FiducialTable::Extended(rows), Format::Legacy) => {
                let rotated = rows.iter().filter(|r| !r.has_default_orientation()).count();
                if rotated > 0 {
                    warn!("dropping orientation of {rotated} fiducial(s) in legacy projection");
                }
                FiducialTable::Legacy(
                    rows.iter()
                        .map(|r| LegacyRow {
                            label: r.label.clone(),
                            x: r.x,
                            y: r.y,
                            z: r.z,
                            sel: r.sel,
                            vis: r.vis,
                        })
                        .collect(),
                )
            }
            (FiducialTable::Legacy(rows), Format::Extended) => FiducialTable::Extended(
                rows.iter()
                    .enumerate()
                    .map(|(i, r)| ExtendedRow {
                        id: format!("{MARKUPS_ID_PREFIX}{i}"),
                        x: round3(r.x),
                        y: round3(r.y),
                        z: round3(r.z),
                        ow: 0.0,
                        ox: 0.0,
                        oy: 0.0,
                        oz: 1.0,
                        vis: r.vis,
                        sel: r.sel,
                        lock: 0,
                        label: r.label.clone(),
                        desc: String::new(),
                        associated_node_id: String::new(),
                    })
                    .collect(),
            ),
            (FiducialTable::Extended(rows), Format::Extended) => FiducialTable::Extended(
                rows.iter()
                    .map(|r| ExtendedRow {
                        x: round3(r.x),
                        y: round3(r.y),
                        z: round3(r.z),
                        ow: round3(r.ow),
                        ox: round3(r.ox),
                        oy: round3(r.oy),
                        oz: round3(r.oz),
                        ..r.clone()
                    })
                    .collect(),
            ),
        }
    }
}

fn sort_rows<R: FiducialRow>(rows: &mut [R]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for row in rows.iter() {
        if !seen.insert(row.label()) {
            return Err(FiducialError::DuplicateLabel(row.label().to_string()));
        }
    }
    rows.sort_by(|a, b| a.label().cmp(b.label()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(label: &str, x: f64, y: f64, z: f64) -> LegacyRow {
        LegacyRow {
            label: label.to_string(),
            x,
            y,
            z,
            sel: 1,
            vis: 1,
        }
    }

    #[test]
    fn test_format_from_column_count() {
        assert_eq!(Format::Extended.column_count(), 14);
        assert_eq!(Format::from_column_count(6).unwrap(), Format::Legacy);
        assert_eq!(Format::from_column_count(14).unwrap(), Format::Extended);
        assert!(matches!(
            Format::from_column_count(8),
            Err(FiducialError::Schema { columns: 8 })
        ));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("legacy".parse::<Format>().unwrap(), Format::Legacy);
        assert_eq!("Markup".parse::<Format>().unwrap(), Format::Extended);
        assert!(matches!(
            "json".parse::<Format>(),
            Err(FiducialError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_headers_match_columns() {
        assert!(Format::Extended.header().ends_with(&format!("# columns = {}\n", EXTENDED_COLUMNS.join(","))));
        assert_eq!(Format::Legacy.header(), format!("#{}\n", LEGACY_COLUMNS.join(",")));
    }

    #[test]
    fn test_sort_rejects_duplicates() {
        let mut table = FiducialTable::Legacy(vec![legacy("LE", 0.0, 0.0, 0.0), legacy("LE", 1.0, 1.0, 1.0)]);
        assert!(matches!(table.sort_by_label(), Err(FiducialError::DuplicateLabel(l)) if l == "LE"));
    }

    #[test]
    fn test_sort_orders_labels() {
        let mut table = FiducialTable::Legacy(vec![
            legacy("RE", 0.0, 0.0, 0.0),
            legacy("AC", 0.0, 0.0, 0.0),
            legacy("LE", 0.0, 0.0, 0.0),
        ]);
        table.sort_by_label().unwrap();
        assert_eq!(table.labels(), vec!["AC", "LE", "RE"]);
    }

    #[test]
    fn test_legacy_to_extended_synthesises_columns() {
        let table = FiducialTable::Legacy(vec![legacy("AC", 1.23456, -2.0, 3.0), legacy("PC", 0.0, 0.0, 0.0)]);
        let FiducialTable::Extended(rows) = table.to_format(Format::Extended) else {
            panic!("expected extended table");
        };
        assert_eq!(rows[0].id, "vtkMRMLMarkupsFiducialNode_0");
        assert_eq!(rows[1].id, "vtkMRMLMarkupsFiducialNode_1");
        assert_eq!(rows[0].x, 1.235);
        assert!(rows[0].has_default_orientation());
        assert_eq!(rows[0].lock, 0);
        assert!(rows[0].desc.is_empty());
        assert!(rows[0].associated_node_id.is_empty());
    }

    #[test]
    fn test_extended_to_extended_keeps_metadata() {
        let row = ExtendedRow {
            id: "vtkMRMLMarkupsFiducialNode_7".to_string(),
            x: 1.0,
            y: 2.0,
            z: 3.0,
            ow: 0.0,
            ox: 0.0,
            oy: 0.0,
            oz: 1.0,
            vis: 1,
            sel: 0,
            lock: 1,
            label: "AC".to_string(),
            desc: "anterior commissure".to_string(),
            associated_node_id: "vtkMRMLScalarVolumeNode1".to_string(),
        };
        let table = FiducialTable::Extended(vec![row]);
        assert_eq!(table.to_format(Format::Extended), table);
    }

    #[test]
    fn test_set_position_unknown_label() {
        let mut table = FiducialTable::Legacy(vec![legacy("AC", 0.0, 0.0, 0.0)]);
        assert!(matches!(
            table.set_position("PC", DVec3::ONE),
            Err(FiducialError::UnknownLabel(_))
        ));
        table.set_position("AC", DVec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(table.position("AC"), Some(DVec3::new(1.0, 2.0, 3.0)));
    }
}
