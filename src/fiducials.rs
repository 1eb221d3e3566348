use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::StringRecord;
use glam::DVec3;
use log::debug;

use crate::data::loader::{load_file, parse_records};
use crate::data::model::{FiducialTable, Format, Space};
use crate::data::writer::{save_file, save_writer};
use crate::error::{FiducialError, Result};
use crate::geometry::{ImageGeometry, PointTransform};

// ---------------------------------------------------------------------------
// Builder – construction inputs
// ---------------------------------------------------------------------------

/// Collects the inputs of a [`FiducialSet`].
///
/// Exactly one source is needed: a file path, a typed table, or raw records.
/// An in-memory table wins over a path.
pub struct FiducialSetBuilder {
    path: Option<PathBuf>,
    table: Option<FiducialTable>,
    records: Option<Vec<StringRecord>>,
    ras_to_lps: bool,
    image_geometry: Option<Arc<dyn ImageGeometry>>,
}

impl Default for FiducialSetBuilder {
    fn default() -> Self {
        Self {
            path: None,
            table: None,
            records: None,
            ras_to_lps: true,
            image_geometry: None,
        }
    }
}

impl FiducialSetBuilder {
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn table(mut self, table: FiducialTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Untyped rows; the layout is detected from their width.
    pub fn records(mut self, records: Vec<StringRecord>) -> Self {
        self.records = Some(records);
        self
    }

    /// Negate x and y between the file (RAS) and physical space (LPS).
    /// Defaults to `true`.
    pub fn ras_to_lps(mut self, flip: bool) -> Self {
        self.ras_to_lps = flip;
        self
    }

    pub fn image_geometry(mut self, geometry: impl ImageGeometry + 'static) -> Self {
        self.image_geometry = Some(Arc::new(geometry));
        self
    }

    pub fn shared_image_geometry(mut self, geometry: Arc<dyn ImageGeometry>) -> Self {
        self.image_geometry = Some(geometry);
        self
    }

    pub fn build(self) -> Result<FiducialSet> {
        let table = match (self.table, self.records, self.path) {
            (Some(_), Some(_), _) => {
                return Err(FiducialError::Configuration(
                    "a typed table and raw records were both given".to_string(),
                ))
            }
            (Some(table), None, path) => {
                if let Some(path) = path {
                    debug!("in-memory table given, not reading {}", path.display());
                }
                table
            }
            (None, Some(records), _) => parse_records(&records)?,
            (None, None, Some(path)) => load_file(&path)?,
            (None, None, None) => {
                return Err(FiducialError::Configuration(
                    "either a file path or a table must be given".to_string(),
                ))
            }
        };
        FiducialSet::new(table, self.ras_to_lps, self.image_geometry)
    }
}

// ---------------------------------------------------------------------------
// FiducialSet
// ---------------------------------------------------------------------------

/// A set of named landmarks in one of the two fiducial table layouts.
///
/// Rows are always sorted by label and `coordinates` is rebuilt from them
/// after every change, so the two never disagree.
#[derive(Clone)]
pub struct FiducialSet {
    table: FiducialTable,
    /// label → physical point, derived from `table`.
    coordinates: BTreeMap<String, DVec3>,
    ras_to_lps: bool,
    image_geometry: Option<Arc<dyn ImageGeometry>>,
}

impl FiducialSet {
    pub fn builder() -> FiducialSetBuilder {
        FiducialSetBuilder::default()
    }

    /// Load a file with the default RAS → LPS flip.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).build()
    }

    /// Wrap an in-memory table with the default RAS → LPS flip.
    pub fn from_table(table: FiducialTable) -> Result<Self> {
        Self::builder().table(table).build()
    }

    fn new(
        mut table: FiducialTable,
        ras_to_lps: bool,
        image_geometry: Option<Arc<dyn ImageGeometry>>,
    ) -> Result<Self> {
        table.sort_by_label()?;
        let mut set = Self {
            table,
            coordinates: BTreeMap::new(),
            ras_to_lps,
            image_geometry,
        };
        set.rebuild_coordinates();
        Ok(set)
    }

    /// Recompute the physical-space cache from the current rows.
    fn rebuild_coordinates(&mut self) {
        let flip = self.ras_to_lps;
        self.coordinates = self
            .table
            .positions()
            .map(|(label, position)| (label.to_string(), flip_xy(position, flip)))
            .collect();
        debug!("rebuilt {} fiducial coordinates", self.coordinates.len());
    }

    pub fn format(&self) -> Format {
        self.table.format()
    }

    pub fn ras_to_lps(&self) -> bool {
        self.ras_to_lps
    }

    /// The rows in their native layout, sorted by label.
    pub fn table(&self) -> &FiducialTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.coordinates.contains_key(label)
    }

    /// Labels as currently stored, in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.table.labels()
    }

    fn point(&self, label: &str) -> Result<DVec3> {
        self.coordinates
            .get(label)
            .copied()
            .ok_or_else(|| FiducialError::UnknownLabel(label.to_string()))
    }

    /// Euclidean distance between two landmarks in physical space.
    pub fn distance(&self, a: &str, b: &str) -> Result<f64> {
        Ok(self.point(a)?.distance(self.point(b)?))
    }

    /// Position of `label` in physical space, or in the continuous index space
    /// of the bound image geometry.
    pub fn query(&self, label: &str, space: Space) -> Result<DVec3> {
        let physical = self.point(label)?;
        match space {
            Space::Physical => Ok(physical),
            Space::Index => {
                let geometry = self.image_geometry.as_ref().ok_or_else(|| {
                    FiducialError::Precondition(
                        "index-space query needs an image geometry".to_string(),
                    )
                })?;
                Ok(geometry.physical_to_continuous_index(physical))
            }
        }
    }

    /// `(label, physical point)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DVec3)> + '_ {
        self.coordinates.iter().map(|(label, p)| (label.as_str(), *p))
    }

    /// Move an existing landmark to `point`, given in physical space.
    pub fn set(&mut self, label: &str, point: &[f64]) -> Result<()> {
        let [x, y, z] = point else {
            return Err(FiducialError::Validation(format!(
                "expected 3 coordinates, got {}",
                point.len()
            )));
        };
        let stored = flip_xy(DVec3::new(*x, *y, *z), self.ras_to_lps);
        self.table.set_position(label, stored)?;
        self.rebuild_coordinates();
        Ok(())
    }

    /// The same landmarks projected onto `format`, in label order.
    pub fn as_format(&self, format: Format) -> FiducialTable {
        self.table.to_format(format)
    }

    /// Per-landmark `a - b` of the stored coordinates.
    ///
    /// Both sets must hold the same labels. The result keeps `a`'s layout,
    /// flip setting and non-coordinate columns.
    pub fn diff(a: &FiducialSet, b: &FiducialSet) -> Result<FiducialSet> {
        let a_labels: BTreeSet<&str> = a.coordinates.keys().map(String::as_str).collect();
        let b_labels: BTreeSet<&str> = b.coordinates.keys().map(String::as_str).collect();
        if a_labels != b_labels {
            let only_a: Vec<_> = a_labels.difference(&b_labels).copied().collect();
            let only_b: Vec<_> = b_labels.difference(&a_labels).copied().collect();
            return Err(FiducialError::Mismatch(format!(
                "only in first: {only_a:?}, only in second: {only_b:?}"
            )));
        }

        let mut table = a.table.clone();
        for (label, position) in a.table.positions() {
            let other = b
                .table
                .position(label)
                .ok_or_else(|| FiducialError::UnknownLabel(label.to_string()))?;
            table.set_position(label, position - other)?;
        }
        FiducialSet::builder()
            .table(table)
            .ras_to_lps(a.ras_to_lps)
            .build()
    }

    /// Replace every landmark with its image under `transform`.
    pub fn apply_transform<T: PointTransform + ?Sized>(&mut self, transform: &T) -> Result<()> {
        let moved: Vec<(String, DVec3)> = self
            .iter()
            .map(|(label, p)| (label.to_string(), transform.transform_point(p)))
            .collect();
        for (label, p) in moved {
            self.set(&label, &p.to_array())?;
        }
        Ok(())
    }

    /// A transformed copy; `self` is left untouched.
    pub fn transformed<T: PointTransform + ?Sized>(&self, transform: &T) -> Result<FiducialSet> {
        let mut copy = self.clone();
        copy.apply_transform(transform)?;
        Ok(copy)
    }

    /// Write to `path` in `format`, or the set's own format when `None`.
    pub fn write(&self, path: impl AsRef<Path>, format: Option<Format>) -> Result<()> {
        let table = self.as_format(format.unwrap_or(self.format()));
        save_file(path.as_ref(), &table)
    }

    pub fn write_to<W: Write>(&self, writer: W, format: Option<Format>) -> Result<()> {
        let table = self.as_format(format.unwrap_or(self.format()));
        save_writer(writer, &table)
    }
}

fn flip_xy(p: DVec3, flip: bool) -> DVec3 {
    if flip {
        DVec3::new(-p.x, -p.y, p.z)
    } else {
        p
    }
}

impl fmt::Debug for FiducialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiducialSet")
            .field("format", &self.format())
            .field("ras_to_lps", &self.ras_to_lps)
            .field("coordinates", &self.coordinates)
            .field("image_geometry", &self.image_geometry.is_some())
            .finish()
    }
}

impl fmt::Display for FiducialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, p) in self.iter() {
            writeln!(f, "{label}: ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FiducialSet {
    type Item = (&'a str, DVec3);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, DVec3)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
