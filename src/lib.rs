//! Read, query, edit and convert 3D Slicer fiducial (`.fcsv`) landmark files.
//!
//! Two layouts are supported: the 6-column legacy table and the 14-column
//! markups table (Slicer 4.10). Coordinates on disk are RAS; by default the
//! x and y axes are negated so that queries return LPS physical points.
//!
//! ```no_run
//! use slicer_fiducials::{FiducialSet, Format, Space};
//!
//! let mut set = FiducialSet::open("landmarks.fcsv")?;
//! let ipd = set.distance("LE", "RE")?;
//! set.set("AC", &[0.0, 1.5, -2.0])?;
//! println!("ipd {ipd:.2}, AC at {}", set.query("AC", Space::Physical)?);
//! set.write("landmarks_markups.fcsv", Some(Format::Extended))?;
//! # Ok::<(), slicer_fiducials::FiducialError>(())
//! ```

pub mod data;
pub mod error;
pub mod fiducials;
pub mod geometry;

pub use data::model::{ExtendedRow, FiducialRow, FiducialTable, Format, LegacyRow, Space};
pub use error::{FiducialError, Result};
pub use fiducials::{FiducialSet, FiducialSetBuilder};
pub use geometry::{AffineImageGeometry, ImageGeometry, PointTransform};
