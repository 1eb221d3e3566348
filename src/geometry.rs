//! Coordinate-frame collaborators used by [`FiducialSet`](crate::FiducialSet).
//!
//! - [`ImageGeometry`]: maps physical points into a reference image's
//!   continuous voxel index space.
//! - [`PointTransform`]: maps one physical point to another.

use glam::{DAffine3, DMat3, DMat4, DVec3};

use crate::error::{FiducialError, Result};

/// Physical → continuous index mapping of a reference image volume.
pub trait ImageGeometry: Send + Sync {
    fn physical_to_continuous_index(&self, point: DVec3) -> DVec3;
}

/// A spatial transform applied point by point.
pub trait PointTransform {
    fn transform_point(&self, point: DVec3) -> DVec3;
}

impl PointTransform for DAffine3 {
    fn transform_point(&self, point: DVec3) -> DVec3 {
        self.transform_point3(point)
    }
}

impl PointTransform for DMat4 {
    fn transform_point(&self, point: DVec3) -> DVec3 {
        self.transform_point3(point)
    }
}

impl PointTransform for DMat3 {
    fn transform_point(&self, point: DVec3) -> DVec3 {
        *self * point
    }
}

/// Image geometry described by origin, voxel spacing and direction cosines.
///
/// `physical = origin + direction * (spacing ⊙ index)`
#[derive(Debug, Clone, PartialEq)]
pub struct AffineImageGeometry {
    origin: DVec3,
    spacing: DVec3,
    direction: DMat3,
    index_to_physical: DMat3,
    physical_to_index: DMat3,
}

impl AffineImageGeometry {
    /// Spacing must be strictly positive and the direction matrix invertible.
    pub fn new(origin: DVec3, spacing: DVec3, direction: DMat3) -> Result<Self> {
        if spacing.min_element() <= 0.0 || !spacing.is_finite() {
            return Err(FiducialError::Validation(format!(
                "voxel spacing must be positive, got {spacing}"
            )));
        }
        let index_to_physical = direction * DMat3::from_diagonal(spacing);
        let det = index_to_physical.determinant();
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return Err(FiducialError::Validation(
                "direction matrix is singular".to_string(),
            ));
        }
        Ok(Self {
            origin,
            spacing,
            direction,
            index_to_physical,
            physical_to_index: index_to_physical.inverse(),
        })
    }

    /// Axis-aligned geometry with unit direction cosines.
    pub fn axis_aligned(origin: DVec3, spacing: DVec3) -> Result<Self> {
        Self::new(origin, spacing, DMat3::IDENTITY)
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    pub fn direction(&self) -> DMat3 {
        self.direction
    }

    pub fn continuous_index_to_physical(&self, index: DVec3) -> DVec3 {
        self.origin + self.index_to_physical * index
    }
}

impl ImageGeometry for AffineImageGeometry {
    fn physical_to_continuous_index(&self, point: DVec3) -> DVec3 {
        self.physical_to_index * (point - self.origin)
    }
}
