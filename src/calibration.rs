//! Physical voxel spacing and the anisotropic radius scaling derived from it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Physical size of one voxel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub unit: String,
}

impl Calibration {
    pub fn new(width: f64, height: f64, depth: f64, unit: impl Into<String>) -> Self {
        Calibration {
            width,
            height,
            depth,
            unit: unit.into(),
        }
    }

    /// Uncalibrated cubic voxels.
    pub fn pixels() -> Self {
        Calibration::new(1.0, 1.0, 1.0, "pixel")
    }

    /// `y = width / height`, `z = depth / width`.
    pub fn ratios(&self) -> Result<VoxelRatios> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.width) && positive(self.height) && positive(self.depth)) {
            return Err(SegmentationError::InvalidCalibration {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        Ok(VoxelRatios {
            y: self.width / self.height,
            z: self.depth / self.width,
        })
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::pixels()
    }
}

/// Spacing ratios used to turn one radius into per-axis radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRatios {
    pub y: f64,
    pub z: f64,
}

impl VoxelRatios {
    pub const ISOTROPIC: VoxelRatios = VoxelRatios { y: 1.0, z: 1.0 };

    /// Per-axis radii (in voxels) for a radius given along x.
    ///
    /// A coarse z spacing shrinks the z radius so the filter stays physically
    /// isotropic.
    pub fn scale(&self, radius: f32) -> AxisRadii {
        AxisRadii {
            x: radius,
            y: (radius as f64 * self.y) as f32,
            z: (radius as f64 / self.z) as f32,
        }
    }
}

impl Default for VoxelRatios {
    fn default() -> Self {
        VoxelRatios::ISOTROPIC
    }
}

/// Radius or sigma per axis, in voxels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRadii {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AxisRadii {
    pub fn uniform(radius: f32) -> Self {
        AxisRadii {
            x: radius,
            y: radius,
            z: radius,
        }
    }

    /// Integer extents for neighborhood kernels; z collapses to 0 for 2D.
    pub fn extents(&self, is_3d: bool) -> [usize; 3] {
        let round = |r: f32| if r.is_finite() && r > 0.0 { r.round() as usize } else { 0 };
        [
            if is_3d { round(self.z) } else { 0 },
            round(self.y),
            round(self.x),
        ]
    }
}
