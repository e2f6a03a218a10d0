//! Owned voxel buffers.
//!
//! A [`VoxelBuffer`] is the unit every kernel consumes and produces. Samples are
//! stored as `f32` in `(z, y, x)` order; a 2D image is a buffer with depth 1.
//! The [`DataType`] tag remembers the bit depth of the source so histograms can
//! be binned the way the source was acquired.
//!
//! Buffers are never shared between stages: a kernel borrows its inputs and
//! returns a freshly owned output. Dropping a buffer releases it.

use std::fmt;

use ndarray::{s, Array3, ArrayView3, ArrayViewMut3};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Result, SegmentationError};

/// Extent of a buffer in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dims {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Dims {
    pub fn new_2d(width: usize, height: usize) -> Self {
        Dims { width, height, depth: 1 }
    }

    pub fn new_3d(width: usize, height: usize, depth: usize) -> Self {
        Dims { width, height, depth }
    }

    /// Rank is 3 when the buffer has more than one slice.
    pub fn is_3d(&self) -> bool {
        self.depth > 1
    }

    pub fn voxel_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// ndarray shape, `(depth, height, width)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.depth, self.height, self.width)
    }

    fn from_shape((depth, height, width): (usize, usize, usize)) -> Self {
        Dims { width, height, depth }
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_3d() {
            write!(f, "{}x{}x{}", self.width, self.height, self.depth)
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

/// Bit depth of the acquired samples.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    U8,
    U16,
    F32,
}

impl DataType {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "data type",
            name: name.to_string(),
        })
    }
}

/// Rectangular region of interest in the xy plane, applied to every slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Region { x, y, width, height }
    }

    fn fits(&self, dims: Dims) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= dims.width
            && self.y + self.height <= dims.height
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Owned 2D/3D scalar image.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelBuffer {
    data: Array3<f32>,
    data_type: DataType,
}

impl VoxelBuffer {
    /// Allocate a zero-filled buffer.
    pub fn zeros(dims: Dims, data_type: DataType) -> Self {
        VoxelBuffer {
            data: Array3::zeros(dims.shape()),
            data_type,
        }
    }

    /// Wrap an existing `(z, y, x)` array. Empty extents are rejected.
    pub fn from_array(data: Array3<f32>, data_type: DataType) -> Result<Self> {
        let (depth, height, width) = data.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(SegmentationError::InvalidShape(format!(
                "empty extent {}x{}x{}",
                width, height, depth
            )));
        }
        Ok(VoxelBuffer { data, data_type })
    }

    /// Build a buffer from samples laid out slice by slice, row by row.
    pub fn from_vec(dims: Dims, samples: Vec<f32>, data_type: DataType) -> Result<Self> {
        if samples.len() != dims.voxel_count() {
            return Err(SegmentationError::InvalidShape(format!(
                "{} samples cannot fill {}",
                samples.len(),
                dims
            )));
        }
        let data = Array3::from_shape_vec(dims.shape(), samples)
            .map_err(|e| SegmentationError::InvalidShape(e.to_string()))?;
        Self::from_array(data, data_type)
    }

    /// Build a buffer by evaluating `f(x, y, z)` for every voxel.
    pub fn from_fn<F>(dims: Dims, data_type: DataType, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        VoxelBuffer {
            data: Array3::from_shape_fn(dims.shape(), |(z, y, x)| f(x, y, z)),
            data_type,
        }
    }

    pub fn dims(&self) -> Dims {
        Dims::from_shape(self.data.dim())
    }

    pub fn is_3d(&self) -> bool {
        self.dims().is_3d()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.data.view_mut()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// Sample at `(x, y, z)`.
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[[z, y, x]]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        self.data[[z, y, x]] = value;
    }

    /// New buffer with the same bit depth tag as `self`.
    pub(crate) fn derive(&self, data: Array3<f32>) -> Self {
        VoxelBuffer {
            data,
            data_type: self.data_type,
        }
    }

    pub(crate) fn with_type(data: Array3<f32>, data_type: DataType) -> Self {
        VoxelBuffer { data, data_type }
    }

    /// Copy the voxels inside `region` from every slice.
    pub fn crop(&self, region: &Region) -> Result<Self> {
        let dims = self.dims();
        if !region.fits(dims) {
            return Err(SegmentationError::InvalidRegion {
                region: region.to_string(),
                dims,
            });
        }
        let data = self
            .data
            .slice(s![
                ..,
                region.y..region.y + region.height,
                region.x..region.x + region.width
            ])
            .to_owned();
        Ok(self.derive(data))
    }

    /// Fail with `DimensionMismatch` unless both buffers share an extent.
    pub fn ensure_same_dims(&self, other: &VoxelBuffer) -> Result<()> {
        let (left, right) = (self.dims(), other.dims());
        if left != right {
            return Err(SegmentationError::DimensionMismatch { left, right });
        }
        Ok(())
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0.0).count()
    }
}
