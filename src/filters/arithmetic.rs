//! Pixel-wise arithmetic, thresholding and global statistics.
//!
//! Binary results use 1 for foreground and 0 for background.

use ndarray::{Array3, Axis, Zip};

use crate::buffer::{DataType, VoxelBuffer};
use crate::error::{Result, SegmentationError};

fn combine<F>(a: &VoxelBuffer, b: &VoxelBuffer, op: F) -> Result<VoxelBuffer>
where
    F: Fn(f32, f32) -> f32 + Sync + Send,
{
    a.ensure_same_dims(b)?;
    let data = Zip::from(a.view())
        .and(b.view())
        .par_map_collect(|&x, &y| op(x, y));
    Ok(VoxelBuffer::with_type(data, DataType::F32))
}

// ============================================================================
// Image / image
// ============================================================================

pub fn add_images(a: &VoxelBuffer, b: &VoxelBuffer) -> Result<VoxelBuffer> {
    combine(a, b, |x, y| x + y)
}

pub fn subtract_images(a: &VoxelBuffer, b: &VoxelBuffer) -> Result<VoxelBuffer> {
    combine(a, b, |x, y| x - y)
}

pub fn multiply_images(a: &VoxelBuffer, b: &VoxelBuffer) -> Result<VoxelBuffer> {
    combine(a, b, |x, y| x * y)
}

/// Divide `a` by `b`; voxels with a zero divisor become 0.
pub fn divide_images(a: &VoxelBuffer, b: &VoxelBuffer) -> Result<VoxelBuffer> {
    combine(a, b, |x, y| if y == 0.0 { 0.0 } else { x / y })
}

/// 1 where both inputs are nonzero.
pub fn binary_and(a: &VoxelBuffer, b: &VoxelBuffer) -> Result<VoxelBuffer> {
    a.ensure_same_dims(b)?;
    let data = Zip::from(a.view())
        .and(b.view())
        .par_map_collect(|&x, &y| if x != 0.0 && y != 0.0 { 1.0 } else { 0.0 });
    Ok(VoxelBuffer::with_type(data, DataType::U8))
}

/// 1 where the two inputs differ by more than `tolerance`.
pub fn differs_beyond(a: &VoxelBuffer, b: &VoxelBuffer, tolerance: f32) -> Result<VoxelBuffer> {
    a.ensure_same_dims(b)?;
    let data = Zip::from(a.view())
        .and(b.view())
        .par_map_collect(|&x, &y| if (x - y).abs() > tolerance { 1.0 } else { 0.0 });
    Ok(VoxelBuffer::with_type(data, DataType::U8))
}

// ============================================================================
// Image / scalar
// ============================================================================

pub fn add_scalar(input: &VoxelBuffer, scalar: f32) -> VoxelBuffer {
    VoxelBuffer::with_type(input.view().mapv(|v| v + scalar), DataType::F32)
}

pub fn multiply_scalar(input: &VoxelBuffer, scalar: f32) -> VoxelBuffer {
    VoxelBuffer::with_type(input.view().mapv(|v| v * scalar), DataType::F32)
}

/// 1 where `input >= level`.
pub fn threshold(input: &VoxelBuffer, level: f32) -> VoxelBuffer {
    let data = input.view().mapv(|v| if v >= level { 1.0 } else { 0.0 });
    VoxelBuffer::with_type(data, DataType::U8)
}

/// 1 where `input > constant`.
pub fn greater_than_constant(input: &VoxelBuffer, constant: f32) -> VoxelBuffer {
    let data = input.view().mapv(|v| if v > constant { 1.0 } else { 0.0 });
    VoxelBuffer::with_type(data, DataType::U8)
}

/// Replace every sample equal to `from` with `to`.
pub fn replace_intensity(input: &VoxelBuffer, from: f32, to: f32) -> VoxelBuffer {
    let data = input.view().mapv(|v| if v == from { to } else { v });
    VoxelBuffer::with_type(data, input.data_type())
}

// ============================================================================
// Statistics / stacking
// ============================================================================

/// Mean of every voxel, accumulated in f64.
pub fn mean_of_all_pixels(input: &VoxelBuffer) -> f64 {
    let view = input.view();
    let sum: f64 = view.iter().map(|&v| v as f64).sum();
    sum / view.len() as f64
}

/// Repeat a single-slice buffer `depth` times along z.
pub fn image_to_stack(input: &VoxelBuffer, depth: usize) -> Result<VoxelBuffer> {
    if input.is_3d() {
        return Err(SegmentationError::InvalidShape(format!(
            "expected a single slice, got {}",
            input.dims()
        )));
    }
    let slice = input.view().index_axis_move(Axis(0), 0);
    let (height, width) = slice.dim();
    let data = Array3::from_shape_fn((depth, height, width), |(_, y, x)| slice[[y, x]]);
    VoxelBuffer::from_array(data, input.data_type())
}
