//! Neighborhood statistics: Median, Mean, Variance.
//!
//! All three use an ellipsoidal element. The median sorts every window, so
//! its cost grows with the element volume; callers cap its radius.

use crate::buffer::{DataType, VoxelBuffer};
use crate::calibration::AxisRadii;

use super::core::{reduce_neighborhood, Neighborhood, Shape};

/// Apply a median filter.
///
/// Removes salt-and-pepper noise while preserving edges.
///
/// # Arguments
/// * `input` - 2D or 3D buffer
/// * `radii` - Half-extent per axis
pub fn median(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let neighborhood = Neighborhood::clipped(radii.extents(input.is_3d()), Shape::Sphere, input.view().dim());
    let data = reduce_neighborhood(input.view(), &neighborhood, |values| {
        values.sort_unstable_by(|a, b| a.total_cmp(b));
        values[values.len() / 2]
    });
    VoxelBuffer::with_type(data, DataType::F32)
}

/// Apply a mean (box-average over a sphere) filter.
pub fn mean(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let neighborhood = Neighborhood::clipped(radii.extents(input.is_3d()), Shape::Sphere, input.view().dim());
    let data = reduce_neighborhood(input.view(), &neighborhood, |values| {
        values.iter().sum::<f32>() / values.len() as f32
    });
    VoxelBuffer::with_type(data, DataType::F32)
}

/// Apply a local variance filter (population variance of the window).
pub fn variance(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let neighborhood = Neighborhood::clipped(radii.extents(input.is_3d()), Shape::Sphere, input.view().dim());
    let data = reduce_neighborhood(input.view(), &neighborhood, |values| {
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        var as f32
    });
    VoxelBuffer::with_type(data, DataType::F32)
}
