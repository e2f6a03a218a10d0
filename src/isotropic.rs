//! Resampling to cubic voxels.
//!
//! y and z are linearly interpolated onto the x spacing so that every axis
//! shares one physical step. x itself is never resampled.

use log::debug;
use ndarray::{Array3, ArrayView3, Axis, Zip};

use crate::buffer::VoxelBuffer;
use crate::calibration::Calibration;
use crate::error::Result;

/// Samples along an axis of `len` voxels spaced `spacing` apart, once
/// respaced to `target`.
fn resampled_len(len: usize, spacing: f64, target: f64) -> usize {
    ((len as f64 * spacing / target).round() as usize).max(1)
}

/// Linear interpolation along `axis` onto `len` samples, sample `j` sitting
/// at `j * step` old voxels. Positions past the last voxel clamp to it.
fn resample_axis(input: ArrayView3<'_, f32>, axis: usize, len: usize, step: f64) -> Array3<f32> {
    let source_len = input.len_of(Axis(axis));
    let mut shape = input.dim();
    match axis {
        0 => shape.0 = len,
        1 => shape.1 = len,
        _ => shape.2 = len,
    }
    if source_len == len && step == 1.0 {
        return input.to_owned();
    }

    let last = source_len - 1;
    let mut output = Array3::<f32>::zeros(shape);
    Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
        let mut index = [z, y, x];
        let position = (index[axis] as f64 * step).min(last as f64);
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(last);
        let fraction = (position - lower as f64) as f32;

        index[axis] = lower;
        let a = input[index];
        index[axis] = upper;
        let b = input[index];
        *out = a * (1.0 - fraction) + b * fraction;
    });
    output
}

/// Resample `image` so its voxels are cubes with the x spacing of
/// `calibration`.
///
/// # Returns
/// The resampled buffer and its calibration (x spacing on every axis, same unit)
pub fn make_isotropic(image: &VoxelBuffer, calibration: &Calibration) -> Result<(VoxelBuffer, Calibration)> {
    calibration.ratios()?;
    let width = calibration.width;
    let dims = image.dims();

    let height = resampled_len(dims.height, calibration.height, width);
    let depth = if image.is_3d() {
        resampled_len(dims.depth, calibration.depth, width)
    } else {
        dims.depth
    };
    debug!(
        "isotropic resampling {dims} to {}x{height}x{depth}",
        dims.width
    );

    let rows = resample_axis(image.view(), 1, height, width / calibration.height);
    let slices = resample_axis(rows.view(), 0, depth, width / calibration.depth);

    let cubic = Calibration::new(width, width, width, calibration.unit.clone());
    Ok((image.derive(slices), cubic))
}
