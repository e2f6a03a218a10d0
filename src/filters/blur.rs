//! Gaussian blur and difference-of-Gaussian for voxel buffers.
//!
//! Uses separable per-axis convolution; each axis gets its own sigma so the
//! caller can compensate anisotropic voxel spacing. The z pass is skipped for
//! 2D buffers.

use crate::buffer::{DataType, VoxelBuffer};
use crate::calibration::AxisRadii;

use super::core::{convolve_axis, gaussian_kernel_1d};

/// Apply Gaussian blur.
///
/// # Arguments
/// * `input` - 2D or 3D buffer
/// * `sigma` - Standard deviation per axis, in voxels (0 skips an axis)
///
/// # Returns
/// Blurred buffer with the same extent
pub fn gaussian_blur(input: &VoxelBuffer, sigma: AxisRadii) -> VoxelBuffer {
    let z_sigma = if input.is_3d() { sigma.z } else { 0.0 };
    let mut data = input.view().to_owned();

    // Horizontal, vertical, then through the stack
    for (axis, s) in [(2, sigma.x), (1, sigma.y), (0, z_sigma)] {
        if s > 0.0 {
            data = convolve_axis(data.view(), &gaussian_kernel_1d(s), axis);
        }
    }

    VoxelBuffer::with_type(data, DataType::F32)
}

/// Difference of two Gaussian blurs, `blur(sigma1) - blur(sigma2)`.
///
/// A zero `sigma1` keeps the input unblurred, turning the result into
/// `input - blur(sigma2)`.
pub fn difference_of_gaussian(
    input: &VoxelBuffer,
    sigma1: AxisRadii,
    sigma2: AxisRadii,
) -> VoxelBuffer {
    let narrow = gaussian_blur(input, sigma1);
    let wide = gaussian_blur(input, sigma2);
    VoxelBuffer::with_type(&narrow.view() - &wide.view(), DataType::F32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Dims;

    fn spike_2d() -> VoxelBuffer {
        let mut buffer = VoxelBuffer::zeros(Dims::new_2d(9, 9), DataType::U8);
        buffer.set(4, 4, 0, 100.0);
        buffer
    }

    #[test]
    fn test_blur_spreads_and_conserves_mass() {
        let result = gaussian_blur(&spike_2d(), AxisRadii::uniform(1.0));

        assert!(result.get(4, 4, 0) < 100.0);
        assert!(result.get(5, 4, 0) > 0.0);
        assert!(result.get(4, 5, 0) > 0.0);
        let total: f32 = result.view().iter().sum();
        assert!((total - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_blur_respects_zero_axis() {
        let result = gaussian_blur(&spike_2d(), AxisRadii { x: 1.0, y: 0.0, z: 0.0 });

        assert!(result.get(5, 4, 0) > 0.0);
        assert_eq!(result.get(4, 5, 0), 0.0);
    }

    #[test]
    fn test_blur_2d_ignores_z_sigma() {
        let flat = gaussian_blur(&spike_2d(), AxisRadii { x: 1.0, y: 1.0, z: 0.0 });
        let with_z = gaussian_blur(&spike_2d(), AxisRadii { x: 1.0, y: 1.0, z: 5.0 });
        assert_eq!(flat, with_z);
    }

    #[test]
    fn test_blur_3d_crosses_slices() {
        let mut buffer = VoxelBuffer::zeros(Dims::new_3d(5, 5, 5), DataType::U8);
        buffer.set(2, 2, 2, 50.0);
        let result = gaussian_blur(&buffer, AxisRadii::uniform(1.0));
        assert!(result.get(2, 2, 1) > 0.0);
        assert!(result.get(2, 2, 3) > 0.0);
    }

    #[test]
    fn test_dog_of_constant_is_zero() {
        let buffer = VoxelBuffer::from_fn(Dims::new_2d(8, 8), DataType::U8, |_, _, _| 40.0);
        let result = difference_of_gaussian(&buffer, AxisRadii::uniform(1.0), AxisRadii::uniform(2.0));
        assert!(result.view().iter().all(|v| v.abs() < 1e-3));
    }
}
