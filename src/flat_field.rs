//! Illumination correction: flat/dark field division and a pseudo flat field
//! estimated from the image itself.

use std::borrow::Cow;

use log::debug;

use crate::buffer::VoxelBuffer;
use crate::calibration::Calibration;
use crate::error::Result;
use crate::filters::arithmetic::{divide_images, image_to_stack, mean_of_all_pixels, multiply_scalar, subtract_images};
use crate::filters::blur::gaussian_blur;
use crate::params::{check_range, MAX_RADIUS};

/// Smooth background of `image`: an anisotropic Gaussian with `radius`
/// along x. The z axis is left unblurred for 2D images or when `force_2d`.
pub fn estimate_background(
    image: &VoxelBuffer,
    calibration: &Calibration,
    radius: f32,
    force_2d: bool,
) -> Result<VoxelBuffer> {
    check_range("radius", radius, MAX_RADIUS)?;
    let mut sigma = calibration.ratios()?.scale(radius);
    if force_2d || !image.is_3d() {
        sigma.z = 0.0;
    }
    debug!("background estimate with sigma {sigma:?}");
    Ok(gaussian_blur(image, sigma))
}

/// `image / background * mean(background)`, with the background taken from
/// [`estimate_background`].
pub fn pseudo_flat_field_correction(
    image: &VoxelBuffer,
    calibration: &Calibration,
    radius: f32,
    force_2d: bool,
) -> Result<VoxelBuffer> {
    let background = estimate_background(image, calibration, radius, force_2d)?;
    let mean = mean_of_all_pixels(&background);
    let divided = divide_images(image, &background)?;
    Ok(multiply_scalar(&divided, mean as f32))
}

/// Repeat a single-slice field through the stack of `reference`.
fn match_depth<'a>(reference: &VoxelBuffer, field: &'a VoxelBuffer) -> Result<Cow<'a, VoxelBuffer>> {
    let field = if reference.is_3d() && !field.is_3d() {
        Cow::Owned(image_to_stack(field, reference.dims().depth)?)
    } else {
        Cow::Borrowed(field)
    };
    reference.ensure_same_dims(&field)?;
    Ok(field)
}

/// Classic flat-field correction.
///
/// With a dark field: `(original - dark) / (flat - dark) * mean(flat - dark)`,
/// otherwise `original / flat * mean(flat)`. Voxels with a zero divisor
/// become 0.
pub fn flat_field_correction(
    original: &VoxelBuffer,
    flat: &VoxelBuffer,
    dark: Option<&VoxelBuffer>,
) -> Result<VoxelBuffer> {
    let flat = match_depth(original, flat)?;

    let (numerator, divisor) = match dark {
        Some(dark) => {
            let dark = match_depth(original, dark)?;
            (
                Cow::Owned(subtract_images(original, &dark)?),
                Cow::Owned(subtract_images(&flat, &dark)?),
            )
        }
        None => (Cow::Borrowed(original), flat),
    };

    let mean = mean_of_all_pixels(&divisor);
    let divided = divide_images(&numerator, &divisor)?;
    Ok(multiply_scalar(&divided, mean as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DataType, Dims};
    use crate::error::SegmentationError;

    fn vignette(dims: Dims) -> VoxelBuffer {
        VoxelBuffer::from_fn(dims, DataType::F32, |x, _, _| 50.0 + 10.0 * x as f32)
    }

    #[test]
    fn test_flat_field_removes_vignetting() {
        let dims = Dims::new_2d(6, 3);
        let flat = vignette(dims);
        let original = VoxelBuffer::from_fn(dims, DataType::F32, |x, y, _| 2.0 * flat.get(x, y, 0));

        let corrected = flat_field_correction(&original, &flat, None).unwrap();

        let expected = 2.0 * 75.0;
        assert!(corrected.view().iter().all(|&v| (v - expected).abs() < 1e-3));
    }

    #[test]
    fn test_dark_field_is_subtracted_first() {
        let dims = Dims::new_2d(5, 2);
        let flat = vignette(dims);
        let dark = VoxelBuffer::from_fn(dims, DataType::F32, |_, _, _| 10.0);
        let original = VoxelBuffer::from_fn(dims, DataType::F32, |x, y, _| {
            3.0 * (flat.get(x, y, 0) - 10.0) + 10.0
        });

        let corrected = flat_field_correction(&original, &flat, Some(&dark)).unwrap();

        // mean(flat - dark) = 60
        assert!(corrected.view().iter().all(|&v| (v - 180.0).abs() < 1e-3));
    }

    #[test]
    fn test_single_slice_flat_spans_stack() {
        let flat = vignette(Dims::new_2d(4, 2));
        let original = VoxelBuffer::from_fn(Dims::new_3d(4, 2, 3), DataType::F32, |x, y, z| {
            (z + 1) as f32 * flat.get(x, y, 0)
        });

        let corrected = flat_field_correction(&original, &flat, None).unwrap();

        assert_eq!(corrected.dims(), original.dims());
        assert!((corrected.get(0, 0, 2) - corrected.get(3, 1, 2)).abs() < 1e-3);
    }

    #[test]
    fn test_zero_flat_yields_zero() {
        let dims = Dims::new_2d(3, 1);
        let flat = VoxelBuffer::from_fn(dims, DataType::F32, |x, _, _| x as f32);
        let original = VoxelBuffer::from_fn(dims, DataType::F32, |_, _, _| 5.0);

        let corrected = flat_field_correction(&original, &flat, None).unwrap();

        assert_eq!(corrected.get(0, 0, 0), 0.0);
    }

    #[test]
    fn test_mismatched_flat_rejected() {
        let original = vignette(Dims::new_2d(4, 4));
        let flat = vignette(Dims::new_2d(5, 4));
        assert!(matches!(
            flat_field_correction(&original, &flat, None),
            Err(SegmentationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_pseudo_correction_keeps_flat_image() {
        let image = VoxelBuffer::from_fn(Dims::new_3d(8, 8, 3), DataType::U16, |_, _, _| 40.0);
        let corrected = pseudo_flat_field_correction(&image, &Calibration::pixels(), 2.0, false).unwrap();
        assert!(corrected.view().iter().all(|&v| (v - 40.0).abs() < 1e-3));
    }

    #[test]
    fn test_force_2d_keeps_slices_apart() {
        let image = VoxelBuffer::from_fn(Dims::new_3d(5, 5, 3), DataType::F32, |_, _, z| z as f32 * 10.0);
        let calibration = Calibration::pixels();

        let per_slice = estimate_background(&image, &calibration, 1.0, true).unwrap();
        let volumetric = estimate_background(&image, &calibration, 1.0, false).unwrap();

        assert!((per_slice.get(2, 2, 0) - 0.0).abs() < 1e-4);
        assert!(volumetric.get(2, 2, 0) > 0.0);
    }
}
