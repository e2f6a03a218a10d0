//! Morphology filters: Minimum (erode), Maximum (dilate), Opening, Closing,
//! Top-hat and Bottom-hat.
//!
//! Structuring elements are boxes or ellipsoids whose half-extents come from
//! [`AxisRadii`], so one physical radius can be honored on anisotropic voxels.
//! Voxels beyond the border are left out of the element rather than padded.

use crate::buffer::{DataType, VoxelBuffer};
use crate::calibration::AxisRadii;

use super::core::{reduce_neighborhood, Neighborhood, Shape};

// ============================================================================
// Minimum / Maximum
// ============================================================================

/// Apply a minimum filter (grayscale erosion).
///
/// Dark regions grow and bright regions shrink. On a 0/1 mask this erodes
/// the foreground.
///
/// # Arguments
/// * `input` - 2D or 3D buffer
/// * `radii` - Half-extent per axis (rounded to whole voxels)
/// * `shape` - Box or sphere element
pub fn minimum(input: &VoxelBuffer, radii: AxisRadii, shape: Shape) -> VoxelBuffer {
    let neighborhood = Neighborhood::clipped(radii.extents(input.is_3d()), shape, input.view().dim());
    let data = reduce_neighborhood(input.view(), &neighborhood, |values| {
        values.iter().copied().fold(f32::MAX, f32::min)
    });
    VoxelBuffer::with_type(data, input.data_type())
}

/// Apply a maximum filter (grayscale dilation).
///
/// Bright regions grow and dark regions shrink.
pub fn maximum(input: &VoxelBuffer, radii: AxisRadii, shape: Shape) -> VoxelBuffer {
    let neighborhood = Neighborhood::clipped(radii.extents(input.is_3d()), shape, input.view().dim());
    let data = reduce_neighborhood(input.view(), &neighborhood, |values| {
        values.iter().copied().fold(f32::MIN, f32::max)
    });
    VoxelBuffer::with_type(data, input.data_type())
}

// ============================================================================
// Opening / Closing
// ============================================================================

/// Opening: minimum then maximum. Removes bright structures smaller than the element.
pub fn opening(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let eroded = minimum(input, radii, Shape::Sphere);
    maximum(&eroded, radii, Shape::Sphere)
}

/// Closing: maximum then minimum. Fills dark structures smaller than the element.
pub fn closing(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let dilated = maximum(input, radii, Shape::Sphere);
    minimum(&dilated, radii, Shape::Sphere)
}

// ============================================================================
// Top-hat / Bottom-hat
// ============================================================================

/// White top-hat, `input - opening(input)`: keeps bright details on a dark background.
pub fn top_hat(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let opened = opening(input, radii);
    VoxelBuffer::with_type(&input.view() - &opened.view(), DataType::F32)
}

/// Black top-hat, `closing(input) - input`: turns dark details bright.
pub fn bottom_hat(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let closed = closing(input, radii);
    VoxelBuffer::with_type(&closed.view() - &input.view(), DataType::F32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Dims;

    fn square_mask() -> VoxelBuffer {
        VoxelBuffer::from_fn(Dims::new_2d(9, 9), DataType::U8, |x, y, _| {
            if (2..=6).contains(&x) && (2..=6).contains(&y) {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_minimum_shrinks_foreground() {
        let result = minimum(&square_mask(), AxisRadii::uniform(1.0), Shape::Box);

        assert_eq!(result.count_nonzero(), 9);
        assert_eq!(result.get(2, 2, 0), 0.0);
        assert_eq!(result.get(3, 3, 0), 1.0);
    }

    #[test]
    fn test_sphere_erodes_less_than_box_at_corners() {
        let boxed = minimum(&square_mask(), AxisRadii::uniform(2.0), Shape::Box);
        let sphere = minimum(&square_mask(), AxisRadii::uniform(2.0), Shape::Sphere);

        assert_eq!(boxed.count_nonzero(), 1);
        assert!(sphere.count_nonzero() >= boxed.count_nonzero());
        assert_eq!(sphere.get(4, 4, 0), 1.0);
    }

    #[test]
    fn test_maximum_grows_bright() {
        let mut buffer = VoxelBuffer::zeros(Dims::new_2d(5, 5), DataType::U8);
        buffer.set(2, 2, 0, 7.0);

        let result = maximum(&buffer, AxisRadii::uniform(1.0), Shape::Sphere);

        assert_eq!(result.get(1, 2, 0), 7.0);
        assert_eq!(result.get(2, 3, 0), 7.0);
        // Diagonal lies outside a radius-1 sphere
        assert_eq!(result.get(1, 1, 0), 0.0);
    }

    #[test]
    fn test_top_hat_removes_broad_background() {
        let mut buffer = VoxelBuffer::from_fn(Dims::new_2d(11, 11), DataType::U8, |_, _, _| 20.0);
        buffer.set(5, 5, 0, 80.0);

        let result = top_hat(&buffer, AxisRadii::uniform(2.0));

        assert!((result.get(5, 5, 0) - 60.0).abs() < 1e-4);
        assert!(result.get(0, 0, 0).abs() < 1e-4);
    }

    #[test]
    fn test_bottom_hat_highlights_dark_spot() {
        let mut buffer = VoxelBuffer::from_fn(Dims::new_2d(11, 11), DataType::U8, |_, _, _| 50.0);
        buffer.set(5, 5, 0, 10.0);

        let result = bottom_hat(&buffer, AxisRadii::uniform(2.0));

        assert!((result.get(5, 5, 0) - 40.0).abs() < 1e-4);
        assert!(result.get(1, 1, 0).abs() < 1e-4);
    }
}
