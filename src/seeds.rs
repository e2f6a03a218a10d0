//! Seed detection strategies.
//!
//! | Strategy | Input | Seeds |
//! |----------|-------|-------|
//! | Maxima | preprocessed image | local maxima after a `spot_sigma` blur |
//! | Eroded Maxima | preprocessed image | local maxima of a sphere-eroded image |
//! | Eroded box / sphere | thresholded mask | the eroded mask itself |
//! | DoG Seeds | thresholded mask | voxels where the 255-mask and its DoG disagree |
//!
//! Erosion radii are `round(spot_sigma)` voxels on every axis, so fractional
//! sigmas lose precision there. An empty seed buffer is a valid result.

use log::debug;

use crate::buffer::VoxelBuffer;
use crate::calibration::{AxisRadii, Calibration, VoxelRatios};
use crate::error::Result;
use crate::filters::arithmetic::{differs_beyond, greater_than_constant, replace_intensity};
use crate::filters::blur::{difference_of_gaussian, gaussian_blur};
use crate::filters::maxima::detect_maxima_box;
use crate::filters::morphology::minimum;
use crate::filters::Shape;
use crate::params::{check_range, SeparationMethod, MAX_RADIUS};

/// Integer erosion radius for a spot sigma.
pub fn erosion_radius(spot_sigma: f32) -> usize {
    if spot_sigma.is_finite() && spot_sigma > 0.0 {
        spot_sigma.round() as usize
    } else {
        0
    }
}

/// Erode a mask with an isotropic box or sphere of `radius` voxels.
pub fn eroded_seeds(mask: &VoxelBuffer, radius: usize, shape: Shape) -> VoxelBuffer {
    minimum(mask, AxisRadii::uniform(radius as f32), shape)
}

/// Collapse a mask to 0 / 255.
pub fn binarize_255(mask: &VoxelBuffer) -> VoxelBuffer {
    replace_intensity(&greater_than_constant(mask, 0.0), 1.0, 255.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedDetector {
    ratios: VoxelRatios,
}

impl SeedDetector {
    pub fn new(calibration: &Calibration) -> Result<Self> {
        Ok(Self::with_ratios(calibration.ratios()?))
    }

    pub fn with_ratios(ratios: VoxelRatios) -> Self {
        SeedDetector { ratios }
    }

    /// Produce seeds for `method`.
    ///
    /// # Arguments
    /// * `image` - Preprocessed, unthresholded image
    /// * `foreground` - Thresholded mask of the same extent
    /// * `spot_sigma` - Blur sigma or erosion radius
    /// * `maxima_radius` - Maxima search radius, or DoG response threshold
    pub fn detect(
        &self,
        method: SeparationMethod,
        image: &VoxelBuffer,
        foreground: &VoxelBuffer,
        spot_sigma: f32,
        maxima_radius: f32,
    ) -> Result<VoxelBuffer> {
        image.ensure_same_dims(foreground)?;
        check_range("spot_sigma", spot_sigma, MAX_RADIUS)?;
        check_range("maxima_radius", maxima_radius, MAX_RADIUS)?;
        debug!("seeds {method} with spot sigma {spot_sigma} and maxima radius {maxima_radius}");

        let seeds = match method {
            SeparationMethod::Maxima => self.maxima(image, spot_sigma, maxima_radius),
            SeparationMethod::ErodedMaxima => {
                self.eroded_maxima(image, erosion_radius(spot_sigma), maxima_radius)
            }
            SeparationMethod::ErodedBox => eroded_seeds(foreground, erosion_radius(spot_sigma), Shape::Box),
            SeparationMethod::ErodedSphere => {
                eroded_seeds(foreground, erosion_radius(spot_sigma), Shape::Sphere)
            }
            SeparationMethod::DogSeeds => self.dog_seeds(&binarize_255(foreground), spot_sigma, maxima_radius)?,
        };
        Ok(seeds)
    }

    /// Blur with `spot_sigma`, then mark maxima within `maxima_radius`.
    pub fn maxima(&self, image: &VoxelBuffer, spot_sigma: f32, maxima_radius: f32) -> VoxelBuffer {
        let blurred = gaussian_blur(image, self.ratios.scale(spot_sigma));
        detect_maxima_box(&blurred, self.ratios.scale(maxima_radius))
    }

    /// Sphere-erode by `erosion` voxels, then mark unblurred maxima.
    pub fn eroded_maxima(&self, image: &VoxelBuffer, erosion: usize, maxima_radius: f32) -> VoxelBuffer {
        let eroded = eroded_seeds(image, erosion, Shape::Sphere);
        self.maxima(&eroded, 0.0, maxima_radius)
    }

    /// Seeds from a 0/255 mask: `|mask - DoG(0, sigma)| > threshold`.
    ///
    /// With the narrow sigma at 0 the deviation equals the blurred mask, so
    /// this keeps the cores of blobs wider than the sigma.
    pub fn dog_seeds(&self, binary: &VoxelBuffer, sigma: f32, threshold: f32) -> Result<VoxelBuffer> {
        let response = difference_of_gaussian(binary, AxisRadii::uniform(0.0), self.ratios.scale(sigma));
        differs_beyond(binary, &response, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DataType, Dims};
    use crate::error::SegmentationError;
    use crate::filters::arithmetic::binary_and;

    fn square_mask(size: usize, from: usize, to: usize) -> VoxelBuffer {
        VoxelBuffer::from_fn(Dims::new_2d(size, size), DataType::U8, |x, y, _| {
            if (from..=to).contains(&x) && (from..=to).contains(&y) {
                1.0
            } else {
                0.0
            }
        })
    }

    fn disk_mask(size: usize, radius: f32) -> VoxelBuffer {
        let c = (size / 2) as f32;
        VoxelBuffer::from_fn(Dims::new_2d(size, size), DataType::U8, |x, y, _| {
            let (dx, dy) = (x as f32 - c, y as f32 - c);
            if dx * dx + dy * dy <= radius * radius {
                1.0
            } else {
                0.0
            }
        })
    }

    fn detector() -> SeedDetector {
        SeedDetector::with_ratios(VoxelRatios::ISOTROPIC)
    }

    #[test]
    fn test_erosion_radius_rounds() {
        assert_eq!(erosion_radius(1.4), 1);
        assert_eq!(erosion_radius(1.5), 2);
        assert_eq!(erosion_radius(0.0), 0);
    }

    #[test]
    fn test_maxima_finds_two_peaks() {
        let mut image = VoxelBuffer::zeros(Dims::new_2d(15, 9), DataType::U8);
        image.set(3, 4, 0, 200.0);
        image.set(11, 4, 0, 200.0);

        let seeds = detector().maxima(&image, 1.0, 2.0);
        let at_peaks = binary_and(&seeds, &image).unwrap();

        assert_eq!(at_peaks.count_nonzero(), 2);
        assert_eq!(seeds.get(7, 4, 0), 0.0);
    }

    #[test]
    fn test_eroded_box_shrinks_square() {
        let mask = square_mask(11, 2, 8);
        let seeds = detector()
            .detect(SeparationMethod::ErodedBox, &mask, &mask, 1.0, 0.0)
            .unwrap();
        assert_eq!(seeds.count_nonzero(), 25);
    }

    #[test]
    fn test_sphere_keeps_more_of_a_disk_than_box() {
        let mask = disk_mask(21, 7.0);
        let sphere = detector()
            .detect(SeparationMethod::ErodedSphere, &mask, &mask, 3.0, 0.0)
            .unwrap();
        let boxed = detector()
            .detect(SeparationMethod::ErodedBox, &mask, &mask, 3.0, 0.0)
            .unwrap();

        assert!(sphere.count_nonzero() > boxed.count_nonzero());
        assert!(boxed.count_nonzero() > 0);
    }

    #[test]
    fn test_zero_erosion_keeps_mask() {
        let mask = square_mask(9, 2, 6);
        let seeds = detector()
            .detect(SeparationMethod::ErodedSphere, &mask, &mask, 0.4, 0.0)
            .unwrap();
        assert_eq!(seeds, mask);
    }

    #[test]
    fn test_eroded_maxima_one_seed_per_plateau() {
        let image = VoxelBuffer::from_fn(Dims::new_2d(17, 9), DataType::U8, |x, y, _| {
            match (x, y) {
                (1..=5, 2..=6) => 100.0,
                (10..=14, 2..=6) => 120.0,
                _ => 0.0,
            }
        });
        let foreground = greater_than_constant(&image, 0.0);

        let seeds = detector()
            .detect(SeparationMethod::ErodedMaxima, &image, &foreground, 1.0, 1.0)
            .unwrap();
        let masked = binary_and(&seeds, &foreground).unwrap();

        assert_eq!(masked.count_nonzero(), 2);
        assert_eq!(masked.get(2, 3, 0), 1.0);
        assert_eq!(masked.get(11, 3, 0), 1.0);
    }

    #[test]
    fn test_dog_seeds_keep_blob_core() {
        let mask = square_mask(21, 6, 14);
        let seeds = detector()
            .detect(SeparationMethod::DogSeeds, &mask, &mask, 2.0, 128.0)
            .unwrap();

        assert_eq!(seeds.get(10, 10, 0), 1.0);
        assert_eq!(seeds.get(6, 6, 0), 0.0);
        assert_eq!(seeds.get(0, 0, 0), 0.0);
        assert!(seeds.count_nonzero() < 81);
    }

    #[test]
    fn test_zero_maxima_radius_marks_strict_local_maxima() {
        let values = [[0.0, 9.0, 0.0, 0.0, 7.0], [0.0, 0.0, 0.0, 0.0, 0.0], [5.0, 0.0, 0.0, 8.0, 0.0]];
        let image = VoxelBuffer::from_fn(Dims::new_2d(5, 3), DataType::U8, |x, y, _| values[y][x]);
        let foreground = greater_than_constant(&image, 0.0);

        let seeds = detector()
            .detect(SeparationMethod::Maxima, &image, &foreground, 0.0, 0.0)
            .unwrap();
        let masked = binary_and(&seeds, &foreground).unwrap();

        assert_eq!(masked.count_nonzero(), 4);
    }

    #[test]
    fn test_mismatched_foreground_rejected() {
        let image = square_mask(9, 2, 6);
        let foreground = square_mask(8, 2, 6);
        assert!(matches!(
            detector().detect(SeparationMethod::Maxima, &image, &foreground, 1.0, 1.0),
            Err(SegmentationError::DimensionMismatch { .. })
        ));
    }
}
