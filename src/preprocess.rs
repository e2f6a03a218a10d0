//! Smoothing filter and background subtraction ahead of thresholding.

use log::debug;

use crate::buffer::VoxelBuffer;
use crate::calibration::{Calibration, VoxelRatios};
use crate::error::Result;
use crate::filters::arithmetic::subtract_images;
use crate::filters::blur::{difference_of_gaussian, gaussian_blur};
use crate::filters::morphology::{bottom_hat, closing, opening, top_hat};
use crate::filters::rank;
use crate::params::{check_range, BackgroundMethod, FilterMethod};

/// Runs the two preprocessing stages with calibration-scaled radii.
///
/// Both stages borrow their input and return a new buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    ratios: VoxelRatios,
}

impl Preprocessor {
    pub fn new(calibration: &Calibration) -> Result<Self> {
        Ok(Self::with_ratios(calibration.ratios()?))
    }

    pub fn with_ratios(ratios: VoxelRatios) -> Self {
        Preprocessor { ratios }
    }

    pub fn ratios(&self) -> VoxelRatios {
        self.ratios
    }

    /// Apply the smoothing filter `method` with `radius` along x.
    pub fn filter(&self, image: &VoxelBuffer, method: FilterMethod, radius: f32) -> Result<VoxelBuffer> {
        check_range("filter_radius", radius, method.max_radius())?;
        let radii = self.ratios.scale(radius);
        debug!("filter {method} with radii {radii:?}");

        let filtered = match method {
            FilterMethod::None => image.clone(),
            FilterMethod::Gaussian => gaussian_blur(image, radii),
            FilterMethod::DifferenceOfGaussian => {
                difference_of_gaussian(image, radii, self.ratios.scale(2.0 * radius))
            }
            FilterMethod::Median => rank::median(image, radii),
            FilterMethod::Mean => rank::mean(image, radii),
            FilterMethod::Open => opening(image, radii),
            FilterMethod::Close => closing(image, radii),
            FilterMethod::Variance => rank::variance(image, radii),
        };
        Ok(filtered)
    }

    /// Remove a smooth background estimated with `method` at `radius`.
    pub fn subtract_background(
        &self,
        image: &VoxelBuffer,
        method: BackgroundMethod,
        radius: f32,
    ) -> Result<VoxelBuffer> {
        check_range("background_radius", radius, method.max_radius())?;
        let radii = self.ratios.scale(radius);
        debug!("background {method} with radii {radii:?}");

        match method {
            BackgroundMethod::None => Ok(image.clone()),
            BackgroundMethod::DifferenceOfGaussian => subtract_images(image, &gaussian_blur(image, radii)),
            BackgroundMethod::DifferenceOfMedian => subtract_images(image, &rank::median(image, radii)),
            BackgroundMethod::TopHat => Ok(top_hat(image, radii)),
            BackgroundMethod::BottomHat => Ok(bottom_hat(image, radii)),
        }
    }
}
