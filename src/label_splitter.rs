//! Re-split an existing binary or label image into separate objects.

use crate::buffer::VoxelBuffer;
use crate::calibration::{Calibration, VoxelRatios};
use crate::error::{Result, SegmentationError};
use crate::filters::arithmetic::threshold;
use crate::labels::{create_labels, LabelImage};
use crate::params::SeparationMethod;
use crate::seeds::SeedDetector;

/// Parse a splitter method name. `"None"` keeps the foreground itself as seeds.
pub fn parse_split_method(name: &str) -> Result<Option<SeparationMethod>> {
    if name == "None" {
        return Ok(None);
    }
    SeparationMethod::from_name(name).map_err(|_| SegmentationError::UnknownMethod {
        kind: "split",
        name: name.to_string(),
    })
    .map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelSplitter {
    detector: SeedDetector,
}

impl LabelSplitter {
    pub fn new(calibration: &Calibration) -> Result<Self> {
        Ok(Self::with_ratios(calibration.ratios()?))
    }

    pub fn with_ratios(ratios: VoxelRatios) -> Self {
        LabelSplitter {
            detector: SeedDetector::with_ratios(ratios),
        }
    }

    /// Split the objects of `input` (foreground = values >= 1).
    ///
    /// Without a method every connected foreground component becomes one
    /// label; otherwise seeds come from the chosen strategy run on `input`.
    pub fn split(
        &self,
        input: &VoxelBuffer,
        method: Option<SeparationMethod>,
        spot_sigma: f32,
        maxima_radius: f32,
    ) -> Result<LabelImage> {
        let foreground = threshold(input, 1.0);
        let seeds = match method {
            None => foreground.clone(),
            Some(method) => self
                .detector
                .detect(method, input, &foreground, spot_sigma, maxima_radius)?,
        };
        create_labels(&seeds, &foreground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DataType, Dims};

    /// Two 7x7 squares joined by a one voxel wide bridge.
    fn dumbbell() -> VoxelBuffer {
        VoxelBuffer::from_fn(Dims::new_2d(19, 9), DataType::U8, |x, y, _| {
            let in_square = (1..=7).contains(&y) && ((1..=7).contains(&x) || (11..=17).contains(&x));
            let in_bridge = y == 4 && (8..=10).contains(&x);
            if in_square || in_bridge {
                255.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_none_keeps_connected_objects() {
        let splitter = LabelSplitter::with_ratios(VoxelRatios::ISOTROPIC);
        let labels = splitter.split(&dumbbell(), None, 1.0, 1.0).unwrap();
        assert_eq!(labels.label_count, 1);
        assert_eq!(labels.image.count_nonzero(), 101);
    }

    #[test]
    fn test_erosion_cuts_the_bridge() {
        let splitter = LabelSplitter::with_ratios(VoxelRatios::ISOTROPIC);
        let labels = splitter
            .split(&dumbbell(), Some(SeparationMethod::ErodedBox), 1.0, 0.0)
            .unwrap();

        assert_eq!(labels.label_count, 2);
        assert_eq!(labels.image.count_nonzero(), 101);
        assert_eq!(labels.image.get(4, 4, 0), 1.0);
        assert_eq!(labels.image.get(14, 4, 0), 2.0);
    }

    #[test]
    fn test_dog_seeds_split_dumbbell() {
        let splitter = LabelSplitter::with_ratios(VoxelRatios::ISOTROPIC);
        let labels = splitter
            .split(&dumbbell(), Some(SeparationMethod::DogSeeds), 1.0, 160.0)
            .unwrap();
        assert_eq!(labels.label_count, 2);
    }

    #[test]
    fn test_split_method_names() {
        assert_eq!(parse_split_method("None").unwrap(), None);
        assert_eq!(
            parse_split_method("DoG Seeds").unwrap(),
            Some(SeparationMethod::DogSeeds)
        );
        assert!(matches!(
            parse_split_method("Distance"),
            Err(SegmentationError::UnknownMethod { kind: "split", .. })
        ));
    }
}
