//! Seed masking, Voronoi expansion and output shaping.

use log::debug;

use crate::buffer::VoxelBuffer;
use crate::error::Result;
use crate::filters::arithmetic::{binary_and, greater_than_constant, replace_intensity};
use crate::params::OutputType;
use crate::selection::masked_voronoi_labeling;

/// Foreground value of binary output.
pub const BINARY_FOREGROUND: f32 = 255.0;

/// Label ids per voxel, 0 for background.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelImage {
    pub image: VoxelBuffer,
    pub label_count: u32,
}

impl LabelImage {
    /// Shape for presentation: ids kept as-is, or collapsed to 0/255.
    pub fn into_output(self, output_type: OutputType) -> VoxelBuffer {
        match output_type {
            OutputType::Labels => self.image,
            OutputType::Binary => {
                replace_intensity(&greater_than_constant(&self.image, 0.0), 1.0, BINARY_FOREGROUND)
            }
        }
    }
}

/// Grow every seed inside `foreground` into its own labeled region.
///
/// Seeds outside the foreground are dropped. Foreground that no seed can
/// reach stays background.
pub fn create_labels(seeds: &VoxelBuffer, foreground: &VoxelBuffer) -> Result<LabelImage> {
    let masked = binary_and(seeds, foreground)?;
    let (image, label_count) = masked_voronoi_labeling(&masked, foreground)?;
    debug!("grew {label_count} labels from {} seed voxels", masked.count_nonzero());
    Ok(LabelImage { image, label_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DataType, Dims};
    use crate::error::SegmentationError;

    fn full_mask(dims: Dims) -> VoxelBuffer {
        VoxelBuffer::from_fn(dims, DataType::U8, |_, _, _| 1.0)
    }

    #[test]
    fn test_single_seed_covers_whole_foreground() {
        let foreground = full_mask(Dims::new_3d(6, 5, 4));
        let mut seeds = VoxelBuffer::zeros(foreground.dims(), DataType::U8);
        seeds.set(2, 2, 1, 1.0);

        let labels = create_labels(&seeds, &foreground).unwrap();

        assert_eq!(labels.label_count, 1);
        assert!(labels.image.view().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_seed_outside_foreground_contributes_nothing() {
        let foreground = VoxelBuffer::from_fn(Dims::new_2d(10, 4), DataType::U8, |x, _, _| {
            if x < 5 {
                1.0
            } else {
                0.0
            }
        });
        let mut seeds = VoxelBuffer::zeros(foreground.dims(), DataType::U8);
        seeds.set(1, 1, 0, 1.0);
        let with_outside = {
            let mut s = seeds.clone();
            s.set(8, 2, 0, 1.0);
            s
        };

        let inside_only = create_labels(&seeds, &foreground).unwrap();
        let with_extra = create_labels(&with_outside, &foreground).unwrap();

        assert_eq!(inside_only.label_count, 1);
        assert_eq!(with_extra, inside_only);
    }

    #[test]
    fn test_empty_seeds_give_background() {
        let foreground = full_mask(Dims::new_2d(5, 5));
        let seeds = VoxelBuffer::zeros(foreground.dims(), DataType::U8);

        let labels = create_labels(&seeds, &foreground).unwrap();

        assert_eq!(labels.label_count, 0);
        assert_eq!(labels.image.count_nonzero(), 0);
    }

    #[test]
    fn test_binary_output_collapses_ids() {
        let foreground = full_mask(Dims::new_2d(9, 1));
        let mut seeds = VoxelBuffer::zeros(foreground.dims(), DataType::U8);
        seeds.set(0, 0, 0, 1.0);
        seeds.set(8, 0, 0, 1.0);

        let labels = create_labels(&seeds, &foreground).unwrap();
        assert_eq!(labels.label_count, 2);

        let binary = labels.into_output(OutputType::Binary);
        assert_eq!(binary.data_type(), DataType::U8);
        assert!(binary.view().iter().all(|&v| v == BINARY_FOREGROUND));
    }

    #[test]
    fn test_rank_mismatch_is_fatal() {
        let foreground = full_mask(Dims::new_3d(4, 4, 2));
        let seeds = VoxelBuffer::zeros(Dims::new_2d(4, 4), DataType::U8);
        assert!(matches!(
            create_labels(&seeds, &foreground),
            Err(SegmentationError::DimensionMismatch { .. })
        ));
    }
}
