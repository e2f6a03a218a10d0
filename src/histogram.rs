//! Intensity histograms and the edge-bin usage policy.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::buffer::{DataType, VoxelBuffer};
use crate::error::{Result, SegmentationError};

/// Number of bins every histogram carries.
pub const HISTOGRAM_BINS: usize = 256;

/// Which edge bins take part in threshold selection.
///
/// Bin 0 and the last bin usually hold saturated background or foreground;
/// dropping them keeps them from dominating the automatic methods.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum HistogramUsage {
    #[default]
    #[strum(serialize = "full")]
    #[serde(rename = "full")]
    Full,
    #[strum(serialize = "ignore black")]
    #[serde(rename = "ignore black")]
    IgnoreBlack,
    #[strum(serialize = "ignore white")]
    #[serde(rename = "ignore white")]
    IgnoreWhite,
    #[strum(serialize = "ignore both")]
    #[serde(rename = "ignore both")]
    IgnoreBoth,
}

impl HistogramUsage {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "histogram usage",
            name: name.to_string(),
        })
    }
}

/// Voxel counts per intensity bin.
///
/// 8-bit sources are binned one intensity per bin starting at 0; 16-bit and
/// float sources spread the bins over the image's `[min, max]` range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    min: f32,
    bin_width: f32,
}

impl Histogram {
    /// Histogram with unit-width bins starting at intensity 0.
    pub fn from_counts(counts: Vec<u64>) -> Self {
        Histogram {
            counts,
            min: 0.0,
            bin_width: 1.0,
        }
    }

    /// Count every voxel of `image` in a single parallel pass.
    pub fn of(image: &VoxelBuffer) -> Self {
        let (min, bin_width) = match image.data_type() {
            DataType::U8 => (0.0, 1.0),
            DataType::U16 | DataType::F32 => {
                let (lo, hi) = image.min_max();
                let width = if hi > lo {
                    (hi - lo) / HISTOGRAM_BINS as f32
                } else {
                    1.0
                };
                (lo, width)
            }
        };

        let last = HISTOGRAM_BINS - 1;
        let view = image.view();
        let contiguous = view.as_standard_layout();
        let samples = contiguous.as_slice().unwrap_or_default();
        let counts = samples
            .par_iter()
            .fold(
                || vec![0u64; HISTOGRAM_BINS],
                |mut acc, &v| {
                    // NaN and negatives land in bin 0
                    let bin = (((v - min) / bin_width).floor().max(0.0) as usize).min(last);
                    acc[bin] += 1;
                    acc
                },
            )
            .reduce(
                || vec![0u64; HISTOGRAM_BINS],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            );

        Histogram {
            counts,
            min,
            bin_width,
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Copy with the edge bins zeroed per `usage`. `self` is left untouched.
    pub fn with_usage(&self, usage: HistogramUsage) -> Histogram {
        let mut adjusted = self.clone();
        let last = adjusted.counts.len().saturating_sub(1);
        if adjusted.counts.is_empty() {
            return adjusted;
        }
        match usage {
            HistogramUsage::Full => {}
            HistogramUsage::IgnoreBlack => adjusted.counts[0] = 0,
            HistogramUsage::IgnoreWhite => adjusted.counts[last] = 0,
            HistogramUsage::IgnoreBoth => {
                adjusted.counts[0] = 0;
                adjusted.counts[last] = 0;
            }
        }
        adjusted
    }

    /// Lower edge of `bin` in image intensity.
    pub fn bin_value(&self, bin: usize) -> f32 {
        self.min + bin as f32 * self.bin_width
    }

    /// First intensity above `bin`; voxels at or beyond it are foreground.
    pub fn level_above(&self, bin: usize) -> f32 {
        self.bin_value(bin + 1)
    }
}
