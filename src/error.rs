//! Error type shared by every stage of the segmentation pipeline.

use crate::buffer::Dims;
use crate::threshold::AutoThresholdMethod;

/// Errors raised while configuring or running a segmentation.
///
/// An empty seed set is not an error: it yields an all-background label image.
#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("invalid calibration: voxel spacing must be positive, got {width} x {height} x {depth}")]
    InvalidCalibration { width: f64, height: f64, depth: f64 },

    #[error("unknown {kind} method: {name:?}")]
    UnknownMethod { kind: &'static str, name: String },

    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: Dims, right: Dims },

    #[error("{parameter} = {value} is outside the allowed range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{method} could not determine a threshold from the histogram")]
    ThresholdNotFound { method: AutoThresholdMethod },

    #[error("histogram contains no samples")]
    EmptyHistogram,

    #[error("invalid image shape: {0}")]
    InvalidShape(String),

    #[error("region {region} lies outside image {dims}")]
    InvalidRegion { region: String, dims: Dims },

    #[error("no image has been set up")]
    NotInitialized,

    #[error("a segmentation run is in progress")]
    Busy,

    #[error("invalid parameter preset: {0}")]
    Preset(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
