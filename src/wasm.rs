//! WebAssembly exports for the segmentation pipeline.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images cross the
//! boundary as flat `f32` arrays laid out slice by slice, row by row
//! (length = width * height * depth).
//!
//! Errors surface as thrown JavaScript strings.

use wasm_bindgen::prelude::*;

use crate::buffer::{DataType, Dims, VoxelBuffer};
use crate::calibration::Calibration;
use crate::error::SegmentationError;
use crate::flat_field;
use crate::isotropic::make_isotropic;
use crate::label_splitter::{parse_split_method, LabelSplitter};
use crate::params::{choices, SegmentationParameters};
use crate::session::{self, InputImage};

fn to_js(err: SegmentationError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_buffer(data: &[f32], width: usize, height: usize, depth: usize, data_type: DataType) -> Result<VoxelBuffer, JsValue> {
    VoxelBuffer::from_vec(Dims::new_3d(width, height, depth), data.to_vec(), data_type).map_err(to_js)
}

// ============================================================================
// Segmentation
// ============================================================================

/// Segment an image into labeled objects.
///
/// # Arguments
/// * `data` - Flat array of samples (length = width * height * depth)
/// * `width`, `height`, `depth` - Extent in voxels, depth 1 for 2D
/// * `data_type` - Acquired bit depth: "u8", "u16" or "f32"
/// * `params_json` - Parameter preset; an empty string selects the defaults
///
/// # Returns
/// Flat array of label ids, or 0/255 for binary output
#[wasm_bindgen]
pub fn voronoi_threshold_labeling_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    depth: usize,
    data_type: &str,
    params_json: &str,
) -> Result<Vec<f32>, JsValue> {
    let data_type = DataType::from_name(data_type).map_err(to_js)?;
    let params = if params_json.is_empty() {
        SegmentationParameters::default()
    } else {
        SegmentationParameters::from_json(params_json).map_err(to_js)?
    };
    let buffer = to_buffer(data, width, height, depth, data_type)?;
    let input = InputImage::new("image", buffer, Calibration::pixels());

    let output = session::voronoi_threshold_labeling(&input, &params).map_err(to_js)?;
    Ok(output.image.into_array().into_raw_vec_and_offset().0)
}

/// UI names of every option of a parameter `kind` ("filter", "threshold", ...).
#[wasm_bindgen]
pub fn method_choices_wasm(kind: &str) -> Result<Vec<String>, JsValue> {
    choices(kind).map_err(to_js)
}

// ============================================================================
// Label Splitting
// ============================================================================

/// Split the objects of a binary or label image.
///
/// `method` is "None", "Maxima", "Eroded Maxima", "DoG Seeds", "Eroded box"
/// or "Eroded sphere". Voxels are assumed isotropic.
#[wasm_bindgen]
pub fn split_labels_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    depth: usize,
    method: &str,
    spot_sigma: f32,
    maxima_radius: f32,
) -> Result<Vec<f32>, JsValue> {
    let method = parse_split_method(method).map_err(to_js)?;
    let input = to_buffer(data, width, height, depth, DataType::F32)?;
    let splitter = LabelSplitter::new(&Calibration::pixels()).map_err(to_js)?;

    let labels = splitter
        .split(&input, method, spot_sigma, maxima_radius)
        .map_err(to_js)?;
    Ok(labels.image.into_array().into_raw_vec_and_offset().0)
}

// ============================================================================
// Illumination Correction
// ============================================================================

/// Pseudo flat-field correction with a Gaussian background of `radius`.
#[wasm_bindgen]
pub fn pseudo_flat_field_correction_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    depth: usize,
    radius: f32,
    force_2d: bool,
) -> Result<Vec<f32>, JsValue> {
    let input = to_buffer(data, width, height, depth, DataType::F32)?;
    let corrected = flat_field::pseudo_flat_field_correction(&input, &Calibration::pixels(), radius, force_2d)
        .map_err(to_js)?;
    Ok(corrected.into_array().into_raw_vec_and_offset().0)
}

// ============================================================================
// Resampling
// ============================================================================

/// Resample y and z onto the x spacing.
///
/// # Returns
/// Flat resampled samples. Rows become `max(1, round(height * voxel_height / voxel_width))`,
/// slices of a stack `max(1, round(depth * voxel_depth / voxel_width))`.
#[wasm_bindgen]
pub fn make_isotropic_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    depth: usize,
    voxel_width: f64,
    voxel_height: f64,
    voxel_depth: f64,
) -> Result<Vec<f32>, JsValue> {
    let input = to_buffer(data, width, height, depth, DataType::F32)?;
    let calibration = Calibration::new(voxel_width, voxel_height, voxel_depth, "");
    let (resampled, _) = make_isotropic(&input, &calibration).map_err(to_js)?;
    Ok(resampled.into_array().into_raw_vec_and_offset().0)
}
