//! Voronoi Threshold Labeling
//!
//! Segments grayscale 2D and 3D images into individually labeled objects:
//! smoothing, background subtraction, automatic histogram thresholding, seed
//! detection and seed-masked Voronoi growth, with Python bindings via PyO3
//! and WASM bindings for JavaScript.
//!
//! ## Image Format
//! Images are [`VoxelBuffer`]s holding `f32` samples in `(z, y, x)` order:
//! - **2D**: depth 1
//! - **3D**: depth > 1
//!
//! The [`DataType`] tag records the acquired bit depth (`u8`, `u16`, `f32`) so
//! histograms are binned like the source.
//!
//! ## Pipeline
//! 1. [`Preprocessor::filter`] and [`Preprocessor::subtract_background`]
//! 2. [`Histogram`] of the input, [`HistogramUsage`] policy, [`AutoThresholdMethod`]
//! 3. [`SeedDetector::detect`] with one of the [`SeparationMethod`]s
//! 4. [`create_labels`]: mask seeds, grow labels inside the foreground
//!
//! [`make_isotropic`] resamples anisotropic stacks to cubic voxels ahead of
//! the pipeline when a host prefers that over per-axis radii.
//!
//! [`SegmentationSession`] runs these interactively and recomputes on
//! parameter edits; [`voronoi_threshold_labeling`] is the one-shot form.

pub mod buffer;
pub mod calibration;
pub mod error;
pub mod filters;
pub mod flat_field;
pub mod histogram;
pub mod isotropic;
pub mod label_splitter;
pub mod labels;
pub mod params;
pub mod preprocess;
pub mod seeds;
pub mod selection;
pub mod session;
pub mod threshold;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use buffer::{DataType, Dims, Region, VoxelBuffer};
pub use calibration::{AxisRadii, Calibration, VoxelRatios};
pub use error::{Result, SegmentationError};
pub use histogram::{Histogram, HistogramUsage};
pub use isotropic::make_isotropic;
pub use label_splitter::LabelSplitter;
pub use labels::{create_labels, LabelImage};
pub use params::{
    choices, BackgroundMethod, FilterMethod, MethodTracker, OutputType, SegmentationParameters, SeparationMethod,
    Stage,
};
pub use preprocess::Preprocessor;
pub use seeds::SeedDetector;
pub use session::{
    voronoi_threshold_labeling, InputImage, ProcessOutcome, SegmentationOutput, SegmentationSession, SessionPhase,
};
pub use threshold::AutoThresholdMethod;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::buffer::{DataType, VoxelBuffer};
    use crate::calibration::Calibration;
    use crate::error::SegmentationError;
    use crate::flat_field;
    use crate::isotropic;
    use crate::label_splitter::{parse_split_method, LabelSplitter};
    use crate::params::{self, SegmentationParameters};
    use crate::session::{self, InputImage};

    impl From<SegmentationError> for PyErr {
        fn from(err: SegmentationError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    fn to_buffer(image: PyReadonlyArray3<'_, f32>, data_type: &str) -> PyResult<VoxelBuffer> {
        let data_type = DataType::from_name(data_type)?;
        Ok(VoxelBuffer::from_array(image.as_array().to_owned(), data_type)?)
    }

    // ========================================================================
    // Segmentation
    // ========================================================================

    /// Segment a (z, y, x) float image into labeled objects.
    ///
    /// # Arguments
    /// * `image` - Samples as f32, depth 1 for 2D
    /// * `data_type` - Acquired bit depth: "u8", "u16" or "f32"
    /// * `voxel_width`, `voxel_height`, `voxel_depth` - Physical voxel size
    /// * `params_json` - Parameter preset; missing fields use defaults
    ///
    /// # Returns
    /// `(output image, label count)`
    #[pyfunction]
    #[pyo3(signature = (image, data_type="u8", voxel_width=1.0, voxel_height=1.0, voxel_depth=1.0, params_json=None))]
    pub fn voronoi_threshold_labeling<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        data_type: &str,
        voxel_width: f64,
        voxel_height: f64,
        voxel_depth: f64,
        params_json: Option<&str>,
    ) -> PyResult<(Bound<'py, PyArray3<f32>>, u32)> {
        let params = match params_json {
            Some(json) => SegmentationParameters::from_json(json)?,
            None => SegmentationParameters::default(),
        };
        let calibration = Calibration::new(voxel_width, voxel_height, voxel_depth, "");
        let input = InputImage::new("image", to_buffer(image, data_type)?, calibration);

        let output = py.allow_threads(|| session::voronoi_threshold_labeling(&input, &params))?;
        Ok((output.image.into_array().into_pyarray(py), output.label_count))
    }

    /// UI names of every option of a parameter, e.g. `"threshold"`.
    #[pyfunction]
    pub fn method_choices(kind: &str) -> PyResult<Vec<String>> {
        Ok(params::choices(kind)?)
    }

    /// Split the objects of a binary or label image (foreground >= 1).
    ///
    /// `method` is "None", "Maxima", "Eroded Maxima", "DoG Seeds",
    /// "Eroded box" or "Eroded sphere".
    #[pyfunction]
    #[pyo3(signature = (image, method="Maxima", spot_sigma=1.0, maxima_radius=1.0, voxel_width=1.0, voxel_height=1.0, voxel_depth=1.0))]
    #[allow(clippy::too_many_arguments)]
    pub fn split_labels<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        method: &str,
        spot_sigma: f32,
        maxima_radius: f32,
        voxel_width: f64,
        voxel_height: f64,
        voxel_depth: f64,
    ) -> PyResult<(Bound<'py, PyArray3<f32>>, u32)> {
        let method = parse_split_method(method)?;
        let calibration = Calibration::new(voxel_width, voxel_height, voxel_depth, "");
        let splitter = LabelSplitter::new(&calibration)?;
        let input = to_buffer(image, "f32")?;

        let labels = py.allow_threads(|| splitter.split(&input, method, spot_sigma, maxima_radius))?;
        Ok((labels.image.into_array().into_pyarray(py), labels.label_count))
    }

    // ========================================================================
    // Illumination Correction
    // ========================================================================

    /// Divide by a Gaussian background estimate and rescale to its mean.
    #[pyfunction]
    #[pyo3(signature = (image, radius, force_2d=false, voxel_width=1.0, voxel_height=1.0, voxel_depth=1.0))]
    pub fn pseudo_flat_field_correction<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        radius: f32,
        force_2d: bool,
        voxel_width: f64,
        voxel_height: f64,
        voxel_depth: f64,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let calibration = Calibration::new(voxel_width, voxel_height, voxel_depth, "");
        let input = to_buffer(image, "f32")?;
        let corrected = py.allow_threads(|| {
            flat_field::pseudo_flat_field_correction(&input, &calibration, radius, force_2d)
        })?;
        Ok(corrected.into_array().into_pyarray(py))
    }

    /// Correct `image` with a flat field and an optional dark field.
    #[pyfunction]
    #[pyo3(signature = (image, flat, dark=None))]
    pub fn flat_field_correction<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        flat: PyReadonlyArray3<'py, f32>,
        dark: Option<PyReadonlyArray3<'py, f32>>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let original = to_buffer(image, "f32")?;
        let flat = to_buffer(flat, "f32")?;
        let dark = dark.map(|d| to_buffer(d, "f32")).transpose()?;
        let corrected = flat_field::flat_field_correction(&original, &flat, dark.as_ref())?;
        Ok(corrected.into_array().into_pyarray(py))
    }

    // ========================================================================
    // Resampling
    // ========================================================================

    /// Resample y and z onto the x spacing.
    ///
    /// # Returns
    /// `(resampled image, voxel size)` with the voxel size as `(x, y, z)`
    #[pyfunction]
    #[pyo3(signature = (image, voxel_width=1.0, voxel_height=1.0, voxel_depth=1.0, data_type="f32"))]
    pub fn make_isotropic<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        voxel_width: f64,
        voxel_height: f64,
        voxel_depth: f64,
        data_type: &str,
    ) -> PyResult<(Bound<'py, PyArray3<f32>>, (f64, f64, f64))> {
        let calibration = Calibration::new(voxel_width, voxel_height, voxel_depth, "");
        let input = to_buffer(image, data_type)?;
        let (resampled, cubic) = py.allow_threads(|| isotropic::make_isotropic(&input, &calibration))?;
        Ok((
            resampled.into_array().into_pyarray(py),
            (cubic.width, cubic.height, cubic.depth),
        ))
    }

    #[pymodule]
    pub fn voronoi_labeling(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(voronoi_threshold_labeling, m)?)?;
        m.add_function(wrap_pyfunction!(split_labels, m)?)?;
        m.add_function(wrap_pyfunction!(pseudo_flat_field_correction, m)?)?;
        m.add_function(wrap_pyfunction!(flat_field_correction, m)?)?;
        m.add_function(wrap_pyfunction!(make_isotropic, m)?)?;
        m.add_function(wrap_pyfunction!(method_choices, m)?)?;
        Ok(())
    }
}
