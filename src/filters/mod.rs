//! Voxel kernels consumed by the segmentation pipeline.
//!
//! This is the CPU implementation of the primitive capability: every stage
//! of the pipeline is composed from these calls and nothing else touches
//! voxel data directly.
//!
//! ## Conventions
//!
//! | Concern | Convention |
//! |---------|------------|
//! | Layout | `(z, y, x)`, 2D buffers have depth 1 |
//! | Ownership | Inputs are borrowed, every output is a new buffer |
//! | Radii | [`AxisRadii`](crate::calibration::AxisRadii) per axis, z ignored in 2D |
//! | Binary output | 1 = foreground, 0 = background |
//! | Borders | Blur clamps to edge; neighborhood filters clip the element |
//!
//! ## Kernel Categories
//!
//! - **Blur**: gaussian_blur, difference_of_gaussian
//! - **Morphology**: minimum, maximum, opening, closing, top_hat, bottom_hat
//! - **Rank**: median, mean, variance
//! - **Arithmetic**: image/image and image/scalar ops, threshold, binary_and, statistics
//! - **Maxima**: detect_maxima_box
//!
//! Kernels parallelize over voxels with rayon through `ndarray::Zip`.

pub mod arithmetic;
pub mod blur;
pub mod core;
pub mod maxima;
pub mod morphology;
pub mod rank;

pub use self::core::Shape;
