//! Region labeling for segmentation.
//!
//! - **Connected components**: box-connected labeling of binary buffers
//! - **Masked Voronoi**: grows seed labels through a foreground mask
//!
//! Both feed the label builder and the label splitter.

pub mod labeling;

pub use labeling::{connected_components_box, masked_voronoi_labeling};
