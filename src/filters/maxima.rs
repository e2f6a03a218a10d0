//! Local maxima detection in a box window.

use ndarray::{Array3, Zip};

use crate::buffer::{DataType, VoxelBuffer};
use crate::calibration::AxisRadii;

use super::core::{offset_index, Neighborhood, Shape};

/// Mark local maxima within a box of half-extent `radii`.
///
/// A voxel is a maximum when nothing in its window is brighter and every
/// equally bright voxel comes later in scan order (z, then y, then x), so a
/// plateau contributes exactly its first voxel within reach. A radius that
/// rounds to 0 on an axis still compares against the immediate neighbors on
/// that axis; the z axis is ignored for 2D buffers.
///
/// # Returns
/// Binary buffer, 1 at maxima
pub fn detect_maxima_box(input: &VoxelBuffer, radii: AxisRadii) -> VoxelBuffer {
    let is_3d = input.is_3d();
    let [ez, ey, ex] = radii.extents(is_3d);
    let extents = [if is_3d { ez.max(1) } else { 0 }, ey.max(1), ex.max(1)];
    let view = input.view();
    let shape = view.dim();
    let neighborhood = Neighborhood::clipped(extents, Shape::Box, shape);
    let mut output = Array3::<f32>::zeros(shape);

    Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
        let center = view[[z, y, x]];
        let is_max = neighborhood.offsets().iter().all(|&offset| {
            if offset == [0, 0, 0] {
                return true;
            }
            match offset_index([z, y, x], offset, shape) {
                None => true,
                Some(idx) => {
                    let v = view[idx];
                    v < center || (v == center && offset > [0, 0, 0])
                }
            }
        });
        *out = if is_max { 1.0 } else { 0.0 };
    });

    VoxelBuffer::with_type(output, DataType::U8)
}
