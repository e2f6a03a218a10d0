//! Connected-component labeling and seed-masked Voronoi growth.

use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3, Zip};

use crate::buffer::{DataType, VoxelBuffer};
use crate::error::Result;
use crate::filters::core::{offset_index, Neighborhood};

/// Label the nonzero voxels of `binary` by box connectivity (8 in 2D, 26 in 3D).
///
/// Ids start at 1 and follow the scan order of each component's first voxel.
///
/// # Returns
/// `(labels, component_count)`
pub fn connected_components_box(binary: ArrayView3<f32>) -> (Array3<u32>, u32) {
    let shape = binary.dim();
    let neighborhood = Neighborhood::unit_box(shape.0 > 1);
    let mut labels = Array3::<u32>::zeros(shape);
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for ((z, y, x), &v) in binary.indexed_iter() {
        if v == 0.0 || labels[[z, y, x]] != 0 {
            continue;
        }

        count += 1;
        labels[[z, y, x]] = count;
        queue.push_back([z, y, x]);

        // Flood the component
        while let Some(voxel) = queue.pop_front() {
            for &offset in neighborhood.offsets() {
                if let Some(n) = offset_index(voxel, offset, shape) {
                    if binary[n] != 0.0 && labels[n] == 0 {
                        labels[n] = count;
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    (labels, count)
}

/// Grow labeled seeds through a foreground mask.
///
/// Seeds are the nonzero voxels of `seeds` that also lie inside `mask`; each
/// connected seed blob gets its own id. Labels then advance one voxel per
/// step, alternating box and face-connected steps so the front approximates a
/// Euclidean distance front. Growth never leaves the mask, so a foreground
/// component that holds no seed stays 0. A voxel reached by several labels in
/// the same step takes the smallest id.
///
/// # Returns
/// `(label buffer as f32 ids, label count)`
pub fn masked_voronoi_labeling(seeds: &VoxelBuffer, mask: &VoxelBuffer) -> Result<(VoxelBuffer, u32)> {
    seeds.ensure_same_dims(mask)?;

    let mask_view = mask.view();
    let masked_seeds = Zip::from(seeds.view())
        .and(mask_view)
        .par_map_collect(|&s, &m| if s != 0.0 && m != 0.0 { 1.0f32 } else { 0.0 });
    let (mut labels, count) = connected_components_box(masked_seeds.view());

    if count > 0 {
        let shape = labels.dim();
        let is_3d = shape.0 > 1;
        let steps = [Neighborhood::unit_box(is_3d), Neighborhood::diamond(is_3d)];
        let mut step = 0usize;

        loop {
            let neighborhood = &steps[step % 2];
            let current = labels.view();
            let grown = Zip::indexed(current)
                .and(mask_view)
                .par_map_collect(|(z, y, x), &label, &m| {
                    if label != 0 || m == 0.0 {
                        return label;
                    }
                    neighborhood
                        .offsets()
                        .iter()
                        .filter_map(|&offset| offset_index([z, y, x], offset, shape))
                        .map(|n| current[n])
                        .filter(|&l| l != 0)
                        .min()
                        .unwrap_or(0)
                });

            let changed = grown != labels;
            labels = grown;
            // A stalled box step means nothing is reachable at all
            if !changed && step % 2 == 0 {
                break;
            }
            step += 1;
        }
    }

    let data = labels.mapv(|l| l as f32);
    Ok((VoxelBuffer::with_type(data, DataType::F32), count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Dims;

    fn mask_from(rows: &[&str]) -> VoxelBuffer {
        let height = rows.len();
        let width = rows[0].len();
        VoxelBuffer::from_fn(Dims::new_2d(width, height), DataType::U8, |x, y, _| {
            if rows[y].as_bytes()[x] == b'#' {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_components_diagonal_joins() {
        let mask = mask_from(&["#...", ".#..", "...#"]);
        let (labels, count) = connected_components_box(mask.view());

        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0, 0]], 1);
        assert_eq!(labels[[0, 1, 1]], 1);
        assert_eq!(labels[[0, 2, 3]], 2);
    }

    #[test]
    fn test_components_scan_order_ids() {
        let mask = mask_from(&["..#", "...", "#.."]);
        let (labels, count) = connected_components_box(mask.view());

        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0, 2]], 1);
        assert_eq!(labels[[0, 2, 0]], 2);
    }

    #[test]
    fn test_components_3d() {
        let mut mask = VoxelBuffer::zeros(Dims::new_3d(3, 3, 3), DataType::U8);
        mask.set(0, 0, 0, 1.0);
        mask.set(1, 1, 1, 1.0);
        mask.set(2, 2, 2, 1.0);
        let (_, count) = connected_components_box(mask.view());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_voronoi_splits_between_seeds() {
        let mask = mask_from(&["#######"]);
        let mut seeds = VoxelBuffer::zeros(mask.dims(), DataType::U8);
        seeds.set(0, 0, 0, 1.0);
        seeds.set(6, 0, 0, 1.0);

        let (labels, count) = masked_voronoi_labeling(&seeds, &mask).unwrap();

        assert_eq!(count, 2);
        let ids: Vec<f32> = labels.view().iter().copied().collect();
        // Middle voxel is equidistant and takes the smaller id
        assert_eq!(ids, vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_voronoi_stays_inside_mask() {
        let mask = mask_from(&["###..###"]);
        let mut seeds = VoxelBuffer::zeros(mask.dims(), DataType::U8);
        seeds.set(0, 0, 0, 1.0);

        let (labels, count) = masked_voronoi_labeling(&seeds, &mask).unwrap();

        assert_eq!(count, 1);
        assert_eq!(labels.count_nonzero(), 3);
        assert_eq!(labels.get(5, 0, 0), 0.0);
    }

    #[test]
    fn test_voronoi_ignores_seeds_outside_mask() {
        let mask = mask_from(&["###...."]);
        let mut seeds = VoxelBuffer::zeros(mask.dims(), DataType::U8);
        seeds.set(1, 0, 0, 1.0);
        seeds.set(5, 0, 0, 1.0);

        let (labels, count) = masked_voronoi_labeling(&seeds, &mask).unwrap();

        assert_eq!(count, 1);
        assert_eq!(labels.count_nonzero(), 3);
    }

    #[test]
    fn test_voronoi_no_seeds_is_all_background() {
        let mask = mask_from(&["####", "####"]);
        let seeds = VoxelBuffer::zeros(mask.dims(), DataType::U8);

        let (labels, count) = masked_voronoi_labeling(&seeds, &mask).unwrap();

        assert_eq!(count, 0);
        assert_eq!(labels.count_nonzero(), 0);
    }

    #[test]
    fn test_voronoi_reaches_diagonal_only_foreground() {
        let mask = mask_from(&["#..", ".#.", "..#"]);
        let mut seeds = VoxelBuffer::zeros(mask.dims(), DataType::U8);
        seeds.set(0, 0, 0, 1.0);

        let (labels, _) = masked_voronoi_labeling(&seeds, &mask).unwrap();

        assert_eq!(labels.get(2, 2, 0), 1.0);
    }
}
