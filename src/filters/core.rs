//! Core utilities shared by the voxel kernels.
//!
//! This module provides:
//! - Gaussian kernel generation
//! - Box / sphere neighborhood offsets
//! - Neighborhood reduction (the engine behind rank and morphology filters)
//! - Separable per-axis convolution

use ndarray::{Array3, ArrayView3, Zip};

/// Generate a 1D Gaussian kernel.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Structuring element shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Box,
    Sphere,
}

/// Offsets `(dz, dy, dx)` of a structuring element, center included.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    offsets: Vec<[isize; 3]>,
}

impl Neighborhood {
    /// Box or ellipsoid with integer half-extents `[z, y, x]`.
    ///
    /// An axis with extent 0 contributes only its center plane.
    pub fn new(extents: [usize; 3], shape: Shape) -> Self {
        Neighborhood::clipped(extents, shape, (usize::MAX, usize::MAX, usize::MAX))
    }

    /// Element for a buffer of dimension `bounds` `(z, y, x)`.
    ///
    /// Offsets at or beyond a buffer extent can never hit a voxel and are left
    /// out. A sphere keeps the outline of its full ellipsoid.
    pub fn clipped(extents: [usize; 3], shape: Shape, bounds: (usize, usize, usize)) -> Self {
        let limits = [bounds.0, bounds.1, bounds.2];
        let [rz, ry, rx] = [0, 1, 2].map(|axis| extents[axis].min(limits[axis].saturating_sub(1)) as isize);
        let [ez, ey, ex] = extents.map(|e| e as isize);
        let term = |d: isize, e: isize| {
            if e == 0 {
                0.0
            } else {
                let t = d as f32 / e as f32;
                t * t
            }
        };

        let mut offsets = Vec::new();
        for dz in -rz..=rz {
            for dy in -ry..=ry {
                for dx in -rx..=rx {
                    let inside = match shape {
                        Shape::Box => true,
                        Shape::Sphere => term(dz, ez) + term(dy, ey) + term(dx, ex) <= 1.0 + 1e-6,
                    };
                    if inside {
                        offsets.push([dz, dy, dx]);
                    }
                }
            }
        }

        Neighborhood { offsets }
    }

    /// Face-connected neighbors (4 in 2D, 6 in 3D) plus the center.
    pub fn diamond(is_3d: bool) -> Self {
        let mut offsets = vec![[0, 0, 0], [0, -1, 0], [0, 1, 0], [0, 0, -1], [0, 0, 1]];
        if is_3d {
            offsets.push([-1, 0, 0]);
            offsets.push([1, 0, 0]);
        }
        Neighborhood { offsets }
    }

    /// Every voxel touching the center (8 in 2D, 26 in 3D) plus the center.
    pub fn unit_box(is_3d: bool) -> Self {
        Neighborhood::new([is_3d as usize, 1, 1], Shape::Box)
    }

    pub fn offsets(&self) -> &[[isize; 3]] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Index of `origin + offset`, or `None` when it falls outside `shape`.
#[inline]
pub fn offset_index(
    origin: [usize; 3],
    offset: [isize; 3],
    shape: (usize, usize, usize),
) -> Option<[usize; 3]> {
    let z = origin[0] as isize + offset[0];
    let y = origin[1] as isize + offset[1];
    let x = origin[2] as isize + offset[2];
    if z < 0 || y < 0 || x < 0 {
        return None;
    }
    let (z, y, x) = (z as usize, y as usize, x as usize);
    if z >= shape.0 || y >= shape.1 || x >= shape.2 {
        return None;
    }
    Some([z, y, x])
}

/// Apply `reduce` to the in-bounds samples under `neighborhood` at every voxel.
///
/// Out-of-bounds offsets are skipped, so border voxels see a clipped element.
pub fn reduce_neighborhood<F>(
    input: ArrayView3<f32>,
    neighborhood: &Neighborhood,
    reduce: F,
) -> Array3<f32>
where
    F: Fn(&mut Vec<f32>) -> f32 + Sync + Send,
{
    let shape = input.dim();
    let mut output = Array3::<f32>::zeros(shape);

    Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
        let mut values = Vec::with_capacity(neighborhood.len());
        for &offset in neighborhood.offsets() {
            if let Some(idx) = offset_index([z, y, x], offset, shape) {
                values.push(input[idx]);
            }
        }
        *out = reduce(&mut values);
    });

    output
}

/// Convolve along one axis (0 = z, 1 = y, 2 = x) with clamp-to-edge borders.
pub fn convolve_axis(input: ArrayView3<f32>, kernel: &[f32], axis: usize) -> Array3<f32> {
    let shape = input.dim();
    let len = [shape.0, shape.1, shape.2][axis] as isize;
    let half = (kernel.len() / 2) as isize;
    let mut output = Array3::<f32>::zeros(shape);

    Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
        let mut idx = [z, y, x];
        let center = idx[axis] as isize;
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            idx[axis] = (center + ki as isize - half).clamp(0, len - 1) as usize;
            sum += input[idx] * kv;
        }
        *out = sum;
    });

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_normalized_and_odd() {
        let kernel = gaussian_kernel_1d(1.5);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len() % 2, 1);
    }

    #[test]
    fn test_zero_sigma_is_identity_kernel() {
        assert_eq!(gaussian_kernel_1d(0.0), vec![1.0]);
    }

    #[test]
    fn test_sphere_smaller_than_box() {
        let sphere = Neighborhood::new([0, 2, 2], Shape::Sphere);
        let boxed = Neighborhood::new([0, 2, 2], Shape::Box);
        assert_eq!(boxed.len(), 25);
        assert_eq!(sphere.len(), 13);
    }

    #[test]
    fn test_clipped_element_fits_the_buffer() {
        let boxed = Neighborhood::clipped([1000, 1000, 1000], Shape::Box, (3, 4, 4));
        assert_eq!(boxed.len(), 5 * 7 * 7);

        // A huge sphere covers the whole reachable window
        let sphere = Neighborhood::clipped([0, 1000, 1000], Shape::Sphere, (1, 3, 3));
        assert_eq!(sphere.len(), 25);
    }

    #[test]
    fn test_clipping_keeps_sphere_outline() {
        let clipped = Neighborhood::clipped([0, 2, 2], Shape::Sphere, (1, 3, 3));
        let full = Neighborhood::new([0, 2, 2], Shape::Sphere);
        assert_eq!(clipped.offsets(), full.offsets());
    }

    #[test]
    fn test_diamond_counts() {
        assert_eq!(Neighborhood::diamond(false).len(), 5);
        assert_eq!(Neighborhood::diamond(true).len(), 7);
        assert_eq!(Neighborhood::unit_box(true).len(), 27);
    }

    #[test]
    fn test_offset_index_bounds() {
        let shape = (1, 3, 3);
        assert_eq!(offset_index([0, 0, 0], [0, -1, 0], shape), None);
        assert_eq!(offset_index([0, 2, 2], [0, 0, 1], shape), None);
        assert_eq!(offset_index([0, 1, 1], [0, 1, -1], shape), Some([0, 2, 0]));
    }

    #[test]
    fn test_convolve_axis_preserves_constant() {
        let input = Array3::<f32>::from_elem((1, 4, 6), 3.0);
        let kernel = gaussian_kernel_1d(1.0);
        let result = convolve_axis(input.view(), &kernel, 2);
        assert!(result.iter().all(|&v| (v - 3.0).abs() < 1e-4));
    }
}
