//! Columnar primitive storage.
//!
//! `(xyz, cov3d, color)` are parallel arrays indexed by a common primitive
//! index, never reordered in place -- sort order lives entirely in index
//! permutations (spec.md §9).

use splat_linalg::{Mat3, Vec4};

use crate::color::ColorHarmonic;

/// Struct-of-arrays over `N` Gaussian primitives.
#[derive(Clone, Debug, Default)]
pub struct GaussianStore {
    xyz: Vec<Vec4>,
    cov3d: Vec<Mat3>,
    color: Vec<ColorHarmonic>,
}

impl GaussianStore {
    /// Builds a store from three equal-length columns.
    ///
    /// # Panics
    /// Panics if the three columns do not have the same length -- this is a
    /// construction-time invariant, not a runtime error condition (spec.md
    /// §3: "all three vectors have the same length").
    pub fn new(xyz: Vec<Vec4>, cov3d: Vec<Mat3>, color: Vec<ColorHarmonic>) -> Self {
        assert_eq!(xyz.len(), cov3d.len(), "xyz/cov3d column length mismatch");
        assert_eq!(xyz.len(), color.len(), "xyz/color column length mismatch");
        Self { xyz, cov3d, color }
    }

    pub fn len(&self) -> usize {
        self.xyz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyz.is_empty()
    }

    pub fn xyz(&self, i: usize) -> Vec4 {
        self.xyz[i]
    }

    pub fn cov3d(&self, i: usize) -> Mat3 {
        self.cov3d[i]
    }

    pub fn color(&self, i: usize) -> ColorHarmonic {
        self.color[i]
    }

    pub fn xyz_slice(&self) -> &[Vec4] {
        &self.xyz
    }

    pub fn cov3d_slice(&self) -> &[Mat3] {
        &self.cov3d
    }

    pub fn color_slice(&self) -> &[ColorHarmonic] {
        &self.color
    }

    /// Elementwise min/max bounds over a set of positions.
    pub fn range(xyz: &[Vec4]) -> (Vec4, Vec4) {
        let mut lo = Vec4::point(f32::MAX, f32::MAX, f32::MAX);
        let mut hi = Vec4::point(f32::MIN, f32::MIN, f32::MIN);
        for &p in xyz {
            lo = lo.min(p);
            hi = hi.max(p);
        }
        (lo, hi)
    }
}
