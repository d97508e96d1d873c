//! View-evaluated color: degree-3 real spherical harmonics.
//!
//! Basis constants match the standard real-SH normalization up to `l=3`
//! (the same constants a Gaussian-splatting point cloud stores its
//! `f_dc_*`/`f_rest_*` coefficients against).

use splat_linalg::Vec3;

/// The 16 real-SH basis constants for degrees 0..=3, in the fixed
/// coefficient order used throughout this crate.
pub const SH_BASIS: [f32; 16] = [
    0.282_094_79,
    -0.488_602_51,
    0.488_602_51,
    -0.488_602_51,
    1.092_548_4,
    -1.092_548_4,
    0.315_391_57,
    -1.092_548_4,
    0.546_274_21,
    -0.590_043_59,
    2.890_611_4,
    -0.457_045_8,
    0.373_176_33,
    -0.457_045_8,
    1.445_305_7,
    -0.590_043_59,
];

/// A primitive's view-dependent color, stored as 16 pre-scaled RGB
/// coefficients plus a post-sigmoid opacity.
///
/// `sh_degree` lets evaluation stop early (degrees above it are skipped);
/// it defaults to 3, the canonical full-detail behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorHarmonic {
    sh: [Vec3; 16],
    pub opacity: f32,
    pub sh_degree: u8,
}

impl ColorHarmonic {
    /// Builds a `ColorHarmonic` from raw (unscaled) SH coefficients,
    /// pre-multiplying each by its basis constant.
    pub fn new(sh: [Vec3; 16], opacity: f32) -> Self {
        Self::with_degree(sh, opacity, 3)
    }

    /// As [`ColorHarmonic::new`], but evaluation truncates past `sh_degree`.
    pub fn with_degree(mut sh: [Vec3; 16], opacity: f32, sh_degree: u8) -> Self {
        for (coeff, basis) in sh.iter_mut().zip(SH_BASIS) {
            *coeff = *coeff * basis;
        }
        Self {
            sh,
            opacity,
            sh_degree,
        }
    }

    /// The `k`-th pre-scaled SH coefficient triple (for inspection/tests).
    pub fn sh_coeff(&self, k: usize) -> Vec3 {
        self.sh[k]
    }

    /// Evaluates the view-dependent color at the unit direction `dir`
    /// (camera-to-primitive, in world space), summing degree 0..=`sh_degree`
    /// in the fixed order of the real-SH expansion, then offsetting by 0.5
    /// and clamping to `[0, 1]`.
    pub fn eval(&self, dir: Vec3) -> Vec3 {
        let (dx, dy, dz) = (dir.x, dir.y, dir.z);
        let sh = &self.sh;

        let mut color = sh[0];
        if self.sh_degree >= 1 {
            color = color - sh[1] * dy + sh[2] * dz - sh[3] * dx;
        }
        if self.sh_degree >= 2 {
            color = color
                + sh[4] * (dx * dy)
                + sh[5] * (dy * dz)
                + sh[6] * (2.0 * dz * dz - dx * dx - dy * dy)
                + sh[7] * (dx * dz)
                + sh[8] * (dx * dx - dy * dy);
        }
        if self.sh_degree >= 3 {
            color = color
                + sh[9] * (dy * (3.0 * dx * dx - dy * dy))
                + sh[10] * (dx * dy * dz)
                + sh[11] * (dy * (4.0 * dz * dz - dx * dx - dy * dy))
                + sh[12] * (dz * (2.0 * dz * dz - 3.0 * dx * dx - 3.0 * dy * dy))
                + sh[13] * (dx * (4.0 * dz * dz - dx * dx - dy * dy))
                + sh[14] * (dz * (dx * dx - dy * dy))
                + sh[15] * (dx * (dx * dx - 3.0 * dy * dy));
        }
        (color + 0.5).clamp01()
    }
}
