//! Fixed-size vector and matrix types used by the splatting pipeline.
//!
//! Every shape that occurs in the renderer is 3- or 4-dimensional, so this
//! crate deliberately does not reach for a generic numeric library: `Vec3`,
//! `Vec4`, `Mat3` and `Mat4` are concrete value types with plain `f32` fields.
//! All arithmetic accumulates left-to-right in `f32`; no Kahan or pairwise
//! summation is performed anywhere in this crate.

use std::ops::{Add, Div, Index, IndexMut, Mul, Sub};

use bytemuck::{Pod, Zeroable};

/// A 3D vector (also used for colors and scale factors).
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A homogeneous 4D vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

pub const fn vec3(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3 { x, y, z }
}

pub const fn vec4(x: f32, y: f32, z: f32, w: f32) -> Vec4 {
    Vec4 { x, y, z, w }
}

impl Vec3 {
    pub const ZERO: Vec3 = vec3(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = vec3(1.0, 1.0, 1.0);

    pub const fn splat(v: f32) -> Vec3 {
        vec3(v, v, v)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        (self * other).sum()
    }

    pub fn squared(self) -> Vec3 {
        vec3(self.x * self.x, self.y * self.y, self.z * self.z)
    }

    pub fn sum(self) -> f32 {
        self.x + self.y + self.z
    }

    pub fn norm2(self) -> f32 {
        self.squared().sum()
    }

    pub fn normalized(self) -> Vec3 {
        self / self.norm2().sqrt()
    }

    pub fn exp(self) -> Vec3 {
        vec3(self.x.exp(), self.y.exp(), self.z.exp())
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        vec3(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        vec3(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn clamp01(self) -> Vec3 {
        self.max(Vec3::ZERO).min(Vec3::ONE)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Vec4 {
    pub const fn point(x: f32, y: f32, z: f32) -> Vec4 {
        vec4(x, y, z, 1.0)
    }

    pub const fn direction(x: f32, y: f32, z: f32) -> Vec4 {
        vec4(x, y, z, 0.0)
    }

    pub fn xyz(self) -> Vec3 {
        vec3(self.x, self.y, self.z)
    }

    pub fn dot(self, other: Vec4) -> f32 {
        (self * other).sum()
    }

    pub fn squared(self) -> Vec4 {
        vec4(self.x * self.x, self.y * self.y, self.z * self.z, self.w * self.w)
    }

    pub fn sum(self) -> f32 {
        self.x + self.y + self.z + self.w
    }

    pub fn norm2(self) -> f32 {
        self.squared().sum()
    }

    pub fn normalized(self) -> Vec4 {
        self / self.norm2().sqrt()
    }

    pub fn min(self, other: Vec4) -> Vec4 {
        vec4(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
            self.w.min(other.w),
        )
    }

    pub fn max(self, other: Vec4) -> Vec4 {
        vec4(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
            self.w.max(other.w),
        )
    }
}

macro_rules! impl_vec_ops {
    ($t:ty, $($f:ident),+) => {
        impl Add for $t {
            type Output = $t;
            fn add(self, rhs: $t) -> $t {
                Self { $($f: self.$f + rhs.$f),+ }
            }
        }
        impl Sub for $t {
            type Output = $t;
            fn sub(self, rhs: $t) -> $t {
                Self { $($f: self.$f - rhs.$f),+ }
            }
        }
        impl Mul for $t {
            type Output = $t;
            fn mul(self, rhs: $t) -> $t {
                Self { $($f: self.$f * rhs.$f),+ }
            }
        }
        impl Div for $t {
            type Output = $t;
            fn div(self, rhs: $t) -> $t {
                Self { $($f: self.$f / rhs.$f),+ }
            }
        }
        impl Mul<f32> for $t {
            type Output = $t;
            fn mul(self, rhs: f32) -> $t {
                Self { $($f: self.$f * rhs),+ }
            }
        }
        impl Div<f32> for $t {
            type Output = $t;
            fn div(self, rhs: f32) -> $t {
                Self { $($f: self.$f / rhs),+ }
            }
        }
        impl Add<f32> for $t {
            type Output = $t;
            fn add(self, rhs: f32) -> $t {
                Self { $($f: self.$f + rhs),+ }
            }
        }
    };
}

impl_vec_ops!(Vec3, x, y, z);
impl_vec_ops!(Vec4, x, y, z, w);

impl Index<usize> for Vec3 {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of bounds: {i}"),
        }
    }
}

impl Index<usize> for Vec4 {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            3 => &self.w,
            _ => panic!("Vec4 index out of bounds: {i}"),
        }
    }
}

/// A 3x3 matrix, stored as three rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat3 {
    pub rows: [Vec3; 3],
}

/// A 4x4 matrix, stored as four rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat4 {
    pub rows: [Vec4; 4],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        rows: [vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0)],
    };

    pub const fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Mat3 {
        Mat3 { rows: [r0, r1, r2] }
    }

    pub fn transpose(&self) -> Mat3 {
        let r = &self.rows;
        Mat3::from_rows(
            vec3(r[0].x, r[1].x, r[2].x),
            vec3(r[0].y, r[1].y, r[2].y),
            vec3(r[0].z, r[1].z, r[2].z),
        )
    }

    /// `self * other^T`, row i dotted against row j of `other`.
    pub fn mat_mul_t(&self, other: &Mat3) -> Mat3 {
        Mat3::from_rows(
            vec3(
                self.rows[0].dot(other.rows[0]),
                self.rows[0].dot(other.rows[1]),
                self.rows[0].dot(other.rows[2]),
            ),
            vec3(
                self.rows[1].dot(other.rows[0]),
                self.rows[1].dot(other.rows[1]),
                self.rows[1].dot(other.rows[2]),
            ),
            vec3(
                self.rows[2].dot(other.rows[0]),
                self.rows[2].dot(other.rows[1]),
                self.rows[2].dot(other.rows[2]),
            ),
        )
    }

    pub fn mat_mul(&self, other: &Mat3) -> Mat3 {
        self.mat_mul_t(&other.transpose())
    }

    pub fn mat_mul_vec(&self, v: Vec3) -> Vec3 {
        vec3(self.rows[0].dot(v), self.rows[1].dot(v), self.rows[2].dot(v))
    }

    /// Multiplies columns by a diagonal vector: `self * diag(v)`.
    pub fn mat_mul_diag(&self, v: Vec3) -> Mat3 {
        Mat3::from_rows(self.rows[0] * v, self.rows[1] * v, self.rows[2] * v)
    }

    pub fn row(&self, i: usize) -> Vec3 {
        self.rows[i]
    }
}

impl Index<usize> for Mat3 {
    type Output = Vec3;
    fn index(&self, i: usize) -> &Vec3 {
        &self.rows[i]
    }
}

impl IndexMut<usize> for Mat3 {
    fn index_mut(&mut self, i: usize) -> &mut Vec3 {
        &mut self.rows[i]
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        rows: [
            vec4(1.0, 0.0, 0.0, 0.0),
            vec4(0.0, 1.0, 0.0, 0.0),
            vec4(0.0, 0.0, 1.0, 0.0),
            vec4(0.0, 0.0, 0.0, 1.0),
        ],
    };

    pub const fn from_rows(r0: Vec4, r1: Vec4, r2: Vec4, r3: Vec4) -> Mat4 {
        Mat4 { rows: [r0, r1, r2, r3] }
    }

    pub fn transpose(&self) -> Mat4 {
        let r = &self.rows;
        Mat4::from_rows(
            vec4(r[0].x, r[1].x, r[2].x, r[3].x),
            vec4(r[0].y, r[1].y, r[2].y, r[3].y),
            vec4(r[0].z, r[1].z, r[2].z, r[3].z),
            vec4(r[0].w, r[1].w, r[2].w, r[3].w),
        )
    }

    pub fn mat_mul_t(&self, other: &Mat4) -> Mat4 {
        let mut out = Mat4::default();
        for i in 0..4 {
            out.rows[i] = vec4(
                self.rows[i].dot(other.rows[0]),
                self.rows[i].dot(other.rows[1]),
                self.rows[i].dot(other.rows[2]),
                self.rows[i].dot(other.rows[3]),
            );
        }
        out
    }

    pub fn mat_mul(&self, other: &Mat4) -> Mat4 {
        self.mat_mul_t(&other.transpose())
    }

    pub fn mat_mul_vec(&self, v: Vec4) -> Vec4 {
        vec4(
            self.rows[0].dot(v),
            self.rows[1].dot(v),
            self.rows[2].dot(v),
            self.rows[3].dot(v),
        )
    }

    /// Upper-left 3x3 block.
    pub fn block3(&self) -> Mat3 {
        Mat3::from_rows(
            vec3(self.rows[0].x, self.rows[0].y, self.rows[0].z),
            vec3(self.rows[1].x, self.rows[1].y, self.rows[1].z),
            vec3(self.rows[2].x, self.rows[2].y, self.rows[2].z),
        )
    }

    pub fn row(&self, i: usize) -> Vec4 {
        self.rows[i]
    }

    /// The translation implied by this rigid transform, i.e. column 3.
    pub fn column3(&self) -> Vec4 {
        vec4(self.rows[0].w, self.rows[1].w, self.rows[2].w, self.rows[3].w)
    }
}

impl Index<usize> for Mat4 {
    type Output = Vec4;
    fn index(&self, i: usize) -> &Vec4 {
        &self.rows[i]
    }
}

/// Builds a diagonal 3x3 matrix from a vector.
pub fn diag3(v: Vec3) -> Mat3 {
    Mat3::from_rows(
        vec3(v.x, 0.0, 0.0),
        vec3(0.0, v.y, 0.0),
        vec3(0.0, 0.0, v.z),
    )
}

/// Builds a diagonal 4x4 matrix from a vector.
pub fn diag4(v: Vec4) -> Mat4 {
    Mat4::from_rows(
        vec4(v.x, 0.0, 0.0, 0.0),
        vec4(0.0, v.y, 0.0, 0.0),
        vec4(0.0, 0.0, v.z, 0.0),
        vec4(0.0, 0.0, 0.0, v.w),
    )
}

/// Converts a unit quaternion `(w, x, y, z)` into its rotation matrix.
///
/// The caller must pass a normalized quaternion; this function does not
/// normalize for you (callers that load from disk normalize first, see
/// `splat-io`).
pub fn quat_to_mat(q: Vec4) -> Mat3 {
    // Vec4's (x, y, z, w) fields hold (w, x, y, z) of the quaternion.
    let (q0, q1, q2, q3) = (q.x, q.y, q.z, q.w);
    Mat3::from_rows(
        vec3(
            2.0 * (q0 * q0 + q1 * q1) - 1.0,
            2.0 * (q1 * q2 - q0 * q3),
            2.0 * (q1 * q3 + q0 * q2),
        ),
        vec3(
            2.0 * (q1 * q2 + q0 * q3),
            2.0 * (q0 * q0 + q2 * q2) - 1.0,
            2.0 * (q2 * q3 - q0 * q1),
        ),
        vec3(
            2.0 * (q1 * q3 - q0 * q2),
            2.0 * (q2 * q3 + q0 * q1),
            2.0 * (q0 * q0 + q3 * q3) - 1.0,
        ),
    )
}

/// `R^T * diag(scale^2) * R`, the world-space covariance of a scaled,
/// rotated Gaussian. `scale` is already in linear units (exponentiated).
pub fn calc_cov3d(scale: Vec3, rot: &Mat3) -> Mat3 {
    let rot_t = rot.transpose();
    rot_t.mat_mul_diag(scale.squared()).mat_mul_t(&rot_t)
}
