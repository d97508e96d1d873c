//! Pinhole camera: rigid pose accumulation plus fixed intrinsics.

use splat_linalg::{Mat3, Mat4, Vec3, Vec4, vec3, vec4};

/// A single step of a replayable camera pose script (spec.md §9 / supplement
/// 2: the original hardcodes `move_to(...); tilt(-pi/4); tilt(pi/8);
/// move_to(...)` in `main`; here it is data the CLI can accept as a
/// sequence).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraOp {
    Tilt(f32),
    Pan(f32),
    Roll(f32),
    MoveTo(Vec3),
}

/// Camera state: accumulated rotation/translation, cached transposes, and
/// derived intrinsics/projection matrix.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    r_mat4: Mat4,
    r_mat4_t: Mat4,
    r_mat3: Mat3,
    r_mat3_t: Mat3,
    p_mat: Mat4,
    width: u32,
    height: u32,
    fov_x: f32,
    px: f32,
    py: f32,
    htanx: f32,
    htany: f32,
    f: f32,
}

impl Camera {
    /// Constructs a camera at the origin looking down `+z`, with the given
    /// image size and horizontal field of view (radians).
    pub fn new(width: u32, height: u32, fov_x: f32) -> Self {
        let px = width as f32 / 2.0;
        let py = height as f32 / 2.0;
        let htanx = (fov_x / 2.0).tan();
        let htany = htanx * py / px;
        let f = px / htanx;

        let p_mat = Mat4::from_rows(
            vec4(f, 0.0, px, 0.0),
            vec4(0.0, f, py, 0.0),
            vec4(0.0, 0.0, 1.0, 0.0),
            vec4(0.0, 0.0, 0.0, 1.0),
        );

        let mut camera = Self {
            r_mat4: Mat4::IDENTITY,
            r_mat4_t: Mat4::IDENTITY,
            r_mat3: Mat3::IDENTITY,
            r_mat3_t: Mat3::IDENTITY,
            p_mat,
            width,
            height,
            fov_x,
            px,
            py,
            htanx,
            htany,
            f,
        };
        camera.refresh_caches();
        camera
    }

    fn refresh_caches(&mut self) {
        self.r_mat3 = self.r_mat4.block3();
        self.r_mat4_t = self.r_mat4.transpose();
        self.r_mat3_t = self.r_mat3.transpose();
    }

    fn pre_multiply(&mut self, m: Mat4) {
        self.r_mat4 = m.mat_mul(&self.r_mat4);
        self.refresh_caches();
    }

    /// Rotates about the camera-space X axis.
    pub fn tilt(&mut self, rad: f32) {
        let (c, s) = (rad.cos(), rad.sin());
        let rot = Mat4::from_rows(
            vec4(1.0, 0.0, 0.0, 0.0),
            vec4(0.0, c, -s, 0.0),
            vec4(0.0, s, c, 0.0),
            vec4(0.0, 0.0, 0.0, 1.0),
        );
        self.pre_multiply(rot);
    }

    /// Rotates about the camera-space Y axis.
    pub fn pan(&mut self, rad: f32) {
        let (c, s) = (rad.cos(), rad.sin());
        let rot = Mat4::from_rows(
            vec4(c, 0.0, s, 0.0),
            vec4(0.0, 1.0, 0.0, 0.0),
            vec4(-s, 0.0, c, 0.0),
            vec4(0.0, 0.0, 0.0, 1.0),
        );
        self.pre_multiply(rot);
    }

    /// Rotates about the camera-space Z axis.
    pub fn roll(&mut self, rad: f32) {
        let (c, s) = (rad.cos(), rad.sin());
        let rot = Mat4::from_rows(
            vec4(c, -s, 0.0, 0.0),
            vec4(s, c, 0.0, 0.0),
            vec4(0.0, 0.0, 1.0, 0.0),
            vec4(0.0, 0.0, 0.0, 1.0),
        );
        self.pre_multiply(rot);
    }

    /// Translates so the camera origin reaches world position `v`.
    pub fn move_to(&mut self, v: Vec3) {
        let translate = Mat4::from_rows(
            vec4(1.0, 0.0, 0.0, -v.x),
            vec4(0.0, 1.0, 0.0, -v.y),
            vec4(0.0, 0.0, 1.0, -v.z),
            vec4(0.0, 0.0, 0.0, 1.0),
        );
        self.pre_multiply(translate);
    }

    /// Applies a sequence of pose operations in order.
    pub fn apply_script(&mut self, ops: &[CameraOp]) {
        for op in ops {
            match *op {
                CameraOp::Tilt(rad) => self.tilt(rad),
                CameraOp::Pan(rad) => self.pan(rad),
                CameraOp::Roll(rad) => self.roll(rad),
                CameraOp::MoveTo(v) => self.move_to(v),
            }
        }
    }

    /// Transforms a world-space homogeneous position into camera space.
    pub fn to_camera(&self, world: Vec4) -> Vec4 {
        self.r_mat4.mat_mul_vec(world)
    }

    /// World-space camera origin: the 4th column of `R^T`.
    pub fn global_position(&self) -> Vec4 {
        self.r_mat4_t.column3()
    }

    /// World-space depth axis for the distributed partitioner: the world-
    /// space direction whose dot product with a world position reproduces
    /// that position's camera-space `z` (up to the constant translation
    /// term, which does not affect relative order). This is row 2 of `R3`,
    /// *not* `R3` applied to `(0,0,1)` -- those coincide only when `R3` is
    /// symmetric (e.g. the identity), and diverge under a general tilt/pan/
    /// roll. Used to rank-partition primitives from near to far *before*
    /// each worker transforms its own slice into camera space; the single-
    /// worker rasterizer's draw order instead sorts already-camera-space
    /// positions directly against `+z`, which is the same near-to-far
    /// ranking expressed in camera space rather than world space.
    pub fn depth_direction(&self) -> Vec4 {
        let row = self.r_mat3.row(2);
        Vec4::direction(row.x, row.y, row.z)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov_x(&self) -> f32 {
        self.fov_x
    }

    pub fn htanx(&self) -> f32 {
        self.htanx
    }

    pub fn htany(&self) -> f32 {
        self.htany
    }

    pub fn f(&self) -> f32 {
        self.f
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    pub fn py(&self) -> f32 {
        self.py
    }

    pub fn r3(&self) -> Mat3 {
        self.r_mat3
    }

    pub fn r3_t(&self) -> Mat3 {
        self.r_mat3_t
    }

    pub fn p_mat(&self) -> Mat4 {
        self.p_mat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn identity_camera_origin_at_world_origin() {
        let camera = Camera::new(64, 64, std::f32::consts::FRAC_PI_2);
        let origin = camera.global_position();
        assert_approx_eq!(origin.x, 0.0);
        assert_approx_eq!(origin.y, 0.0);
        assert_approx_eq!(origin.z, 0.0);
    }

    #[test]
    fn move_to_updates_global_position() {
        let mut camera = Camera::new(64, 64, std::f32::consts::FRAC_PI_2);
        camera.move_to(vec3(1.0, 2.0, 3.0));
        let origin = camera.global_position();
        assert_approx_eq!(origin.x, 1.0, 1e-5);
        assert_approx_eq!(origin.y, 2.0, 1e-5);
        assert_approx_eq!(origin.z, 3.0, 1e-5);
    }

    #[test]
    fn tilt_then_pan_matches_script_replay() {
        let mut direct = Camera::new(32, 32, 1.0);
        direct.tilt(0.3);
        direct.pan(-0.2);

        let mut scripted = Camera::new(32, 32, 1.0);
        scripted.apply_script(&[CameraOp::Tilt(0.3), CameraOp::Pan(-0.2)]);

        for i in 0..4 {
            for j in 0..4 {
                assert_approx_eq!(direct.r_mat4[i][j], scripted.r_mat4[i][j], 1e-6);
            }
        }
    }

    #[test]
    fn intrinsics_match_image_size() {
        let camera = Camera::new(1000, 1000, std::f32::consts::FRAC_PI_2);
        assert_approx_eq!(camera.px(), 500.0);
        assert_approx_eq!(camera.py(), 500.0);
        assert_approx_eq!(camera.f(), camera.px() / camera.htanx(), 1e-3);
    }
}
