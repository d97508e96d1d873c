//! 3D -> 2D Gaussian splat projection (EWA approximation).

use splat_linalg::{Mat3, Vec4, vec3};

use crate::camera::Camera;

/// The projected screen-space footprint of one primitive: an inverse 2D
/// covariance `(A, B, C)` (so the Gaussian power at screen offset `(cx,cy)`
/// is `-(A*cx^2 + C*cy^2)/2 - B*cx*cy`), its 3-sigma pixel extents, its
/// screen-space center, and whether it lies behind the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotData {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub x_c: f32,
    pub y_c: f32,
    pub x_r: f32,
    pub y_r: f32,
    pub behind: bool,
}

impl PlotData {
    /// Projects a primitive already transformed into camera space
    /// (`g_cam`, homogeneous) with world-space covariance `cov3d`.
    pub fn new(camera: &Camera, g_cam: Vec4, cov3d: Mat3) -> Self {
        let z = g_cam.z;
        let limx = 1.3 * camera.htanx() * z;
        let limy = 1.3 * camera.htany() * z;
        let x = g_cam.x.clamp(-limx, limx);
        let y = g_cam.y.clamp(-limy, limy);
        let z2 = z * z;
        let f = camera.f();

        // EWA Jacobian, linearizing the perspective projection around the
        // primitive center (third row is the standard approximation that
        // drops the projective divide's contribution to depth).
        let jacobian = Mat3::from_rows(
            vec3(f / z, 0.0, 0.0),
            vec3(0.0, f / z, 0.0),
            vec3(-f * x / z2, -f * y / z2, 0.0),
        );

        // j_r3 = J * R3, via `mat_mul_t(R3^T)` so the result equals J * R3
        // without materializing an extra transpose of J.
        let j_r3 = jacobian.mat_mul_t(&camera.r3_t());
        // screen_cov = j_r3 * cov3d * j_r3^T (cov3d is symmetric, so
        // `mat_mul_t(cov3d)` below equals `j_r3 * cov3d^T` = `j_r3 * cov3d`).
        let screen_cov = j_r3.mat_mul_t(&cov3d).mat_mul_t(&j_r3);

        let cov00 = 0.3 + screen_cov[0][0];
        let cov01 = screen_cov[0][1];
        let cov11 = 0.3 + screen_cov[1][1];

        let det = cov00 * cov11 - cov01 * cov01;
        let det_inv = 1.0 / det;

        let a = cov11 * det_inv;
        let b = -cov01 * det_inv;
        let c = cov00 * det_inv;

        let x_r = 3.0 * cov00.sqrt();
        let y_r = 3.0 * cov11.sqrt();

        let image_coord = camera.p_mat().mat_mul_vec(g_cam);
        let x_c = image_coord.x / image_coord.z;
        let y_c = image_coord.y / image_coord.z;
        let behind = image_coord.z <= 0.0;

        Self {
            a,
            b,
            c,
            x_c,
            y_c,
            x_r,
            y_r,
            behind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_linalg::{diag3, vec4};

    /// §8.1 -- any in-front-of-camera primitive projects to a
    /// positive-definite inverse covariance.
    #[test]
    fn in_front_projects_positive_definite() {
        let camera = Camera::new(64, 64, std::f32::consts::FRAC_PI_2);
        let cov = diag3(vec3(0.02, 0.02, 0.02));
        for z in [0.5, 1.0, 5.0, 50.0] {
            let g_cam = vec4(0.3, -0.2, z, 1.0);
            let plot = PlotData::new(&camera, g_cam, cov);
            assert!(plot.a > 0.0, "A must be positive at z={z}");
            assert!(plot.c > 0.0, "C must be positive at z={z}");
            assert!(
                plot.a * plot.c - plot.b * plot.b > 0.0,
                "2x2 inverse covariance must be positive-definite at z={z}"
            );
        }
    }

    #[test]
    fn behind_camera_flagged() {
        let camera = Camera::new(64, 64, std::f32::consts::FRAC_PI_2);
        let cov = diag3(vec3(0.02, 0.02, 0.02));
        let plot = PlotData::new(&camera, vec4(0.0, 0.0, -5.0, 1.0), cov);
        assert!(plot.behind);
    }

    #[test]
    fn center_splat_projects_to_image_center() {
        let camera = Camera::new(64, 64, std::f32::consts::FRAC_PI_2);
        let cov = diag3(vec3(0.01, 0.01, 0.01));
        let plot = PlotData::new(&camera, vec4(0.0, 0.0, 2.0, 1.0), cov);
        assert!((plot.x_c - 32.0).abs() < 1e-3);
        assert!((plot.y_c - 32.0).abs() < 1e-3);
        assert!(!plot.behind);
    }
}
