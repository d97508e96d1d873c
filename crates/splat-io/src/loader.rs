//! Turns a columnar [`VertexSource`] into a [`GaussianStore`] (spec.md §4.J).

use splat_linalg::{Mat3, Vec3, Vec4, calc_cov3d, quat_to_mat, vec3, vec4};
use splat_render::{ColorHarmonic, GaussianStore};

use crate::error::LoadError;
use crate::vertex_source::VertexSource;

const REQUIRED_SCALAR: &[&str] = &[
    "x", "y", "z", "rot_0", "rot_1", "rot_2", "rot_3", "scale_0", "scale_1", "scale_2", "opacity",
    "f_dc_0", "f_dc_1", "f_dc_2",
];

fn f_rest_name(i: usize) -> String {
    format!("f_rest_{i}")
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Loads vertex streams into primitive stores, applying the post-processing
/// spec.md §4.J requires of the core (the raw stored fields are "pre-
/// activation": log-scale, logit-opacity, un-normalized quaternion, raw SH).
#[derive(Clone, Copy, Debug)]
pub struct GaussianLoader {
    /// Truncates SH evaluation to this degree (supplement: spec.md §9 open
    /// question, decided in DESIGN.md). Defaults to the full degree-3
    /// reference behavior.
    pub sh_degree: u8,
}

impl Default for GaussianLoader {
    fn default() -> Self {
        Self { sh_degree: 3 }
    }
}

impl GaussianLoader {
    pub fn new(sh_degree: u8) -> Self {
        Self { sh_degree }
    }

    /// Reads every vertex out of `source` into a [`GaussianStore`].
    ///
    /// # Errors
    /// Returns [`LoadError::MissingProperty`] if any required column is
    /// absent from `source`.
    pub fn load(&self, source: &dyn VertexSource) -> Result<GaussianStore, LoadError> {
        let _span = tracing::trace_span!("gaussian_loader_load", count = source.count()).entered();

        let mut scalars = Vec::with_capacity(REQUIRED_SCALAR.len());
        for &name in REQUIRED_SCALAR {
            scalars.push(require(source, name)?);
        }
        let mut iter = scalars.into_iter();
        let x = iter.next().unwrap();
        let y = iter.next().unwrap();
        let z = iter.next().unwrap();
        let rot_0 = iter.next().unwrap();
        let rot_1 = iter.next().unwrap();
        let rot_2 = iter.next().unwrap();
        let rot_3 = iter.next().unwrap();
        let scale_0 = iter.next().unwrap();
        let scale_1 = iter.next().unwrap();
        let scale_2 = iter.next().unwrap();
        let opacity = iter.next().unwrap();
        let f_dc_0 = iter.next().unwrap();
        let f_dc_1 = iter.next().unwrap();
        let f_dc_2 = iter.next().unwrap();

        let mut f_rest = Vec::with_capacity(45);
        for i in 0..45 {
            f_rest.push(require(source, &f_rest_name(i))?);
        }

        let count = source.count();
        log::info!("loading {count} gaussian primitives");

        let mut xyz = Vec::with_capacity(count);
        let mut cov3d = Vec::with_capacity(count);
        let mut color = Vec::with_capacity(count);

        for i in 0..count {
            xyz.push(Vec4::point(x[i], y[i], z[i]));

            let quat = vec4(rot_0[i], rot_1[i], rot_2[i], rot_3[i]).normalized();
            let rot: Mat3 = quat_to_mat(quat);
            let scale = vec3(scale_0[i].exp(), scale_1[i].exp(), scale_2[i].exp());
            cov3d.push(calc_cov3d(scale, &rot));

            let mut sh = [Vec3::ZERO; 16];
            sh[0] = vec3(f_dc_0[i], f_dc_1[i], f_dc_2[i]);
            for k in 1..16 {
                let j = k - 1;
                sh[k] = vec3(f_rest[j][i], f_rest[j + 15][i], f_rest[j + 30][i]);
            }
            color.push(ColorHarmonic::with_degree(sh, sigmoid(opacity[i]), self.sh_degree));
        }

        Ok(GaussianStore::new(xyz, cov3d, color))
    }
}

fn require<'a>(source: &'a dyn VertexSource, name: &str) -> Result<&'a [f32], LoadError> {
    source
        .property_f32(name)
        .ok_or_else(|| LoadError::MissingProperty(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::HashMap;

    struct MapSource {
        count: usize,
        columns: HashMap<String, Vec<f32>>,
    }

    impl VertexSource for MapSource {
        fn count(&self) -> usize {
            self.count
        }

        fn property_f32(&self, name: &str) -> Option<&[f32]> {
            self.columns.get(name).map(std::vec::Vec::as_slice)
        }
    }

    fn single_vertex_source() -> MapSource {
        let mut columns = HashMap::new();
        columns.insert("x".to_string(), vec![1.0]);
        columns.insert("y".to_string(), vec![2.0]);
        columns.insert("z".to_string(), vec![3.0]);
        columns.insert("rot_0".to_string(), vec![1.0]);
        columns.insert("rot_1".to_string(), vec![0.0]);
        columns.insert("rot_2".to_string(), vec![0.0]);
        columns.insert("rot_3".to_string(), vec![0.0]);
        columns.insert("scale_0".to_string(), vec![0.0]);
        columns.insert("scale_1".to_string(), vec![0.0]);
        columns.insert("scale_2".to_string(), vec![0.0]);
        columns.insert("opacity".to_string(), vec![0.0]);
        columns.insert("f_dc_0".to_string(), vec![1.0]);
        columns.insert("f_dc_1".to_string(), vec![0.0]);
        columns.insert("f_dc_2".to_string(), vec![0.0]);
        for i in 0..45 {
            columns.insert(f_rest_name(i), vec![0.0]);
        }
        MapSource { count: 1, columns }
    }

    #[test]
    fn loads_a_single_vertex_with_expected_post_processing() {
        let source = single_vertex_source();
        let store = GaussianLoader::default().load(&source).unwrap();
        assert_eq!(store.len(), 1);
        let p = store.xyz(0);
        assert_approx_eq!(p.x, 1.0);
        assert_approx_eq!(p.y, 2.0);
        assert_approx_eq!(p.z, 3.0);
        assert_approx_eq!(p.w, 1.0);

        // scale_* all zero -> exp(0) = 1 -> cov3d = identity rotation's
        // diag(1,1,1) = identity.
        let cov = store.cov3d(0);
        assert_approx_eq!(cov[0][0], 1.0);
        assert_approx_eq!(cov[1][1], 1.0);
        assert_approx_eq!(cov[2][2], 1.0);

        // opacity raw 0.0 -> sigmoid(0) = 0.5.
        assert_approx_eq!(store.color(0).opacity, 0.5);
    }

    #[test]
    fn missing_property_is_reported() {
        let mut source = single_vertex_source();
        source.columns.remove("f_dc_0");
        let err = GaussianLoader::default().load(&source).unwrap_err();
        assert!(matches!(err, LoadError::MissingProperty(name) if name == "f_dc_0"));
    }

    #[test]
    fn sh_rest_packs_into_three_interleaved_channel_blocks() {
        let mut source = single_vertex_source();
        source.columns.insert(f_rest_name(0), vec![10.0]);
        source.columns.insert(f_rest_name(15), vec![20.0]);
        source.columns.insert(f_rest_name(30), vec![30.0]);
        let store = GaussianLoader::new(3).load(&source).unwrap();
        // triple[1] = (f_rest_0, f_rest_15, f_rest_30), pre-scaled by the SH
        // basis constant for index 1.
        let basis_1 = 0.488_602_51;
        assert_approx_eq!(store.color(0).sh_coeff(1).x, 10.0 * basis_1, 1e-4);
        assert_approx_eq!(store.color(0).sh_coeff(1).y, 20.0 * basis_1, 1e-4);
        assert_approx_eq!(store.color(0).sh_coeff(1).z, 30.0 * basis_1, 1e-4);
    }
}
