//! CPU projective splatting of 3D anisotropic Gaussian primitives.
//!
//! The pipeline is `camera.transform -> sort::sort_by_depth -> project::
//! PlotData -> raster::draw_gaussians[_parallel]`, accumulating
//! nearest-to-farthest into a single [`framebuffer::Framebuffer`].
//! Distributed composition of several per-worker framebuffers lives in the
//! sibling `splat-distributed` crate; this crate only renders one worker's
//! slice of primitives.

pub mod camera;
pub mod color;
pub mod framebuffer;
pub mod project;
pub mod raster;
pub mod sort;
pub mod store;

pub use camera::{Camera, CameraOp};
pub use color::ColorHarmonic;
pub use framebuffer::Framebuffer;
pub use project::PlotData;
pub use store::GaussianStore;

/// Renders one worker's primitive slice into a fresh framebuffer.
///
/// This is the pipeline described in the crate doc comment: depth-sort
/// nearest-first, project every primitive, then rasterize the batch
/// sequentially or across `rayon` row bands depending on its size.
/// Primitives behind the camera are skipped by [`raster::draw_gaussian`],
/// and an empty store simply yields the initial (fully transparent)
/// framebuffer.
pub fn render_frame(camera: &Camera, store: &GaussianStore) -> Framebuffer {
    let _span = tracing::trace_span!("render_frame", num_splats = store.len()).entered();

    let mut framebuffer = Framebuffer::new(camera.width(), camera.height());
    if store.is_empty() {
        log::debug!("empty primitive store, rendering background only");
        return framebuffer;
    }

    let cam_positions: Vec<_> = tracing::trace_span!("transform_positions")
        .in_scope(|| (0..store.len()).map(|i| camera.to_camera(store.xyz(i))).collect());

    // Positions are already in camera space, so the depth axis is simply
    // the camera-space forward direction -- no further rotation. Camera-space
    // `+z` points away from the viewer, so sorting ascending by `+z` draws
    // nearest-first, farthest-last, matching `Framebuffer::accumulate`'s
    // front-to-back residual-transmittance compositing (the first primitive
    // drawn at a pixel dominates). This also matches `depth_direction`'s
    // near-to-far ranking used by the distributed partitioner.
    let order = tracing::trace_span!("depth_sort")
        .in_scope(|| sort::sort_by_depth(&cam_positions, splat_linalg::Vec4::direction(0.0, 0.0, 1.0)));

    let cam_origin = camera.global_position();
    let mut plots = Vec::with_capacity(order.len());
    let mut colors = Vec::with_capacity(order.len());
    let mut opacities = Vec::with_capacity(order.len());
    tracing::trace_span!("project_splats").in_scope(|| {
        for &i in &order {
            let g_cam = cam_positions[i];
            plots.push(project::PlotData::new(camera, g_cam, store.cov3d(i)));
            let view_dir = (store.xyz(i) - cam_origin).xyz().normalized();
            colors.push(store.color(i).eval(view_dir));
            opacities.push(store.color(i).opacity);
        }
    });

    let _draw_span = tracing::trace_span!("draw_splats").entered();
    // Small frames aren't worth the band-splitting and splice overhead, so
    // only hand off to the parallel rasterizer once there's enough primitive
    // work per pixel row to amortize it.
    if store.len() >= PARALLEL_SPLAT_THRESHOLD {
        raster::draw_gaussians_parallel(&mut framebuffer, &plots, &colors, &opacities);
    } else {
        raster::draw_gaussians(&mut framebuffer, &plots, &colors, &opacities);
    }
    framebuffer
}

/// Below this many primitives, the sequential rasterizer is faster than
/// splitting the framebuffer into row bands for `rayon`.
const PARALLEL_SPLAT_THRESHOLD: usize = 4096;
