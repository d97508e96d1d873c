//! Per-pixel Gaussian evaluation and front-to-back over-compositing.

use splat_linalg::{Vec3, vec3};

use crate::framebuffer::Framebuffer;
use crate::project::PlotData;

/// Draws one primitive's 3-sigma footprint into `framebuffer`. A no-op if
/// `plot.behind` is set.
pub fn draw_gaussian(framebuffer: &mut Framebuffer, plot: &PlotData, color: Vec3, opacity: f32) {
    if plot.behind {
        return;
    }

    let width = framebuffer.width();
    let height = framebuffer.height();

    let xs = (plot.x_c - plot.x_r).round().max(0.0) as u32;
    let ys = (plot.y_c - plot.y_r).round().max(0.0) as u32;
    let xe = ((plot.x_c + plot.x_r).round() as i64 + 1).clamp(0, width as i64) as u32;
    let ye = ((plot.y_c + plot.y_r).round() as i64 + 1).clamp(0, height as i64) as u32;
    let xs = xs.min(width);
    let ys = ys.min(height);

    for y in ys..ye {
        for x in xs..xe {
            let cx = x as f32 - plot.x_c;
            let cy = y as f32 - plot.y_c;
            let power = -(plot.a * cx * cx + plot.c * cy * cy) / 2.0 - plot.b * cx * cy;
            let alpha = (opacity * power.exp()).min(0.99);
            framebuffer.accumulate(x, y, alpha, color);
        }
    }
}

/// Draws an already depth-sorted batch of primitives sequentially. Used by
/// [`crate::render_frame`] for scenes too small to be worth splitting across
/// `rayon` bands, and as the baseline [`draw_gaussians_parallel`] must match.
pub fn draw_gaussians(
    framebuffer: &mut Framebuffer,
    plots: &[PlotData],
    colors: &[Vec3],
    opacities: &[f32],
) {
    for i in 0..plots.len() {
        draw_gaussian(framebuffer, &plots[i], colors[i], opacities[i]);
    }
}

/// Tile-parallel rasterization (supplement: spec.md leaves parallelism
/// unspecified). Splits the framebuffer into horizontal row bands, one per
/// rayon thread, and draws every primitive against every band. Since each
/// band owns disjoint pixel rows the per-primitive draw order within a band
/// is preserved and the result is bit-identical to [`draw_gaussians`].
pub fn draw_gaussians_parallel(
    framebuffer: &mut Framebuffer,
    plots: &[PlotData],
    colors: &[Vec3],
    opacities: &[f32],
) {
    use rayon::prelude::*;

    let width = framebuffer.width();
    let height = framebuffer.height();
    let band_count = rayon::current_num_threads().max(1).min(height.max(1) as usize);
    let band_height = height.div_ceil(band_count as u32).max(1);

    let mut bands: Vec<Framebuffer> = (0..band_count)
        .map(|_| Framebuffer::new(width, band_height))
        .collect();

    bands
        .par_iter_mut()
        .enumerate()
        .for_each(|(band_idx, band)| {
            let y0 = band_idx as u32 * band_height;
            for i in 0..plots.len() {
                draw_gaussian_into_band(band, y0, &plots[i], colors[i], opacities[i]);
            }
        });

    for (band_idx, band) in bands.into_iter().enumerate() {
        let y0 = band_idx as u32 * band_height;
        for local_y in 0..band.height() {
            let y = y0 + local_y;
            if y >= height {
                break;
            }
            for x in 0..width {
                let (r, g, b) = band.image_at(x, local_y);
                let a = band.alpha_at(x, local_y);
                // Each pixel's compositing result depends only on its own
                // column, never on neighboring rows, so splicing row-bands
                // back together is an exact copy, not a re-composite.
                framebuffer.set(x, y, vec3(r, g, b), a);
            }
        }
    }
}

fn draw_gaussian_into_band(
    band: &mut Framebuffer,
    y0: u32,
    plot: &PlotData,
    color: Vec3,
    opacity: f32,
) {
    if plot.behind {
        return;
    }
    let shifted = PlotData {
        y_c: plot.y_c - y0 as f32,
        ..*plot
    };
    draw_gaussian(band, &shifted, color, opacity);
}
