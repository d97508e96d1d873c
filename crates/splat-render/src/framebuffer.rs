//! Pre-multiplied-contribution color buffer with residual-transmittance alpha.
//!
//! `image` accumulates `transmittance * splat_alpha * color` as primitives
//! are drawn front-to-back; `alpha` tracks the fraction of background still
//! visible through everything composited so far. This residual-alpha
//! representation (rather than plain per-pixel opacity) is what makes
//! [`Framebuffer::combine`] associative across distributed workers: a
//! worker's framebuffer already carries the correct weight for whatever is
//! drawn behind it, without knowing what that content is yet.

use splat_linalg::Vec3;

/// A `(W, H)` color + residual-alpha buffer.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    image: Vec<Vec3>,
    alpha: Vec<f32>,
}

impl Framebuffer {
    /// A fresh buffer: `image` zero, `alpha` one (background fully visible).
    pub fn new(width: u32, height: u32) -> Self {
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            image: vec![Vec3::ZERO; n],
            alpha: vec![1.0; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub fn image_at(&self, x: u32, y: u32) -> (f32, f32, f32) {
        let v = self.image[self.index(x, y)];
        (v.x, v.y, v.z)
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> f32 {
        self.alpha[self.index(x, y)]
    }

    /// Overwrites one pixel's final color/alpha directly. Used by
    /// [`crate::raster::draw_gaussians_parallel`] to splice independently
    /// computed row-bands back into a single buffer -- each pixel's
    /// compositing result depends only on that pixel's column, never on
    /// neighboring rows, so copying is exact, not an approximation.
    pub(crate) fn set(&mut self, x: u32, y: u32, image: Vec3, alpha: f32) {
        let i = self.index(x, y);
        self.image[i] = image;
        self.alpha[i] = alpha;
    }

    /// Accumulates one splat's contribution at `(x, y)`: `image += tau * alpha
    /// * color`, `alpha *= 1 - alpha_splat`. Called by [`crate::raster`] once
    /// per covered pixel.
    pub(crate) fn accumulate(&mut self, x: u32, y: u32, alpha_splat: f32, color: Vec3) {
        let i = self.index(x, y);
        let tau = self.alpha[i];
        self.image[i] = self.image[i] + color * (tau * alpha_splat);
        self.alpha[i] *= 1.0 - alpha_splat;
    }

    /// Merges in a framebuffer representing content strictly farther from
    /// the camera than `self`: `image[i] += alpha[i] * behind.image[i];
    /// alpha[i] *= behind.alpha[i]`.
    ///
    /// # Panics
    /// Panics if `behind` has a different size than `self`.
    pub fn combine(&mut self, behind: &Framebuffer) {
        assert_eq!(self.width, behind.width, "combine requires matching width");
        assert_eq!(self.height, behind.height, "combine requires matching height");
        for i in 0..self.image.len() {
            self.image[i] = self.image[i] + behind.image[i] * self.alpha[i];
            self.alpha[i] *= behind.alpha[i];
        }
    }

    /// Resolves the residual transmittance against a solid background color:
    /// `image[i] += alpha[i] * rgb; alpha[i] = 0`.
    pub fn add_background(&mut self, rgb: Vec3) {
        for i in 0..self.image.len() {
            self.image[i] = self.image[i] + rgb * self.alpha[i];
            self.alpha[i] = 0.0;
        }
    }

    /// Converts one color channel to a byte: `clamp(floor(v * 256), 0, 255)`.
    fn to_byte(v: f32) -> u8 {
        (v * 256.0).floor().clamp(0.0, 255.0) as u8
    }

    /// Writes `W*H*3` bytes, row-major top-to-bottom, left-to-right, RGB.
    pub fn write_raw<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(self.image.len() * 3);
        for v in &self.image {
            bytes.push(Self::to_byte(v.x));
            bytes.push(Self::to_byte(v.y));
            bytes.push(Self::to_byte(v.z));
        }
        writer.write_all(&bytes)
    }

    /// Serializes `image` as `W*H*3` little-endian `f32`s, the wire form the
    /// distributed driver exchanges under `TAG_FRAMEBUFFER_COLOR` (spec.md
    /// §6: color transferred before alpha, as two separate messages).
    pub fn image_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.image.len() * 12);
        for v in &self.image {
            bytes.extend_from_slice(&v.x.to_le_bytes());
            bytes.extend_from_slice(&v.y.to_le_bytes());
            bytes.extend_from_slice(&v.z.to_le_bytes());
        }
        bytes
    }

    /// Serializes `alpha` as `W*H` little-endian `f32`s
    /// (`TAG_FRAMEBUFFER_ALPHA`).
    pub fn alpha_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.alpha.len() * 4);
        for a in &self.alpha {
            bytes.extend_from_slice(&a.to_le_bytes());
        }
        bytes
    }

    /// The byte length [`Self::image_to_bytes`] produces for this buffer's size.
    pub fn image_byte_len(&self) -> usize {
        self.image.len() * 12
    }

    /// The byte length [`Self::alpha_to_bytes`] produces for this buffer's size.
    pub fn alpha_byte_len(&self) -> usize {
        self.alpha.len() * 4
    }

    /// Reconstructs a framebuffer of `(width, height)` from the byte forms
    /// [`Self::image_to_bytes`]/[`Self::alpha_to_bytes`] produced.
    ///
    /// # Panics
    /// Panics if either slice's length does not match `width * height`.
    pub fn from_raw_bytes(width: u32, height: u32, image_bytes: &[u8], alpha_bytes: &[u8]) -> Self {
        let n = (width as usize) * (height as usize);
        assert_eq!(image_bytes.len(), n * 12, "image byte length mismatch");
        assert_eq!(alpha_bytes.len(), n * 4, "alpha byte length mismatch");

        let mut image = Vec::with_capacity(n);
        for chunk in image_bytes.chunks_exact(12) {
            let x = f32::from_le_bytes(chunk[0..4].try_into().expect("4 bytes"));
            let y = f32::from_le_bytes(chunk[4..8].try_into().expect("4 bytes"));
            let z = f32::from_le_bytes(chunk[8..12].try_into().expect("4 bytes"));
            image.push(Vec3 { x, y, z });
        }
        let alpha = alpha_bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("4 bytes")))
            .collect();

        Self {
            width,
            height,
            image,
            alpha,
        }
    }
}
