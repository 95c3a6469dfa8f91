use rayon::prelude::*;
use thiserror::Error;
use vista_core::{Descriptor, Image, Keypoint};

const DESCRIPTOR_SIZE: usize = 32;
const N_TESTS: usize = DESCRIPTOR_SIZE * 8;
const PATTERN_SEED: u32 = 0x9E37_79B9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BriefError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },
    #[error("Patch size {0} must be odd and at least 5")]
    InvalidPatchSize(usize),
}

pub type BriefResult<T> = Result<T, BriefError>;

/// One intensity comparison, offsets relative to the keypoint
pub type TestPair = (f32, f32, f32, f32);

/// Steered BRIEF: 256 intensity tests rotated by the keypoint angle
pub struct BriefGenerator {
    w: usize,
    h: usize,
    pairs: Vec<TestPair>,
}

impl BriefGenerator {
    pub fn new(width: usize, height: usize, patch_size: usize) -> BriefResult<Self> {
        if width == 0 || height == 0 {
            return Err(BriefError::InvalidImageSize { width, height });
        }
        if patch_size % 2 == 0 || patch_size < 5 {
            return Err(BriefError::InvalidPatchSize(patch_size));
        }
        Ok(Self {
            w: width,
            h: height,
            pairs: sampling_pattern(patch_size),
        })
    }

    pub fn pairs(&self) -> &[TestPair] {
        &self.pairs
    }

    /// One descriptor per keypoint, in keypoint order.
    ///
    /// `img` should already be smoothed; single-pixel tests are noisy.
    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> BriefResult<Vec<Descriptor>> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(BriefError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }

        Ok(kps
            .par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let (cx, cy) = (kp.x, kp.y);
                let mut d = [0u8; DESCRIPTOR_SIZE];

                for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
                    let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
                    let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

                    let val1 = self.bilinear_sample(img, rx1, ry1);
                    let val2 = self.bilinear_sample(img, rx2, ry2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                d
            })
            .collect())
    }

    /// Bilinear interpolation, clamping to the nearest pixel off the edge
    fn bilinear_sample(&self, img: &Image, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let x1 = x0 + 1.0;
        let y1 = y0 + 1.0;

        if x0 < 0.0 || y0 < 0.0 || x1 >= self.w as f32 || y1 >= self.h as f32 {
            let cx = x.round().clamp(0.0, (self.w - 1) as f32) as usize;
            let cy = y.round().clamp(0.0, (self.h - 1) as f32) as usize;
            return img[cy * self.w + cx] as f32;
        }

        let dx = x - x0;
        let dy = y - y0;
        let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

        let p00 = img[y0 * self.w + x0] as f32;
        let p10 = img[y0 * self.w + x1] as f32;
        let p01 = img[y1 * self.w + x0] as f32;
        let p11 = img[y1 * self.w + x1] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;
        top * (1.0 - dy) + bottom * dy
    }
}

/// Deterministic test pattern: offsets drawn from an approximately
/// isotropic Gaussian (sigma = patch/5) and clipped to the patch.
pub fn sampling_pattern(patch_size: usize) -> Vec<TestPair> {
    let half = (patch_size / 2) as f32;
    let sigma = patch_size as f32 / 5.0;
    let mut rng = XorShift32(PATTERN_SEED);
    let mut coord = || (rng.gaussian() * sigma).round().clamp(-half, half);

    let mut pairs = Vec::with_capacity(N_TESTS);
    while pairs.len() < N_TESTS {
        let pair = (coord(), coord(), coord(), coord());
        if (pair.0, pair.1) != (pair.2, pair.3) {
            pairs.push(pair);
        }
    }
    pairs
}

struct XorShift32(u32);

impl XorShift32 {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn uniform(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Irwin-Hall sum of 12 uniforms, zero mean, unit variance
    fn gaussian(&mut self) -> f32 {
        (0..12).map(|_| self.uniform()).sum::<f32>() - 6.0
    }
}
